//! Film library API endpoints
//!
//! Same shapes as the catalog: thematics stand in for categories, movies
//! for products. Deleting a thematic takes its movies and their image files
//! with it.

use axum::{
    extract::{Multipart, Path, Query, State},
    response::Response,
    routing::{delete, get},
    Json, Router,
};

use crate::api::common::{
    ListResponse, PageQuery, PageResponse, ParentPageResponse, SearchPageResponse, SearchQuery,
};
use crate::api::flash::{redirect, redirect_with, Flash, FlashMessage};
use crate::api::middleware::{ApiError, AppState};
use crate::api::upload::{read_image, ImageResponse, ImagesResponse};
use crate::models::{Movie, Thematic};
use crate::services::{MovieInput, ThematicInput, MOVIE_IMAGES};

/// Build the film router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/thematics", get(list_thematics).post(create_thematic))
        .route(
            "/thematics/{id}",
            get(get_thematic).put(update_thematic).delete(delete_thematic),
        )
        .route("/thematics/{id}/movies", get(movies_by_thematic))
        .route("/movies", get(list_movies).post(create_movie))
        .route("/movies/all", get(all_movies))
        .route("/movies/search", get(search_movies))
        .route(
            "/movies/{id}",
            get(get_movie).put(update_movie).delete(delete_movie),
        )
        .route("/movies/{id}/images", get(movie_images).post(upload_movie_image))
        .route("/movie-images/{id}", delete(delete_movie_image))
}

fn done(state: &AppState, path: &str, message: &str) -> Response {
    redirect_with(
        path,
        FlashMessage::success(message),
        state.auth_config.flash_seconds,
    )
}

async fn list_thematics(
    State(state): State<AppState>,
    flash: Flash,
) -> Result<Response, ApiError> {
    let items = state.film_service.list_thematics().await?;
    let body = ListResponse {
        items,
        flash: flash.message(),
    };
    Ok(flash.respond(Json(body)))
}

async fn create_thematic(
    State(state): State<AppState>,
    Json(input): Json<ThematicInput>,
) -> Result<Response, ApiError> {
    state.film_service.create_thematic(input).await?;
    Ok(done(&state, "/thematics", "Thematic created"))
}

async fn get_thematic(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Thematic>, ApiError> {
    Ok(Json(state.film_service.get_thematic(id).await?))
}

async fn update_thematic(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<ThematicInput>,
) -> Result<Response, ApiError> {
    state.film_service.update_thematic(id, input).await?;
    Ok(done(&state, "/thematics", "Thematic updated"))
}

/// DELETE /api/v1/thematics/{id} - cascades to movies and their images
async fn delete_thematic(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    state.film_service.delete_thematic(id).await?;
    Ok(done(&state, "/thematics", "Thematic deleted"))
}

async fn movies_by_thematic(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<PageQuery>,
    flash: Flash,
) -> Result<Response, ApiError> {
    let (thematic, page) = state.film_service.movies_by_thematic(id, query.page).await?;
    let body = ParentPageResponse {
        parent: thematic,
        page: PageResponse::new(page, flash.message()),
    };
    Ok(flash.respond(Json(body)))
}

async fn list_movies(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
    flash: Flash,
) -> Result<Response, ApiError> {
    let page = state.film_service.list_movies(query.page).await?;
    let body = PageResponse::new(page, flash.message());
    Ok(flash.respond(Json(body)))
}

async fn all_movies(
    State(state): State<AppState>,
    flash: Flash,
) -> Result<Response, ApiError> {
    let items = state.film_service.all_movies().await?;
    let body = ListResponse {
        items,
        flash: flash.message(),
    };
    Ok(flash.respond(Json(body)))
}

/// GET /api/v1/movies/search?searcher=&page=
async fn search_movies(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
    flash: Flash,
) -> Result<Response, ApiError> {
    let Some(term) = query.term() else {
        return Ok(redirect("/movies"));
    };

    let page = state.film_service.search_movies(term, query.page).await?;
    let body = SearchPageResponse {
        searcher: term.to_string(),
        page: PageResponse::new(page, flash.message()),
    };
    Ok(flash.respond(Json(body)))
}

async fn create_movie(
    State(state): State<AppState>,
    Json(input): Json<MovieInput>,
) -> Result<Response, ApiError> {
    state.film_service.create_movie(input).await?;
    Ok(done(&state, "/movies", "Movie created"))
}

async fn get_movie(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Movie>, ApiError> {
    Ok(Json(state.film_service.get_movie(id).await?))
}

async fn update_movie(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<MovieInput>,
) -> Result<Response, ApiError> {
    state.film_service.update_movie(id, input).await?;
    Ok(done(&state, "/movies", "Movie updated"))
}

async fn delete_movie(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    state.film_service.delete_movie(id).await?;
    Ok(done(&state, "/movies", "Movie deleted"))
}

async fn movie_images(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    flash: Flash,
) -> Result<Response, ApiError> {
    let (movie, images) = state.film_service.movie_images(id).await?;
    let body = ImagesResponse {
        parent: movie,
        images: images
            .into_iter()
            .map(|image| ImageResponse::new(image.id, image.name, MOVIE_IMAGES))
            .collect(),
        flash: flash.message(),
    };
    Ok(flash.respond(Json(body)))
}

async fn upload_movie_image(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let upload = read_image(&mut multipart, &state.upload_config).await?;
    state.film_service.add_movie_image(id, &upload).await?;
    Ok(done(&state, &format!("/movies/{}/images", id), "Image uploaded"))
}

async fn delete_movie_image(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let image = state.film_service.delete_movie_image(id).await?;
    Ok(done(
        &state,
        &format!("/movies/{}/images", image.movie_id),
        "Image deleted",
    ))
}
