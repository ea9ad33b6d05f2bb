//! Catalog API endpoints
//!
//! Categories, products and product images:
//! - GET/POST /api/v1/categories, GET/PUT/DELETE /api/v1/categories/{id}
//! - GET /api/v1/categories/{id}/products - products of one category, paged
//! - GET/POST /api/v1/products, GET /api/v1/products/all, GET /api/v1/products/search
//! - GET/PUT/DELETE /api/v1/products/{id}
//! - GET/POST /api/v1/products/{id}/images, DELETE /api/v1/product-images/{id}
//!
//! Mutations answer `303 See Other` towards the matching listing and leave a
//! flash message behind.

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
use crate::services::{CategoryInput, ProductInput, PRODUCT_IMAGES};

/// Build the catalog router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/categories", get(list_categories).post(create_category))
        .route(
            "/categories/{id}",
            get(get_category).put(update_category).delete(delete_category),
        )
        .route("/categories/{id}/products", get(products_by_category))
        .route("/products", get(list_products).post(create_product))
        .route("/products/all", get(all_products))
        .route("/products/search", get(search_products))
        .route(
            "/products/{id}",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route(
            "/products/{id}/images",
            get(product_images).post(upload_product_image),
        )
        .route("/product-images/{id}", delete(delete_product_image))
}

fn done(state: &AppState, path: &str, message: &str) -> Response {
    redirect_with(
        path,
        FlashMessage::success(message),
        state.auth_config.flash_seconds,
    )
}

// ============================================================================
// Categories
// ============================================================================

/// GET /api/v1/categories
async fn list_categories(
    State(state): State<AppState>,
    flash: Flash,
) -> Result<Response, ApiError> {
    let items = state.catalog_service.list_categories().await?;
    let body = ListResponse {
        items,
        flash: flash.message(),
    };
    Ok(flash.respond(Json(body)))
}

/// POST /api/v1/categories
async fn create_category(
    State(state): State<AppState>,
    Json(input): Json<CategoryInput>,
) -> Result<Response, ApiError> {
    state.catalog_service.create_category(input).await?;
    Ok(done(&state, "/categories", "Category created"))
}

/// GET /api/v1/categories/{id}
async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<crate::models::Category>, ApiError> {
    Ok(Json(state.catalog_service.get_category(id).await?))
}

/// PUT /api/v1/categories/{id}
async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<CategoryInput>,
) -> Result<Response, ApiError> {
    state.catalog_service.update_category(id, input).await?;
    Ok(done(&state, "/categories", "Category updated"))
}

/// DELETE /api/v1/categories/{id}
///
/// 409 while products still belong to the category.
async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    state.catalog_service.delete_category(id).await?;
    Ok(done(&state, "/categories", "Category deleted"))
}

/// GET /api/v1/categories/{id}/products?page=
async fn products_by_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<PageQuery>,
    flash: Flash,
) -> Result<Response, ApiError> {
    let (category, page) = state
        .catalog_service
        .products_by_category(id, query.page)
        .await?;
    let body = ParentPageResponse {
        parent: category,
        page: PageResponse::new(page, flash.message()),
    };
    Ok(flash.respond(Json(body)))
}

// ============================================================================
// Products
// ============================================================================

/// GET /api/v1/products?page=
async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
    flash: Flash,
) -> Result<Response, ApiError> {
    let page = state.catalog_service.list_products(query.page).await?;
    let body = PageResponse::new(page, flash.message());
    Ok(flash.respond(Json(body)))
}

/// GET /api/v1/products/all
async fn all_products(
    State(state): State<AppState>,
    flash: Flash,
) -> Result<Response, ApiError> {
    let items = state.catalog_service.all_products().await?;
    let body = ListResponse {
        items,
        flash: flash.message(),
    };
    Ok(flash.respond(Json(body)))
}

/// GET /api/v1/products/search?searcher=&page=
///
/// A blank term sends the client back to the plain listing.
async fn search_products(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
    flash: Flash,
) -> Result<Response, ApiError> {
    let Some(term) = query.term() else {
        return Ok(redirect("/products"));
    };

    let page = state
        .catalog_service
        .search_products(term, query.page)
        .await?;
    let body = SearchPageResponse {
        searcher: term.to_string(),
        page: PageResponse::new(page, flash.message()),
    };
    Ok(flash.respond(Json(body)))
}

/// POST /api/v1/products
async fn create_product(
    State(state): State<AppState>,
    Json(input): Json<ProductInput>,
) -> Result<Response, ApiError> {
    state.catalog_service.create_product(input).await?;
    Ok(done(&state, "/products", "Product created"))
}

/// GET /api/v1/products/{id}
async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<crate::models::Product>, ApiError> {
    Ok(Json(state.catalog_service.get_product(id).await?))
}

/// PUT /api/v1/products/{id}
async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<ProductInput>,
) -> Result<Response, ApiError> {
    state.catalog_service.update_product(id, input).await?;
    Ok(done(&state, "/products", "Product updated"))
}

/// DELETE /api/v1/products/{id}
///
/// 409 while the product still has images.
async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    state.catalog_service.delete_product(id).await?;
    Ok(done(&state, "/products", "Product deleted"))
}

// ============================================================================
// Product images
// ============================================================================

/// GET /api/v1/products/{id}/images
async fn product_images(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    flash: Flash,
) -> Result<Response, ApiError> {
    let (product, images) = state.catalog_service.product_images(id).await?;
    let body = ImagesResponse {
        parent: product,
        images: images
            .into_iter()
            .map(|image| ImageResponse::new(image.id, image.name, PRODUCT_IMAGES))
            .collect(),
        flash: flash.message(),
    };
    Ok(flash.respond(Json(body)))
}

/// POST /api/v1/products/{id}/images - multipart, field `file`
async fn upload_product_image(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let upload = read_image(&mut multipart, &state.upload_config).await?;
    state.catalog_service.add_product_image(id, &upload).await?;
    Ok(done(&state, &format!("/products/{}/images", id), "Image uploaded"))
}

/// DELETE /api/v1/product-images/{id}
async fn delete_product_image(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let image = state.catalog_service.delete_product_image(id).await?;
    Ok(done(
        &state,
        &format!("/products/{}/images", image.product_id),
        "Image deleted",
    ))
}
