//! API layer - HTTP handlers and routing
//!
//! This module contains all HTTP endpoints of the showcase backend:
//! - Catalog endpoints (categories, products, product images)
//! - Film library endpoints (thematics, movies, movie images)
//! - Account endpoints under `/security`
//! - Static serving of uploaded images under `/uploads`

pub mod catalog;
pub mod common;
pub mod film;
pub mod flash;
pub mod middleware;
pub mod security;
pub mod upload;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    Router,
};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

pub use flash::{Flash, FlashClass, FlashMessage};
pub use middleware::{ApiError, AppState, AuthenticatedUser};

/// Build the main API router
pub fn build_api_router(state: AppState) -> Router<AppState> {
    Router::new()
        .merge(catalog::router())
        .merge(film::router())
        .nest("/security", security::router(state))
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, cors_origin: &str) -> Router {
    let mut cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::COOKIE])
        .allow_credentials(true);
    match cors_origin.parse::<HeaderValue>() {
        Ok(origin) => cors = cors.allow_origin(origin),
        Err(_) => tracing::warn!("Ignoring invalid CORS origin {:?}", cors_origin),
    }

    let uploads = ServeDir::new(&state.upload_config.path);
    let limit = body_limit(state.upload_config.max_file_size);

    Router::new()
        .nest(
            "/api/v1",
            build_api_router(state.clone()).layer(DefaultBodyLimit::max(limit)),
        )
        .nest_service("/uploads", uploads)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Room left for multipart boundaries and part headers around one image
const MULTIPART_OVERHEAD: u64 = 64 * 1024;

/// Request body limit that lets an image of `max_file_size` bytes through
fn body_limit(max_file_size: u64) -> usize {
    usize::try_from(max_file_size.saturating_add(MULTIPART_OVERHEAD)).unwrap_or(usize::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AuthConfig, ListingConfig, UploadConfig};
    use crate::db::repositories::{
        SqlxRepository, SqlxSessionRepository, SqlxUserRepository, UserRepository,
    };
    use crate::db::{create_test_pool, migrations, DynDatabasePool};
    use crate::services::{CatalogService, FilmService, LocalFileStore, UserService};
    use axum::http::{HeaderName, StatusCode};
    use axum_test::multipart::{MultipartForm, Part};
    use axum_test::{TestResponse, TestServer};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tempfile::TempDir;

    struct TestApp {
        server: TestServer,
        pool: DynDatabasePool,
        uploads: TempDir,
    }

    async fn setup_test_app() -> TestApp {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let uploads = TempDir::new().unwrap();
        let upload_config = UploadConfig {
            path: uploads.path().to_path_buf(),
            ..UploadConfig::default()
        };
        let files = LocalFileStore::boxed(uploads.path());
        let listing = ListingConfig::default();

        let state = AppState {
            user_service: Arc::new(UserService::new(
                SqlxUserRepository::boxed(pool.clone()),
                SqlxSessionRepository::boxed(pool.clone()),
            )),
            catalog_service: Arc::new(CatalogService::new(
                SqlxRepository::boxed(pool.clone()),
                SqlxRepository::boxed(pool.clone()),
                SqlxRepository::boxed(pool.clone()),
                files.clone(),
                listing.clone(),
            )),
            film_service: Arc::new(FilmService::new(
                SqlxRepository::boxed(pool.clone()),
                SqlxRepository::boxed(pool.clone()),
                SqlxRepository::boxed(pool.clone()),
                files,
                listing,
            )),
            upload_config: Arc::new(upload_config),
            auth_config: Arc::new(AuthConfig::default()),
        };

        let server = TestServer::new(build_router(state, "http://localhost:3000")).unwrap();
        TestApp {
            server,
            pool,
            uploads,
        }
    }

    fn location(response: &TestResponse) -> String {
        response
            .headers()
            .get(header::LOCATION)
            .expect("Missing Location header")
            .to_str()
            .unwrap()
            .to_string()
    }

    /// `name=value` pairs of every Set-Cookie header
    fn cookies(response: &TestResponse) -> Vec<String> {
        response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(|v| v.split(';').next())
            .map(str::to_string)
            .collect()
    }

    fn cookie_header(pair: &str) -> (HeaderName, HeaderValue) {
        (header::COOKIE, HeaderValue::from_str(pair).unwrap())
    }

    async fn create_category(app: &TestApp, name: &str) -> i64 {
        let response = app
            .server
            .post("/api/v1/categories")
            .json(&json!({"name": name}))
            .await;
        assert_eq!(response.status_code(), StatusCode::SEE_OTHER);

        let list = app.server.get("/api/v1/categories").await.json::<Value>();
        list["items"]
            .as_array()
            .unwrap()
            .iter()
            .find(|c| c["name"] == name)
            .and_then(|c| c["id"].as_i64())
            .unwrap()
    }

    async fn create_product(app: &TestApp, name: &str, category_id: i64) {
        let response = app
            .server
            .post("/api/v1/products")
            .json(&json!({
                "name": name,
                "price": 25,
                "stock": 3,
                "category_id": category_id
            }))
            .await;
        assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
    }

    // ========================================================================
    // Catalog
    // ========================================================================

    #[tokio::test]
    async fn test_create_category_redirects_with_flash() {
        let app = setup_test_app().await;

        let response = app
            .server
            .post("/api/v1/categories")
            .json(&json!({"name": "Tools"}))
            .await;
        assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/api/v1/categories");

        let flash = cookies(&response).pop().unwrap();
        assert!(flash.starts_with("flash="));

        let (name, value) = cookie_header(&flash);
        let list = app.server.get("/api/v1/categories").add_header(name, value).await;
        assert_eq!(list.status_code(), StatusCode::OK);
        assert_eq!(cookies(&list), vec!["flash=".to_string()]);

        let body = list.json::<Value>();
        assert_eq!(body["flash"]["class"], "success");
        assert_eq!(body["items"][0]["name"], "Tools");
    }

    #[tokio::test]
    async fn test_blank_category_name_is_rejected() {
        let app = setup_test_app().await;

        let response = app
            .server
            .post("/api/v1/categories")
            .json(&json!({"name": "   "}))
            .await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(response.json::<Value>()["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_product_pages_and_search() {
        let app = setup_test_app().await;
        let tools = create_category(&app, "Tools").await;
        for name in ["Drill", "Hammer", "Drill Bits", "Saw", "Level"] {
            create_product(&app, name, tools).await;
        }

        let page = app.server.get("/api/v1/products?page=3").await.json::<Value>();
        assert_eq!(page["total_items"], 5);
        assert_eq!(page["total_pages"], 3);
        assert_eq!(page["items"].as_array().unwrap().len(), 1);
        assert_eq!(page["has_next"], false);
        assert!(page["flash"].is_null());

        let found = app
            .server
            .get("/api/v1/products/search?searcher=Drill")
            .await
            .json::<Value>();
        assert_eq!(found["searcher"], "Drill");
        assert_eq!(found["total_items"], 2);

        let by_category = app
            .server
            .get(&format!("/api/v1/categories/{}/products", tools))
            .await
            .json::<Value>();
        assert_eq!(by_category["parent"]["name"], "Tools");
        assert_eq!(by_category["items_per_page"], 2);
    }

    #[tokio::test]
    async fn test_search_term_is_not_trimmed() {
        let app = setup_test_app().await;
        let tools = create_category(&app, "Tools").await;
        create_product(&app, "Saw", tools).await;
        create_product(&app, "Table Saw", tools).await;

        let found = app
            .server
            .get("/api/v1/products/search?searcher=%20Saw")
            .await
            .json::<Value>();
        assert_eq!(found["searcher"], " Saw");
        assert_eq!(found["total_items"], 1);
        assert_eq!(found["items"][0]["name"], "Table Saw");
    }

    #[tokio::test]
    async fn test_page_zero_is_rejected() {
        let app = setup_test_app().await;

        let response = app.server.get("/api/v1/products?page=0").await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

        let response = app.server.get("/api/v1/movies?page=9").await;
        assert_eq!(response.status_code(), StatusCode::OK);
        assert_eq!(response.json::<Value>()["items"], json!([]));
    }

    #[tokio::test]
    async fn test_blank_search_redirects_to_listing() {
        let app = setup_test_app().await;

        let response = app.server.get("/api/v1/products/search?searcher=").await;
        assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/api/v1/products");

        let response = app.server.get("/api/v1/movies/search").await;
        assert_eq!(location(&response), "/api/v1/movies");
    }

    #[tokio::test]
    async fn test_missing_records_are_not_found() {
        let app = setup_test_app().await;

        assert_eq!(
            app.server.get("/api/v1/products/99").await.status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            app.server.delete("/api/v1/categories/99").await.status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            app.server.get("/api/v1/thematics/99/movies").await.status_code(),
            StatusCode::NOT_FOUND
        );
    }

    #[tokio::test]
    async fn test_category_in_use_conflicts() {
        let app = setup_test_app().await;
        let tools = create_category(&app, "Tools").await;
        create_product(&app, "Drill", tools).await;

        let response = app
            .server
            .delete(&format!("/api/v1/categories/{}", tools))
            .await;
        assert_eq!(response.status_code(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_product_image_upload_and_delete() {
        let app = setup_test_app().await;
        let tools = create_category(&app, "Tools").await;
        create_product(&app, "Drill", tools).await;
        let all = app.server.get("/api/v1/products/all").await.json::<Value>();
        let product_id = all["items"][0]["id"].as_i64().unwrap();

        let form = MultipartForm::new().add_part(
            "file",
            Part::bytes(vec![0x89, 0x50, 0x4e, 0x47])
                .file_name("drill.png")
                .mime_type("image/png"),
        );
        let response = app
            .server
            .post(&format!("/api/v1/products/{}/images", product_id))
            .multipart(form)
            .await;
        assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
        assert_eq!(
            location(&response),
            format!("/api/v1/products/{}/images", product_id)
        );

        let listing = app
            .server
            .get(&format!("/api/v1/products/{}/images", product_id))
            .await
            .json::<Value>();
        let image = &listing["images"][0];
        let name = image["name"].as_str().unwrap().to_string();
        assert!(name.ends_with(".png"));
        assert_eq!(
            image["url"],
            format!("/uploads/products/{}", name).as_str()
        );
        assert!(app.uploads.path().join("products").join(&name).exists());

        let served = app.server.get(&format!("/uploads/products/{}", name)).await;
        assert_eq!(served.status_code(), StatusCode::OK);

        let response = app
            .server
            .delete(&format!("/api/v1/product-images/{}", image["id"]))
            .await;
        assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
        assert!(!app.uploads.path().join("products").join(&name).exists());
    }

    #[tokio::test]
    async fn test_upload_above_default_body_limit() {
        let app = setup_test_app().await;
        let tools = create_category(&app, "Tools").await;
        create_product(&app, "Drill", tools).await;
        let all = app.server.get("/api/v1/products/all").await.json::<Value>();
        let product_id = all["items"][0]["id"].as_i64().unwrap();

        let form = MultipartForm::new().add_part(
            "file",
            Part::bytes(vec![7u8; 3 * 1024 * 1024])
                .file_name("large.png")
                .mime_type("image/png"),
        );
        let response = app
            .server
            .post(&format!("/api/v1/products/{}/images", product_id))
            .multipart(form)
            .await;
        assert_eq!(response.status_code(), StatusCode::SEE_OTHER);

        let listing = app
            .server
            .get(&format!("/api/v1/products/{}/images", product_id))
            .await
            .json::<Value>();
        let name = listing["images"][0]["name"].as_str().unwrap();
        let stored = std::fs::metadata(app.uploads.path().join("products").join(name)).unwrap();
        assert_eq!(stored.len(), 3 * 1024 * 1024);
    }

    #[test]
    fn test_body_limit_covers_max_file_size() {
        assert_eq!(body_limit(10), 10 + MULTIPART_OVERHEAD as usize);
        assert_eq!(body_limit(u64::MAX), usize::MAX);
    }

    #[tokio::test]
    async fn test_upload_rejects_disallowed_type() {
        let app = setup_test_app().await;
        let tools = create_category(&app, "Tools").await;
        create_product(&app, "Drill", tools).await;
        let all = app.server.get("/api/v1/products/all").await.json::<Value>();
        let product_id = all["items"][0]["id"].as_i64().unwrap();

        let form = MultipartForm::new().add_part(
            "file",
            Part::text("#!/bin/sh").file_name("run.sh").mime_type("text/x-sh"),
        );
        let response = app
            .server
            .post(&format!("/api/v1/products/{}/images", product_id))
            .multipart(form)
            .await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    }

    // ========================================================================
    // Film library
    // ========================================================================

    #[tokio::test]
    async fn test_movie_requires_description() {
        let app = setup_test_app().await;
        app.server
            .post("/api/v1/thematics")
            .json(&json!({"name": "Science Fiction"}))
            .await;
        let thematics = app.server.get("/api/v1/thematics").await.json::<Value>();
        assert_eq!(thematics["items"][0]["slug"], "science-fiction");
        let thematic_id = thematics["items"][0]["id"].as_i64().unwrap();

        let response = app
            .server
            .post("/api/v1/movies")
            .json(&json!({"name": "Solaris", "thematic_id": thematic_id}))
            .await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

        let response = app
            .server
            .post("/api/v1/movies")
            .json(&json!({
                "name": "Solaris",
                "description": "A station above an ocean",
                "thematic_id": thematic_id
            }))
            .await;
        assert_eq!(location(&response), "/api/v1/movies");

        let movies = app.server.get("/api/v1/movies").await.json::<Value>();
        assert_eq!(movies["items"][0]["thematic_name"], "Science Fiction");
        assert_eq!(movies["items_per_page"], 3);
    }

    // ========================================================================
    // Security
    // ========================================================================

    async fn register_and_verify(app: &TestApp, email: &str) {
        let response = app
            .server
            .post("/api/v1/security/register")
            .json(&json!({"name": "Ana", "email": email, "password": "Secret1"}))
            .await;
        assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/api/v1/security/login");

        let user = SqlxUserRepository::new(app.pool.clone())
            .get_by_email(email)
            .await
            .unwrap()
            .unwrap();
        let token = user.token.unwrap();

        let response = app
            .server
            .get(&format!("/api/v1/security/verify/{}", token))
            .await;
        assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
    }

    async fn login(app: &TestApp, email: &str, password: &str) -> TestResponse {
        app.server
            .post("/api/v1/security/login")
            .json(&json!({"email": email, "password": password}))
            .await
    }

    #[tokio::test]
    async fn test_login_sets_session_and_opens_page() {
        let app = setup_test_app().await;
        register_and_verify(&app, "ana@example.com").await;

        let response = login(&app, "ana@example.com", "Secret1").await;
        assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/api/v1/security/page");
        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(set_cookie.ends_with("Max-Age=1200"));

        let session = cookies(&response).pop().unwrap();
        let (name, value) = cookie_header(&session);
        let page = app.server.get("/api/v1/security/page").add_header(name, value).await;
        assert_eq!(page.status_code(), StatusCode::OK);

        let body = page.json::<Value>();
        assert_eq!(body["user"]["email"], "ana@example.com");
        assert!(body["user"].get("password_hash").is_none());
    }

    #[tokio::test]
    async fn test_page_requires_session() {
        let app = setup_test_app().await;

        let response = app.server.get("/api/v1/security/page").await;
        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

        let response = app
            .server
            .get("/api/v1/security/page")
            .add_header(header::AUTHORIZATION, HeaderValue::from_static("Bearer nope"))
            .await;
        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_bad_login_flashes_danger() {
        let app = setup_test_app().await;
        register_and_verify(&app, "ana@example.com").await;

        let response = login(&app, "ana@example.com", "Wrong123").await;
        assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/api/v1/security/login");

        let flash = cookies(&response).pop().unwrap();
        let (name, value) = cookie_header(&flash);
        let form = app
            .server
            .get("/api/v1/security/login")
            .add_header(name, value)
            .await
            .json::<Value>();
        assert_eq!(form["flash"]["class"], "danger");
    }

    #[tokio::test]
    async fn test_pending_user_cannot_login() {
        let app = setup_test_app().await;
        app.server
            .post("/api/v1/security/register")
            .json(&json!({"name": "Ana", "email": "ana@example.com", "password": "Secret1"}))
            .await;

        let response = login(&app, "ana@example.com", "Secret1").await;
        assert_eq!(location(&response), "/api/v1/security/login");
    }

    #[tokio::test]
    async fn test_duplicate_registration_conflicts() {
        let app = setup_test_app().await;
        register_and_verify(&app, "ana@example.com").await;

        let response = app
            .server
            .post("/api/v1/security/register")
            .json(&json!({"name": "Other", "email": "ana@example.com", "password": "Secret1"}))
            .await;
        assert_eq!(response.status_code(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_logout_ends_session() {
        let app = setup_test_app().await;
        register_and_verify(&app, "ana@example.com").await;
        let session = cookies(&login(&app, "ana@example.com", "Secret1").await)
            .pop()
            .unwrap();

        let (name, value) = cookie_header(&session);
        let response = app
            .server
            .post("/api/v1/security/logout")
            .add_header(name, value)
            .await;
        assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
        assert!(cookies(&response).contains(&"session=".to_string()));

        let (name, value) = cookie_header(&session);
        let page = app.server.get("/api/v1/security/page").add_header(name, value).await;
        assert_eq!(page.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_password_reset_flow() {
        let app = setup_test_app().await;
        register_and_verify(&app, "ana@example.com").await;

        let unknown = app
            .server
            .post("/api/v1/security/reset")
            .json(&json!({"email": "nobody@example.com"}))
            .await;
        let known = app
            .server
            .post("/api/v1/security/reset")
            .json(&json!({"email": "ana@example.com"}))
            .await;
        assert_eq!(location(&unknown), location(&known));

        let token = SqlxUserRepository::new(app.pool.clone())
            .get_by_email("ana@example.com")
            .await
            .unwrap()
            .unwrap()
            .token
            .unwrap();

        let form = app
            .server
            .get(&format!("/api/v1/security/reset/{}", token))
            .await
            .json::<Value>();
        assert_eq!(form["email"], "ana@example.com");

        let response = app
            .server
            .post(&format!("/api/v1/security/reset/{}", token))
            .json(&json!({"password": "Fresh99x"}))
            .await;
        assert_eq!(response.status_code(), StatusCode::SEE_OTHER);

        let response = login(&app, "ana@example.com", "Fresh99x").await;
        assert_eq!(location(&response), "/api/v1/security/page");

        let reused = app
            .server
            .get(&format!("/api/v1/security/reset/{}", token))
            .await;
        assert_eq!(reused.status_code(), StatusCode::NOT_FOUND);
    }
}
