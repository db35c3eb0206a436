//! API handlers and router for Bookshelf REST endpoints

pub mod books;
pub mod health;
pub mod json;
pub mod openapi;

use axum::{
    http::{Method, Uri},
    middleware,
    routing::get,
    Router,
};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any, CorsLayer},
};

use crate::{error::AppError, middleware::log_requests, AppState};

/// Create the application router with all routes and the request pipeline
pub fn create_router(state: AppState) -> Router {
    let routes = Router::new()
        // Health check
        .route("/health", get(health::health_check).fallback(unhandled_route))
        // OpenAPI document
        .route(
            "/api-docs/openapi.json",
            get(openapi::openapi_json).fallback(unhandled_route),
        )
        // Books
        .route(
            "/books",
            get(books::list_books)
                .post(books::create_book)
                .fallback(unhandled_route),
        )
        .route(
            "/books/:id",
            get(books::get_book)
                .put(books::update_book)
                .delete(books::delete_book)
                .fallback(unhandled_route),
        )
        .fallback(unhandled_route);

    with_request_pipeline(routes, state)
}

/// Wrap routes in the panic boundary, CORS and access logging.
///
/// Layers apply inside out: handler panics become a 500 before the access
/// log sees the response, and the outermost boundary catches anything the
/// logging middleware itself might raise.
pub fn with_request_pipeline(routes: Router<AppState>, state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    routes
        .with_state(state.clone())
        .layer(CatchPanicLayer::custom(crate::error::panic_response))
        .layer(cors)
        .layer(middleware::from_fn_with_state(state, log_requests))
        .layer(CatchPanicLayer::custom(crate::error::panic_response))
}

/// Unknown paths and unsupported methods are unexpected failures
async fn unhandled_route(method: Method, uri: Uri) -> AppError {
    AppError::UnmatchedRoute {
        method,
        path: uri.path().to_string(),
    }
}
