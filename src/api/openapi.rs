//! OpenAPI documentation

use axum::Json;
use utoipa::OpenApi;

use crate::api::{books, health};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Bookshelf API",
        version = "0.1.0",
        description = "In-memory book catalog REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    paths(
        health::health_check,
        books::list_books,
        books::get_book,
        books::create_book,
        books::update_book,
        books::delete_book,
    ),
    components(
        schemas(
            crate::models::Book,
            crate::models::CreateBook,
            crate::models::UpdateBook,
            crate::models::BookResponse,
            crate::models::BookListResponse,
            health::HealthResponse,
            crate::error::ErrorResponse,
            crate::error::MessageResponse,
            crate::error::InternalErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "books", description = "Book catalog management")
    )
)]
pub struct ApiDoc;

/// Serve the generated OpenAPI document
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
