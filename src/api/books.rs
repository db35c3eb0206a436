//! Book endpoints

use axum::{
    async_trait,
    extract::{FromRequestParts, Path, State},
    http::{request::Parts, StatusCode},
    Json,
};
use axum_extra::extract::WithRejection;

use crate::{
    error::{AppError, AppResult, MessageResponse},
    models::{BookId, BookListResponse, BookResponse},
    AppState,
};

use super::json::JsonBody;

/// `{id}` path segment of the book routes.
///
/// A segment that is not an unsigned digit string does not address a book
/// route at all and is rejected as an unmatched route.
pub struct BookIdPath(pub BookId);

#[async_trait]
impl<S> FromRequestParts<S> for BookIdPath
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let WithRejection(Path(segment), _) =
            WithRejection::<Path<String>, AppError>::from_request_parts(parts, state).await?;

        BookId::parse(&segment)
            .map(BookIdPath)
            .ok_or_else(|| AppError::UnmatchedRoute {
                method: parts.method.clone(),
                path: parts.uri.path().to_string(),
            })
    }
}

/// List every book
#[utoipa::path(
    get,
    path = "/books",
    tag = "books",
    responses(
        (status = 200, description = "All books", body = BookListResponse)
    )
)]
pub async fn list_books(State(state): State<AppState>) -> Json<BookListResponse> {
    let book = state.services.catalog.list_books().await;
    Json(BookListResponse { book })
}

/// Get a book by ID
#[utoipa::path(
    get,
    path = "/books/{id}",
    tag = "books",
    params(
        ("id" = i64, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Book details", body = BookResponse),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_book(
    State(state): State<AppState>,
    BookIdPath(id): BookIdPath,
) -> AppResult<Json<BookResponse>> {
    let book = state.services.catalog.get_book(id).await?;
    Ok(Json(BookResponse { book }))
}

/// Create a new book
#[utoipa::path(
    post,
    path = "/books",
    tag = "books",
    request_body = crate::models::CreateBook,
    responses(
        (status = 201, description = "Book created", body = BookResponse),
        (status = 400, description = "Body is not JSON or misses title/author")
    )
)]
pub async fn create_book(
    State(state): State<AppState>,
    JsonBody(body): JsonBody,
) -> AppResult<(StatusCode, Json<BookResponse>)> {
    let book = state.services.catalog.create_book(&body).await?;
    Ok((StatusCode::CREATED, Json(BookResponse { book })))
}

/// Update an existing book; only the fields present in the body change
#[utoipa::path(
    put,
    path = "/books/{id}",
    tag = "books",
    params(
        ("id" = i64, Path, description = "Book ID")
    ),
    request_body = crate::models::UpdateBook,
    responses(
        (status = 200, description = "Book updated", body = BookResponse),
        (status = 400, description = "Body is not JSON", body = crate::error::ErrorResponse),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_book(
    State(state): State<AppState>,
    BookIdPath(id): BookIdPath,
    JsonBody(body): JsonBody,
) -> AppResult<Json<BookResponse>> {
    let book = state.services.catalog.update_book(id, &body).await?;
    Ok(Json(BookResponse { book }))
}

/// Delete a book
#[utoipa::path(
    delete,
    path = "/books/{id}",
    tag = "books",
    params(
        ("id" = i64, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Book deleted", body = MessageResponse),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_book(
    State(state): State<AppState>,
    BookIdPath(id): BookIdPath,
) -> AppResult<Json<MessageResponse>> {
    state.services.catalog.delete_book(id).await?;
    Ok(Json(MessageResponse {
        message: "book deleted".to_string(),
    }))
}
