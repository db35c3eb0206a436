//! Catalog service

use serde_json::Value;

use crate::{
    error::{AppError, AppResult},
    models::{Book, BookId, CreateBook, UpdateBook},
    repository::Repository,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn list_books(&self) -> Vec<Book> {
        self.repository.books.list().await
    }

    pub async fn get_book(&self, id: impl Into<BookId>) -> AppResult<Book> {
        let book = match id.into().get() {
            Some(id) => self.repository.books.get_by_id(id).await,
            None => None,
        };
        book.ok_or_else(|| AppError::NotFound("Book not found 404".to_string()))
    }

    /// Create a book from a raw JSON body.
    ///
    /// Only the presence of `title` and `author` is checked.
    pub async fn create_book(&self, raw: &[u8]) -> AppResult<Book> {
        let body: Value = serde_json::from_slice(raw)?;
        let data = match &body {
            Value::Object(fields) => CreateBook::from_fields(fields),
            other => return Err(non_object_create_body(other)),
        }
        .ok_or_else(missing_fields)?;

        let book = self.repository.books.create(data).await;
        tracing::debug!(id = book.id, "Book created");
        Ok(book)
    }

    /// Apply a partial update from a raw JSON body.
    ///
    /// The id is resolved before the body is parsed, so an unknown id is a
    /// 404 even when the body is malformed.
    pub async fn update_book(&self, id: impl Into<BookId>, raw: &[u8]) -> AppResult<Book> {
        let id = id.into().get().ok_or_else(book_not_found)?;
        self.get_book(id).await.map_err(|_| book_not_found())?;

        let body: Value = serde_json::from_slice(raw)?;
        let fields = body
            .as_object()
            .ok_or_else(|| AppError::Internal("update body is not a JSON object".to_string()))?;

        self.repository
            .books
            .update(id, UpdateBook::from_fields(fields))
            .await
            .ok_or_else(book_not_found)
    }

    pub async fn delete_book(&self, id: impl Into<BookId>) -> AppResult<()> {
        let id = id.into().get().ok_or_else(book_not_found)?;
        if !self.repository.books.delete(id).await {
            return Err(book_not_found());
        }
        tracing::debug!(id, "Book deleted");
        Ok(())
    }
}

fn book_not_found() -> AppError {
    AppError::NotFound("Book not found".to_string())
}

fn missing_fields() -> AppError {
    AppError::Validation("Missing title or author".to_string())
}

/// Outcome for a create body that is valid JSON but not an object.
///
/// Arrays and strings are searched for the two keys (as elements or as
/// substrings): when either is absent the fields are missing, when both
/// are present the body still cannot be indexed by key. Any other value
/// cannot be searched at all.
fn non_object_create_body(body: &Value) -> AppError {
    let has_both = match body {
        Value::Array(items) => ["title", "author"]
            .iter()
            .all(|key| items.iter().any(|item| item.as_str() == Some(*key))),
        Value::String(text) => text.contains("title") && text.contains("author"),
        _ => {
            return AppError::Internal(format!("create body is not searchable: {}", body));
        }
    };

    if has_both {
        AppError::Internal("create body is not a JSON object".to_string())
    } else {
        missing_fields()
    }
}
