//! Book model and request payloads

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

/// Book record held in the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub author: String,
}

/// Book id as addressed in a request path.
///
/// Only unsigned ASCII digit strings are ids. A digit string too large for
/// `i64` is still a valid id; it just cannot match any stored book.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookId(Option<i64>);

impl BookId {
    /// `None` when the segment is not an unsigned digit string
    pub fn parse(segment: &str) -> Option<Self> {
        if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        Some(Self(segment.parse().ok()))
    }

    /// The id as stored, `None` when it is out of the storable range
    pub fn get(self) -> Option<i64> {
        self.0
    }
}

impl From<i64> for BookId {
    fn from(id: i64) -> Self {
        Self(Some(id))
    }
}

/// Fields for a book about to be inserted; the id is assigned by the repository
#[derive(Debug, Clone, PartialEq, Eq, ToSchema)]
pub struct CreateBook {
    pub title: String,
    pub author: String,
}

/// Partial update; `None` leaves the stored value untouched
#[derive(Debug, Clone, Default, PartialEq, Eq, ToSchema)]
pub struct UpdateBook {
    pub title: Option<String>,
    pub author: Option<String>,
}

impl CreateBook {
    /// Build from a JSON object, requiring both `title` and `author` keys
    pub fn from_fields(fields: &Map<String, Value>) -> Option<Self> {
        Some(Self {
            title: field_text(fields.get("title")?),
            author: field_text(fields.get("author")?),
        })
    }
}

impl UpdateBook {
    /// Build from a JSON object, taking whichever of `title`/`author` is present
    pub fn from_fields(fields: &Map<String, Value>) -> Self {
        Self {
            title: fields.get("title").map(field_text),
            author: fields.get("author").map(field_text),
        }
    }

    /// Apply the present fields to `book`
    pub fn apply(self, book: &mut Book) {
        if let Some(title) = self.title {
            book.title = title;
        }
        if let Some(author) = self.author {
            book.author = author;
        }
    }
}

/// Fields are only checked for presence: strings are kept verbatim, any
/// other JSON value is stored as its compact JSON text.
fn field_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Response wrapper for a single book, `{"book": {...}}`
#[derive(Debug, Serialize, ToSchema)]
pub struct BookResponse {
    pub book: Book,
}

/// Response wrapper for the whole catalog, `{"book": [...]}`
#[derive(Debug, Serialize, ToSchema)]
pub struct BookListResponse {
    pub book: Vec<Book>,
}
