//! In-memory book store

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::models::{Book, CreateBook, UpdateBook};

/// Catalog present at process start
pub fn seed_books() -> Vec<Book> {
    vec![
        Book {
            id: 1,
            title: "The Great Gatsby".to_string(),
            author: "F. Scott Fitzgerald".to_string(),
        },
        Book {
            id: 2,
            title: "1984".to_string(),
            author: "George Orwell".to_string(),
        },
    ]
}

/// Ordered book collection shared by all requests.
///
/// Every operation takes the lock for its whole duration, so id assignment
/// and removal never interleave with another writer.
#[derive(Clone, Default)]
pub struct BooksRepository {
    books: Arc<RwLock<Vec<Book>>>,
}

impl BooksRepository {
    pub fn new(books: Vec<Book>) -> Self {
        Self {
            books: Arc::new(RwLock::new(books)),
        }
    }

    /// All books in insertion order
    pub async fn list(&self) -> Vec<Book> {
        self.books.read().await.clone()
    }

    /// First book with the given id
    pub async fn get_by_id(&self, id: i64) -> Option<Book> {
        self.books
            .read()
            .await
            .iter()
            .find(|book| book.id == id)
            .cloned()
    }

    /// Append a book with id `max(id) + 1`, or 1 when the catalog is empty
    pub async fn create(&self, data: CreateBook) -> Book {
        let mut books = self.books.write().await;
        let id = books.iter().map(|book| book.id).max().unwrap_or(0) + 1;
        let book = Book {
            id,
            title: data.title,
            author: data.author,
        };
        books.push(book.clone());
        book
    }

    /// Apply a partial update in place; `None` when no book has this id
    pub async fn update(&self, id: i64, data: UpdateBook) -> Option<Book> {
        let mut books = self.books.write().await;
        let book = books.iter_mut().find(|book| book.id == id)?;
        data.apply(book);
        Some(book.clone())
    }

    /// Remove the book with this id; `false` when nothing was removed
    pub async fn delete(&self, id: i64) -> bool {
        let mut books = self.books.write().await;
        let initial_len = books.len();
        books.retain(|book| book.id != id);
        books.len() != initial_len
    }
}
