//! Repository layer over the in-memory catalog

pub mod books;

use crate::models::Book;

/// Main repository struct holding every store
#[derive(Clone)]
pub struct Repository {
    pub books: books::BooksRepository,
}

impl Repository {
    /// Create a repository around an explicit set of books
    pub fn new(books: Vec<Book>) -> Self {
        Self {
            books: books::BooksRepository::new(books),
        }
    }

    /// Create a repository holding the startup catalog
    pub fn seeded() -> Self {
        Self::new(books::seed_books())
    }
}
