//! Data models for Bookshelf

pub mod book;

pub use book::{Book, BookId, BookListResponse, BookResponse, CreateBook, UpdateBook};
