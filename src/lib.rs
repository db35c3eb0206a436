//! Bookshelf Server
//!
//! A small REST JSON API over an in-memory book catalog, with structured
//! access logging for every request and a single error boundary that turns
//! unexpected failures into an opaque 500 response.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod middleware;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}

impl AppState {
    /// Build the state with a freshly seeded catalog
    pub fn new(config: AppConfig) -> Self {
        let repository = repository::Repository::seeded();
        Self {
            config: Arc::new(config),
            services: Arc::new(services::Services::new(repository)),
        }
    }
}
