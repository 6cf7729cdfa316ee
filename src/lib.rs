//! Field service server
//!
//! REST JSON API for the back office of a field service operation: lookup
//! tables, equipment hierarchies and service requests, all editable in bulk
//! with per-item conflict reporting.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub services: Arc<services::Services>,
}
