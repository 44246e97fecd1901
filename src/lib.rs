//! Bookstore borrowing service
//!
//! Gateway over the bookstore backend that owns the borrow request
//! lifecycle: approval and delivery, returns, fines, due date extensions
//! and discounts. Every record lives upstream; this crate validates each
//! transition locally before forwarding it.

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
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
