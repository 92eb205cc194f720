//! Libris Library Borrowing Management Service
//!
//! A Rust REST JSON API tracking books, borrowings, payments (rental fee
//! plus overdue fines through a hosted payment processor) and admin chat
//! notifications.

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
