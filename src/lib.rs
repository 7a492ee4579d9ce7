//! EV Rental platform server
//!
//! REST JSON API for renting electric vehicles from stations: bookings,
//! deposits, penalties charged against rentals and their settlement, plus
//! the account and OTP login flow for customers and staff.

use std::sync::Arc;

use sqlx::PgPool;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;
pub mod settlement;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub pool: PgPool,
    pub services: Arc<services::Services>,
}
