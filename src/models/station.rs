//! Rental station model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Station {
    pub id: i32,
    pub name: String,
    pub address: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Number of parking slots
    pub capacity: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateStation {
    #[validate(length(min = 1, max = 120, message = "Station name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "Station address is required"))]
    pub address: String,
    #[validate(range(min = -90.0, max = 90.0, message = "Latitude out of range"))]
    pub latitude: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0, message = "Longitude out of range"))]
    pub longitude: Option<f64>,
    #[validate(range(min = 0, message = "Capacity cannot be negative"))]
    pub capacity: Option<i32>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateStation {
    #[validate(length(min = 1, max = 120, message = "Station name is required"))]
    pub name: Option<String>,
    pub address: Option<String>,
    #[validate(range(min = -90.0, max = 90.0, message = "Latitude out of range"))]
    pub latitude: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0, message = "Longitude out of range"))]
    pub longitude: Option<f64>,
    #[validate(range(min = 0, message = "Capacity cannot be negative"))]
    pub capacity: Option<i32>,
    pub is_active: Option<bool>,
}
