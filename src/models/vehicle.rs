//! Vehicle model and related types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::enums::VehicleStatus;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Vehicle {
    pub id: i32,
    /// Station where the vehicle is currently parked
    pub station_id: i32,
    pub license_plate: String,
    pub model: String,
    pub battery_capacity_kwh: Option<Decimal>,
    /// Charge level in percent
    pub battery_level: i16,
    pub price_per_hour: Decimal,
    /// Deposit collected when the vehicle is booked
    pub deposit_amount: Decimal,
    pub status: VehicleStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct VehicleQuery {
    pub station_id: Option<i32>,
    pub status: Option<VehicleStatus>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateVehicle {
    pub station_id: i32,
    #[validate(length(min = 4, max = 20, message = "License plate must be 4-20 characters"))]
    pub license_plate: String,
    #[validate(length(min = 1, message = "Model is required"))]
    pub model: String,
    pub battery_capacity_kwh: Option<Decimal>,
    #[validate(range(min = 0, max = 100, message = "Battery level must be between 0 and 100"))]
    pub battery_level: Option<i16>,
    pub price_per_hour: Decimal,
    pub deposit_amount: Decimal,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateVehicle {
    pub station_id: Option<i32>,
    #[validate(length(min = 4, max = 20, message = "License plate must be 4-20 characters"))]
    pub license_plate: Option<String>,
    pub model: Option<String>,
    pub battery_capacity_kwh: Option<Decimal>,
    #[validate(range(min = 0, max = 100, message = "Battery level must be between 0 and 100"))]
    pub battery_level: Option<i16>,
    pub price_per_hour: Option<Decimal>,
    pub deposit_amount: Option<Decimal>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateVehicleStatus {
    pub status: VehicleStatus,
}
