//! Rental (booking) model and lifecycle rules

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::deposit::Deposit;
use super::enums::RentalStatus;

/// Rental model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Rental {
    pub id: i32,
    pub user_id: i32,
    pub vehicle_id: i32,
    pub pickup_station_id: i32,
    pub return_station_id: i32,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub actual_start: Option<DateTime<Utc>>,
    pub actual_end: Option<DateTime<Utc>>,
    pub total_cost: Decimal,
    pub status: RentalStatus,
    pub contract_id: Option<i32>,
    /// Set when the customer asked to bring the vehicle back early
    pub early_return_requested: bool,
    pub early_return_requested_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Rental with its deposit, returned by booking and detail endpoints
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RentalDetails {
    #[serde(flatten)]
    pub rental: Rental,
    pub deposit: Option<Deposit>,
}

/// Booking request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateRental {
    pub vehicle_id: i32,
    pub pickup_station_id: i32,
    /// Defaults to the pickup station
    pub return_station_id: Option<i32>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct RentalQuery {
    pub status: Option<RentalStatus>,
    pub vehicle_id: Option<i32>,
    pub user_id: Option<i32>,
    pub station_id: Option<i32>,
}

/// Vehicle hand-back at the end of a rental
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CheckoutRequest {
    /// Station the vehicle was returned to (defaults to the booked one)
    pub return_station_id: Option<i32>,
    #[validate(range(min = 0, max = 100, message = "Battery level must be between 0 and 100"))]
    pub battery_level: Option<i16>,
}

impl RentalStatus {
    /// Booking -> Paid | Cancelled, Paid -> InProgress | Cancelled, InProgress -> Completed
    pub fn can_transition_to(&self, next: RentalStatus) -> bool {
        use RentalStatus::*;
        matches!(
            (self, next),
            (Booking, Paid)
                | (Booking, Cancelled)
                | (Paid, InProgress)
                | (Paid, Cancelled)
                | (InProgress, Completed)
        )
    }

    /// Rentals that still hold the vehicle
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            RentalStatus::Booking | RentalStatus::Paid | RentalStatus::InProgress
        )
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, RentalStatus::Completed | RentalStatus::Cancelled)
    }
}

/// Price of a booking: hourly rate times started hours
pub fn rental_cost(price_per_hour: Decimal, start: DateTime<Utc>, end: DateTime<Utc>) -> Decimal {
    let minutes = (end - start).num_minutes().max(0);
    let hours = (minutes + 59) / 60;
    price_per_hour * Decimal::from(hours)
}
