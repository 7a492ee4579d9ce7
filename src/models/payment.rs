//! Rental payment model

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use super::enums::{PaymentMethod, PaymentStatus};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Payment {
    pub id: i32,
    pub rental_id: i32,
    pub amount: Decimal,
    pub method: PaymentMethod,
    /// Gateway or bank reference
    pub transaction_ref: Option<String>,
    pub status: PaymentStatus,
    pub paid_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreatePayment {
    pub rental_id: i32,
    pub amount: Decimal,
    pub method: PaymentMethod,
    #[validate(length(max = 120, message = "Transaction reference is too long"))]
    pub transaction_ref: Option<String>,
}
