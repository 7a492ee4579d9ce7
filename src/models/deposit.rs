//! Rental deposit model

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use super::enums::DepositStatus;

/// Deposit collected for a rental and drawn down by penalties.
///
/// Balance changes go through `settlement::DepositLedger`, which keeps
/// `0 <= used_amount <= amount`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Deposit {
    pub id: i32,
    pub rental_id: i32,
    pub amount: Decimal,
    /// Cumulative amount consumed by penalties
    pub used_amount: Decimal,
    pub status: DepositStatus,
    pub last_used_at: Option<DateTime<Utc>>,
    pub refunded_amount: Option<Decimal>,
    pub refunded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
