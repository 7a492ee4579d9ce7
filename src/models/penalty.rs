//! Penalty catalog and penalties charged against rentals

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use super::enums::{PaymentMethod, PenaltyStatus};

/// Catalog entry describing a violation type and its base amount
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Penalty {
    pub id: i32,
    pub violation_type: String,
    pub description: Option<String>,
    pub amount: Decimal,
    /// Can only be charged if the customer asked for it first (early return)
    pub requires_customer_request: bool,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreatePenalty {
    #[validate(length(min = 1, max = 80, message = "Violation type is required"))]
    pub violation_type: String,
    pub description: Option<String>,
    pub amount: Decimal,
    #[serde(default)]
    pub requires_customer_request: bool,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdatePenalty {
    #[validate(length(min = 1, max = 80, message = "Violation type is required"))]
    pub violation_type: Option<String>,
    pub description: Option<String>,
    pub amount: Option<Decimal>,
    pub requires_customer_request: Option<bool>,
}

/// A charge against one rental
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct RentalPenalty {
    pub id: i32,
    pub rental_id: i32,
    /// Catalog reference
    pub penalty_id: Option<i32>,
    /// Total owed
    pub amount: Decimal,
    /// Portion covered by the rental deposit
    pub deposit_used_amount: Decimal,
    /// Portion paid by other means
    pub paid_amount: Decimal,
    pub status: PenaltyStatus,
    pub description: Option<String>,
    pub payment_method: Option<PaymentMethod>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl RentalPenalty {
    pub fn covered_amount(&self) -> Decimal {
        self.deposit_used_amount + self.paid_amount
    }

    /// Amount still owed, never negative
    pub fn remaining(&self) -> Decimal {
        (self.amount - self.covered_amount()).max(Decimal::ZERO)
    }
}

/// Charge a penalty against a rental
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateRentalPenalty {
    pub penalty_id: Option<i32>,
    /// Defaults to the catalog amount
    pub amount: Option<Decimal>,
    pub description: Option<String>,
    /// Offset the charge from the rental deposit right away
    #[serde(default)]
    pub use_deposit_first: bool,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SettlePenalty {
    #[serde(default)]
    pub use_deposit: bool,
    #[serde(default)]
    pub payment_amount: Decimal,
    pub payment_method: Option<PaymentMethod>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateRentalPenalty {
    pub amount: Decimal,
    pub description: Option<String>,
}
