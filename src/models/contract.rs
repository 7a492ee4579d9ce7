//! Rental contract model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use super::enums::ContractStatus;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Contract {
    pub id: i32,
    pub rental_id: i32,
    pub terms: String,
    pub status: ContractStatus,
    pub signed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
