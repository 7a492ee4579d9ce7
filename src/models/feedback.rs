//! Customer feedback on a completed rental

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Feedback {
    pub id: i32,
    pub rental_id: i32,
    pub user_id: i32,
    pub vehicle_id: i32,
    pub rating: i16,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateFeedback {
    pub rental_id: i32,
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: i16,
    #[validate(length(max = 2000, message = "Comment is too long"))]
    pub comment: Option<String>,
}
