//! Feedback repository

use sqlx::{Pool, Postgres};

use crate::{
    error::AppResult,
    models::{feedback::CreateFeedback, Feedback},
};

#[derive(Clone)]
pub struct FeedbackRepository {
    pool: Pool<Postgres>,
}

impl FeedbackRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn exists_for_rental(&self, rental_id: i32) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM feedback WHERE rental_id = $1)")
            .bind(rental_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    pub async fn insert(&self, user_id: i32, vehicle_id: i32, feedback: &CreateFeedback) -> AppResult<Feedback> {
        let created = sqlx::query_as::<_, Feedback>(
            r#"
            INSERT INTO feedback (rental_id, user_id, vehicle_id, rating, comment)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(feedback.rental_id)
        .bind(user_id)
        .bind(vehicle_id)
        .bind(feedback.rating)
        .bind(&feedback.comment)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    pub async fn list_by_vehicle(&self, vehicle_id: i32) -> AppResult<Vec<Feedback>> {
        let feedback = sqlx::query_as::<_, Feedback>(
            "SELECT * FROM feedback WHERE vehicle_id = $1 ORDER BY created_at DESC",
        )
        .bind(vehicle_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(feedback)
    }
}
