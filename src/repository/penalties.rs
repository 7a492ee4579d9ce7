//! Penalty catalog and rental penalties repository

use sqlx::{PgConnection, Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{
        penalty::{CreatePenalty, UpdatePenalty},
        Penalty, PenaltyStatus, RentalPenalty,
    },
};

#[derive(Clone)]
pub struct PenaltiesRepository {
    pool: Pool<Postgres>,
}

impl PenaltiesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    // Catalog

    pub async fn list_catalog(&self) -> AppResult<Vec<Penalty>> {
        let penalties = sqlx::query_as::<_, Penalty>("SELECT * FROM penalties ORDER BY violation_type")
            .fetch_all(&self.pool)
            .await?;
        Ok(penalties)
    }

    pub async fn get_catalog(&self, id: i32) -> AppResult<Penalty> {
        sqlx::query_as::<_, Penalty>("SELECT * FROM penalties WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Penalty type with id {} not found", id)))
    }

    pub async fn violation_type_exists(&self, violation_type: &str, exclude_id: Option<i32>) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM penalties WHERE LOWER(violation_type) = LOWER($1) AND id IS DISTINCT FROM $2)",
        )
        .bind(violation_type)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    pub async fn create_catalog(&self, penalty: &CreatePenalty) -> AppResult<Penalty> {
        let created = sqlx::query_as::<_, Penalty>(
            r#"
            INSERT INTO penalties (violation_type, description, amount, requires_customer_request)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(&penalty.violation_type)
        .bind(&penalty.description)
        .bind(penalty.amount)
        .bind(penalty.requires_customer_request)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    pub async fn update_catalog(&self, id: i32, penalty: &UpdatePenalty) -> AppResult<Penalty> {
        sqlx::query_as::<_, Penalty>(
            r#"
            UPDATE penalties SET
                violation_type = COALESCE($2, violation_type),
                description = COALESCE($3, description),
                amount = COALESCE($4, amount),
                requires_customer_request = COALESCE($5, requires_customer_request)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&penalty.violation_type)
        .bind(&penalty.description)
        .bind(penalty.amount)
        .bind(penalty.requires_customer_request)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Penalty type with id {} not found", id)))
    }

    /// Delete a catalog entry, refused while rental penalties reference it
    pub async fn delete_catalog(&self, id: i32) -> AppResult<()> {
        let in_use: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM rental_penalties WHERE penalty_id = $1)")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
        if in_use {
            return Err(AppError::Conflict(
                "Penalty type is referenced by rental penalties".to_string(),
            ));
        }

        let result = sqlx::query("DELETE FROM penalties WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Penalty type with id {} not found", id)));
        }
        Ok(())
    }

    // Rental penalties

    pub async fn get_by_id(&self, id: i32) -> AppResult<RentalPenalty> {
        sqlx::query_as::<_, RentalPenalty>("SELECT * FROM rental_penalties WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Rental penalty with id {} not found", id)))
    }

    /// Load and lock a rental penalty for the rest of the transaction
    pub async fn lock_by_id(&self, conn: &mut PgConnection, id: i32) -> AppResult<RentalPenalty> {
        sqlx::query_as::<_, RentalPenalty>("SELECT * FROM rental_penalties WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Rental penalty with id {} not found", id)))
    }

    pub async fn list_by_rental(&self, rental_id: i32) -> AppResult<Vec<RentalPenalty>> {
        let penalties = sqlx::query_as::<_, RentalPenalty>(
            "SELECT * FROM rental_penalties WHERE rental_id = $1 ORDER BY created_at, id",
        )
        .bind(rental_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(penalties)
    }

    pub async fn count_pending(&self, conn: &mut PgConnection, rental_id: i32) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM rental_penalties WHERE rental_id = $1 AND status = $2",
        )
        .bind(rental_id)
        .bind(PenaltyStatus::Pending)
        .fetch_one(&mut *conn)
        .await?;
        Ok(count)
    }

    pub async fn insert(&self, conn: &mut PgConnection, penalty: &RentalPenalty) -> AppResult<RentalPenalty> {
        let created = sqlx::query_as::<_, RentalPenalty>(
            r#"
            INSERT INTO rental_penalties (rental_id, penalty_id, amount, deposit_used_amount, paid_amount,
                                          status, description, payment_method, paid_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(penalty.rental_id)
        .bind(penalty.penalty_id)
        .bind(penalty.amount)
        .bind(penalty.deposit_used_amount)
        .bind(penalty.paid_amount)
        .bind(penalty.status)
        .bind(&penalty.description)
        .bind(penalty.payment_method)
        .bind(penalty.paid_at)
        .bind(penalty.created_at)
        .fetch_one(&mut *conn)
        .await?;
        Ok(created)
    }

    /// Persist the mutable fields of a rental penalty
    pub async fn save(&self, conn: &mut PgConnection, penalty: &RentalPenalty) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE rental_penalties SET
                amount = $2,
                deposit_used_amount = $3,
                paid_amount = $4,
                status = $5,
                description = $6,
                payment_method = $7,
                paid_at = $8
            WHERE id = $1
            "#,
        )
        .bind(penalty.id)
        .bind(penalty.amount)
        .bind(penalty.deposit_used_amount)
        .bind(penalty.paid_amount)
        .bind(penalty.status)
        .bind(&penalty.description)
        .bind(penalty.payment_method)
        .bind(penalty.paid_at)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    pub async fn delete(&self, conn: &mut PgConnection, id: i32) -> AppResult<()> {
        sqlx::query("DELETE FROM rental_penalties WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }
}
