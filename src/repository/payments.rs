//! Payments repository

use rust_decimal::Decimal;
use sqlx::{PgConnection, Pool, Postgres};

use crate::{
    error::AppResult,
    models::{payment::CreatePayment, Payment, PaymentStatus},
};

#[derive(Clone)]
pub struct PaymentsRepository {
    pool: Pool<Postgres>,
}

impl PaymentsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, conn: &mut PgConnection, payment: &CreatePayment) -> AppResult<Payment> {
        let created = sqlx::query_as::<_, Payment>(
            r#"
            INSERT INTO payments (rental_id, amount, method, transaction_ref, status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(payment.rental_id)
        .bind(payment.amount)
        .bind(payment.method)
        .bind(&payment.transaction_ref)
        .bind(PaymentStatus::Completed)
        .fetch_one(&mut *conn)
        .await?;
        Ok(created)
    }

    pub async fn list_by_rental(&self, rental_id: i32) -> AppResult<Vec<Payment>> {
        let payments = sqlx::query_as::<_, Payment>(
            "SELECT * FROM payments WHERE rental_id = $1 ORDER BY paid_at, id",
        )
        .bind(rental_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(payments)
    }

    /// Sum of completed payments for a rental
    pub async fn total_completed(&self, conn: &mut PgConnection, rental_id: i32) -> AppResult<Decimal> {
        let total: Decimal = sqlx::query_scalar(
            "SELECT COALESCE(SUM(amount), 0) FROM payments WHERE rental_id = $1 AND status = $2",
        )
        .bind(rental_id)
        .bind(PaymentStatus::Completed)
        .fetch_one(&mut *conn)
        .await?;
        Ok(total)
    }
}
