//! Deposits repository
//!
//! Balance columns are only written through `save_balance`, after the
//! settlement ledger has computed the new values on a locked row.

use rust_decimal::Decimal;
use sqlx::{PgConnection, Pool, Postgres};

use crate::{error::AppResult, models::Deposit};

#[derive(Clone)]
pub struct DepositsRepository {
    pool: Pool<Postgres>,
}

impl DepositsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn get_by_rental(&self, rental_id: i32) -> AppResult<Option<Deposit>> {
        let deposit = sqlx::query_as::<_, Deposit>("SELECT * FROM deposits WHERE rental_id = $1")
            .bind(rental_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(deposit)
    }

    /// Load the deposit of a rental and lock it until the transaction ends
    pub async fn lock_by_rental(&self, conn: &mut PgConnection, rental_id: i32) -> AppResult<Option<Deposit>> {
        let deposit = sqlx::query_as::<_, Deposit>("SELECT * FROM deposits WHERE rental_id = $1 FOR UPDATE")
            .bind(rental_id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(deposit)
    }

    pub async fn insert(&self, conn: &mut PgConnection, rental_id: i32, amount: Decimal) -> AppResult<Deposit> {
        let deposit = sqlx::query_as::<_, Deposit>(
            "INSERT INTO deposits (rental_id, amount) VALUES ($1, $2) RETURNING *",
        )
        .bind(rental_id)
        .bind(amount)
        .fetch_one(&mut *conn)
        .await?;
        Ok(deposit)
    }

    /// Persist the ledger fields of a deposit
    pub async fn save_balance(&self, conn: &mut PgConnection, deposit: &Deposit) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE deposits
            SET used_amount = $2, status = $3, last_used_at = $4, refunded_amount = $5, refunded_at = $6
            WHERE id = $1
            "#,
        )
        .bind(deposit.id)
        .bind(deposit.used_amount)
        .bind(deposit.status)
        .bind(deposit.last_used_at)
        .bind(deposit.refunded_amount)
        .bind(deposit.refunded_at)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }
}
