//! Rental contracts repository

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{Contract, ContractStatus},
};

#[derive(Clone)]
pub struct ContractsRepository {
    pool: Pool<Postgres>,
}

impl ContractsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Contract> {
        sqlx::query_as::<_, Contract>("SELECT * FROM contracts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Contract with id {} not found", id)))
    }

    pub async fn get_by_rental(&self, rental_id: i32) -> AppResult<Option<Contract>> {
        let contract = sqlx::query_as::<_, Contract>("SELECT * FROM contracts WHERE rental_id = $1")
            .bind(rental_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(contract)
    }

    pub async fn insert(&self, conn: &mut PgConnection, rental_id: i32, terms: &str) -> AppResult<Contract> {
        let contract = sqlx::query_as::<_, Contract>(
            "INSERT INTO contracts (rental_id, terms, status) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(rental_id)
        .bind(terms)
        .bind(ContractStatus::Draft)
        .fetch_one(&mut *conn)
        .await?;
        Ok(contract)
    }

    /// Sign a draft contract. Returns None if it was already signed.
    pub async fn mark_signed(&self, id: i32, at: DateTime<Utc>) -> AppResult<Option<Contract>> {
        let contract = sqlx::query_as::<_, Contract>(
            r#"
            UPDATE contracts SET status = $2, signed_at = $3
            WHERE id = $1 AND status = $4
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(ContractStatus::Signed)
        .bind(at)
        .bind(ContractStatus::Draft)
        .fetch_optional(&self.pool)
        .await?;
        Ok(contract)
    }
}
