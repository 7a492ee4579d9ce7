//! Stations repository

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::station::{CreateStation, Station, UpdateStation},
};

#[derive(Clone)]
pub struct StationsRepository {
    pool: Pool<Postgres>,
}

impl StationsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn list(&self, include_inactive: bool) -> AppResult<Vec<Station>> {
        let stations = sqlx::query_as::<_, Station>(
            "SELECT * FROM stations WHERE is_active OR $1 ORDER BY name",
        )
        .bind(include_inactive)
        .fetch_all(&self.pool)
        .await?;
        Ok(stations)
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Station> {
        sqlx::query_as::<_, Station>("SELECT * FROM stations WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Station with id {} not found", id)))
    }

    pub async fn create(&self, station: &CreateStation) -> AppResult<Station> {
        let created = sqlx::query_as::<_, Station>(
            r#"
            INSERT INTO stations (name, address, latitude, longitude, capacity)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(&station.name)
        .bind(&station.address)
        .bind(station.latitude)
        .bind(station.longitude)
        .bind(station.capacity.unwrap_or(0))
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    pub async fn update(&self, id: i32, station: &UpdateStation) -> AppResult<Station> {
        sqlx::query_as::<_, Station>(
            r#"
            UPDATE stations SET
                name = COALESCE($2, name),
                address = COALESCE($3, address),
                latitude = COALESCE($4, latitude),
                longitude = COALESCE($5, longitude),
                capacity = COALESCE($6, capacity),
                is_active = COALESCE($7, is_active)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&station.name)
        .bind(&station.address)
        .bind(station.latitude)
        .bind(station.longitude)
        .bind(station.capacity)
        .bind(station.is_active)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Station with id {} not found", id)))
    }

    pub async fn count_vehicles(&self, id: i32) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM vehicles WHERE station_id = $1")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM stations WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Station with id {} not found", id)));
        }
        Ok(())
    }
}
