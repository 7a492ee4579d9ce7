//! Rentals repository for database operations

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, Pool, Postgres, QueryBuilder};

use crate::{
    error::{AppError, AppResult},
    models::{rental::RentalQuery, Rental, RentalStatus},
};

/// Fields of a new booking
pub struct NewRental {
    pub user_id: i32,
    pub vehicle_id: i32,
    pub pickup_station_id: i32,
    pub return_station_id: i32,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub total_cost: Decimal,
}

#[derive(Clone)]
pub struct RentalsRepository {
    pool: Pool<Postgres>,
}

impl RentalsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get rental by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Rental> {
        sqlx::query_as::<_, Rental>("SELECT * FROM rentals WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Rental with id {} not found", id)))
    }

    /// Load and lock a rental row for the rest of the transaction
    pub async fn lock_by_id(&self, conn: &mut PgConnection, id: i32) -> AppResult<Rental> {
        sqlx::query_as::<_, Rental>("SELECT * FROM rentals WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Rental with id {} not found", id)))
    }

    /// List rentals, newest first
    pub async fn list(&self, query: &RentalQuery) -> AppResult<Vec<Rental>> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT * FROM rentals WHERE TRUE");
        if let Some(status) = query.status {
            builder.push(" AND status = ").push_bind(status);
        }
        if let Some(vehicle_id) = query.vehicle_id {
            builder.push(" AND vehicle_id = ").push_bind(vehicle_id);
        }
        if let Some(user_id) = query.user_id {
            builder.push(" AND user_id = ").push_bind(user_id);
        }
        if let Some(station_id) = query.station_id {
            builder
                .push(" AND (pickup_station_id = ")
                .push_bind(station_id)
                .push(" OR return_station_id = ")
                .push_bind(station_id)
                .push(")");
        }
        builder.push(" ORDER BY start_time DESC, id DESC");

        let rentals = builder.build_query_as::<Rental>().fetch_all(&self.pool).await?;
        Ok(rentals)
    }

    /// True if another active rental of the vehicle overlaps [start, end)
    pub async fn has_overlap(
        &self,
        conn: &mut PgConnection,
        vehicle_id: i32,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM rentals
                WHERE vehicle_id = $1
                  AND status IN ('Booking', 'Paid', 'InProgress')
                  AND start_time < $3
                  AND end_time > $2
            )
            "#,
        )
        .bind(vehicle_id)
        .bind(start)
        .bind(end)
        .fetch_one(&mut *conn)
        .await?;
        Ok(exists)
    }

    /// Statuses of the other active rentals of a vehicle
    pub async fn other_active_statuses(
        &self,
        conn: &mut PgConnection,
        vehicle_id: i32,
        exclude_rental_id: i32,
    ) -> AppResult<Vec<RentalStatus>> {
        let statuses = sqlx::query_scalar::<_, RentalStatus>(
            r#"
            SELECT status FROM rentals
            WHERE vehicle_id = $1
              AND id <> $2
              AND status IN ('Booking', 'Paid', 'InProgress')
            "#,
        )
        .bind(vehicle_id)
        .bind(exclude_rental_id)
        .fetch_all(&mut *conn)
        .await?;
        Ok(statuses)
    }

    pub async fn insert(&self, conn: &mut PgConnection, rental: &NewRental) -> AppResult<Rental> {
        let created = sqlx::query_as::<_, Rental>(
            r#"
            INSERT INTO rentals (user_id, vehicle_id, pickup_station_id, return_station_id,
                                 start_time, end_time, total_cost, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(rental.user_id)
        .bind(rental.vehicle_id)
        .bind(rental.pickup_station_id)
        .bind(rental.return_station_id)
        .bind(rental.start_time)
        .bind(rental.end_time)
        .bind(rental.total_cost)
        .bind(RentalStatus::Booking)
        .fetch_one(&mut *conn)
        .await?;
        Ok(created)
    }

    pub async fn set_status(&self, conn: &mut PgConnection, id: i32, status: RentalStatus) -> AppResult<Rental> {
        let rental = sqlx::query_as::<_, Rental>("UPDATE rentals SET status = $2 WHERE id = $1 RETURNING *")
            .bind(id)
            .bind(status)
            .fetch_one(&mut *conn)
            .await?;
        Ok(rental)
    }

    /// Vehicle handed over to the customer
    pub async fn start(&self, conn: &mut PgConnection, id: i32, at: DateTime<Utc>) -> AppResult<Rental> {
        let rental = sqlx::query_as::<_, Rental>(
            "UPDATE rentals SET status = $2, actual_start = $3 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(RentalStatus::InProgress)
        .bind(at)
        .fetch_one(&mut *conn)
        .await?;
        Ok(rental)
    }

    /// Vehicle returned
    pub async fn finish(
        &self,
        conn: &mut PgConnection,
        id: i32,
        return_station_id: i32,
        at: DateTime<Utc>,
    ) -> AppResult<Rental> {
        let rental = sqlx::query_as::<_, Rental>(
            r#"
            UPDATE rentals SET status = $2, actual_end = $3, return_station_id = $4
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(RentalStatus::Completed)
        .bind(at)
        .bind(return_station_id)
        .fetch_one(&mut *conn)
        .await?;
        Ok(rental)
    }

    pub async fn request_early_return(&self, id: i32, at: DateTime<Utc>) -> AppResult<Rental> {
        let rental = sqlx::query_as::<_, Rental>(
            r#"
            UPDATE rentals SET early_return_requested = TRUE, early_return_requested_at = $2
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(at)
        .fetch_one(&self.pool)
        .await?;
        Ok(rental)
    }

    pub async fn set_contract(&self, conn: &mut PgConnection, id: i32, contract_id: i32) -> AppResult<()> {
        sqlx::query("UPDATE rentals SET contract_id = $2 WHERE id = $1")
            .bind(id)
            .bind(contract_id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }
}
