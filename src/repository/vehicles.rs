//! Vehicles repository

use sqlx::{PgConnection, Pool, Postgres, QueryBuilder};

use crate::{
    error::{AppError, AppResult},
    models::{
        vehicle::{CreateVehicle, UpdateVehicle, VehicleQuery},
        Vehicle, VehicleStatus,
    },
};

#[derive(Clone)]
pub struct VehiclesRepository {
    pool: Pool<Postgres>,
}

impl VehiclesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn list(&self, query: &VehicleQuery) -> AppResult<Vec<Vehicle>> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT * FROM vehicles WHERE TRUE");
        if let Some(station_id) = query.station_id {
            builder.push(" AND station_id = ").push_bind(station_id);
        }
        if let Some(status) = query.status {
            builder.push(" AND status = ").push_bind(status);
        }
        builder.push(" ORDER BY model, license_plate");

        let vehicles = builder.build_query_as::<Vehicle>().fetch_all(&self.pool).await?;
        Ok(vehicles)
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Vehicle> {
        sqlx::query_as::<_, Vehicle>("SELECT * FROM vehicles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Vehicle with id {} not found", id)))
    }

    /// Load and lock a vehicle row for the rest of the transaction
    pub async fn lock_by_id(&self, conn: &mut PgConnection, id: i32) -> AppResult<Vehicle> {
        sqlx::query_as::<_, Vehicle>("SELECT * FROM vehicles WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Vehicle with id {} not found", id)))
    }

    pub async fn plate_exists(&self, plate: &str, exclude_id: Option<i32>) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM vehicles WHERE UPPER(license_plate) = UPPER($1) AND id IS DISTINCT FROM $2)",
        )
        .bind(plate)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    pub async fn create(&self, vehicle: &CreateVehicle) -> AppResult<Vehicle> {
        let created = sqlx::query_as::<_, Vehicle>(
            r#"
            INSERT INTO vehicles (station_id, license_plate, model, battery_capacity_kwh,
                                  battery_level, price_per_hour, deposit_amount)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(vehicle.station_id)
        .bind(&vehicle.license_plate)
        .bind(&vehicle.model)
        .bind(vehicle.battery_capacity_kwh)
        .bind(vehicle.battery_level.unwrap_or(100))
        .bind(vehicle.price_per_hour)
        .bind(vehicle.deposit_amount)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    pub async fn update(&self, id: i32, vehicle: &UpdateVehicle) -> AppResult<Vehicle> {
        sqlx::query_as::<_, Vehicle>(
            r#"
            UPDATE vehicles SET
                station_id = COALESCE($2, station_id),
                license_plate = COALESCE($3, license_plate),
                model = COALESCE($4, model),
                battery_capacity_kwh = COALESCE($5, battery_capacity_kwh),
                battery_level = COALESCE($6, battery_level),
                price_per_hour = COALESCE($7, price_per_hour),
                deposit_amount = COALESCE($8, deposit_amount)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(vehicle.station_id)
        .bind(&vehicle.license_plate)
        .bind(&vehicle.model)
        .bind(vehicle.battery_capacity_kwh)
        .bind(vehicle.battery_level)
        .bind(vehicle.price_per_hour)
        .bind(vehicle.deposit_amount)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Vehicle with id {} not found", id)))
    }

    pub async fn set_status(&self, conn: &mut PgConnection, id: i32, status: VehicleStatus) -> AppResult<()> {
        sqlx::query("UPDATE vehicles SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    /// Park a returned vehicle at `station_id`
    pub async fn park(
        &self,
        conn: &mut PgConnection,
        id: i32,
        station_id: i32,
        battery_level: Option<i16>,
        status: VehicleStatus,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE vehicles
            SET station_id = $2, battery_level = COALESCE($3, battery_level), status = $4
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(station_id)
        .bind(battery_level)
        .bind(status)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    pub async fn has_active_rental(&self, id: i32) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM rentals WHERE vehicle_id = $1 AND status IN ('Booking', 'Paid', 'InProgress'))",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM vehicles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Vehicle with id {} not found", id)));
        }
        Ok(())
    }
}
