//! Vehicles service

use rust_decimal::Decimal;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        vehicle::{CreateVehicle, UpdateVehicle, VehicleQuery},
        Feedback, Vehicle, VehicleStatus,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct VehiclesService {
    repository: Repository,
}

fn check_prices(price_per_hour: Option<Decimal>, deposit_amount: Option<Decimal>) -> AppResult<()> {
    if price_per_hour.is_some_and(|p| p <= Decimal::ZERO) {
        return Err(AppError::Validation("Hourly price must be greater than zero".to_string()));
    }
    if deposit_amount.is_some_and(|d| d < Decimal::ZERO) {
        return Err(AppError::Validation("Deposit amount cannot be negative".to_string()));
    }
    Ok(())
}

impl VehiclesService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn list(&self, query: &VehicleQuery) -> AppResult<Vec<Vehicle>> {
        self.repository.vehicles.list(query).await
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Vehicle> {
        self.repository.vehicles.get_by_id(id).await
    }

    pub async fn create(&self, vehicle: CreateVehicle) -> AppResult<Vehicle> {
        vehicle.validate()?;
        check_prices(Some(vehicle.price_per_hour), Some(vehicle.deposit_amount))?;
        self.repository.stations.get_by_id(vehicle.station_id).await?;

        if self.repository.vehicles.plate_exists(&vehicle.license_plate, None).await? {
            return Err(AppError::Conflict("License plate already registered".to_string()));
        }

        let created = self.repository.vehicles.create(&vehicle).await?;
        tracing::info!(vehicle_id = created.id, plate = %created.license_plate, "Vehicle created");
        Ok(created)
    }

    pub async fn update(&self, id: i32, vehicle: UpdateVehicle) -> AppResult<Vehicle> {
        vehicle.validate()?;
        check_prices(vehicle.price_per_hour, vehicle.deposit_amount)?;

        if let Some(station_id) = vehicle.station_id {
            self.repository.stations.get_by_id(station_id).await?;
        }
        if let Some(ref plate) = vehicle.license_plate {
            if self.repository.vehicles.plate_exists(plate, Some(id)).await? {
                return Err(AppError::Conflict("License plate already registered".to_string()));
            }
        }

        self.repository.vehicles.update(id, &vehicle).await
    }

    /// Manual status change by staff (maintenance in and out)
    pub async fn set_status(&self, id: i32, status: VehicleStatus) -> AppResult<Vehicle> {
        let mut tx = self.repository.pool.begin().await?;

        let vehicle = self.repository.vehicles.lock_by_id(&mut tx, id).await?;
        if matches!(vehicle.status, VehicleStatus::Reserved | VehicleStatus::Rented)
            && status != vehicle.status
        {
            return Err(AppError::InvalidState(format!(
                "Vehicle is {} and is managed by its rental",
                vehicle.status
            )));
        }
        if matches!(status, VehicleStatus::Reserved | VehicleStatus::Rented) {
            return Err(AppError::InvalidState(format!(
                "Status {} is only set by the rental workflow",
                status
            )));
        }

        self.repository.vehicles.set_status(&mut tx, id, status).await?;
        tx.commit().await?;

        tracing::info!(vehicle_id = id, from = %vehicle.status, to = %status, "Vehicle status changed");
        self.repository.vehicles.get_by_id(id).await
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        self.repository.vehicles.get_by_id(id).await?;
        if self.repository.vehicles.has_active_rental(id).await? {
            return Err(AppError::InvalidState("Vehicle has an active rental".to_string()));
        }
        self.repository.vehicles.delete(id).await?;
        tracing::info!(vehicle_id = id, "Vehicle deleted");
        Ok(())
    }

    pub async fn feedback(&self, id: i32) -> AppResult<Vec<Feedback>> {
        self.repository.vehicles.get_by_id(id).await?;
        self.repository.feedback.list_by_vehicle(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_checks() {
        assert!(check_prices(Some(Decimal::from(50_000)), Some(Decimal::ZERO)).is_ok());
        assert!(check_prices(None, None).is_ok());
        assert!(matches!(
            check_prices(Some(Decimal::ZERO), None),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            check_prices(None, Some(Decimal::from(-1))),
            Err(AppError::Validation(_))
        ));
    }
}
