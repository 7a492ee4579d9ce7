//! Rental lifecycle service: booking, check-in, check-out and cancellation

use chrono::Utc;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        rental::{rental_cost, CheckoutRequest, CreateRental, RentalDetails, RentalQuery},
        Rental, RentalStatus, UserClaims, VehicleStatus,
    },
    repository::{rentals::NewRental, Repository},
};

/// Reject transitions outside the rental lifecycle
pub fn ensure_transition(rental: &Rental, next: RentalStatus) -> AppResult<()> {
    if rental.status.can_transition_to(next) {
        Ok(())
    } else {
        Err(AppError::InvalidState(format!(
            "Rental {} cannot go from {} to {}",
            rental.id, rental.status, next
        )))
    }
}

/// Vehicle status once a new booking is taken. A vehicle already out with
/// another renter keeps its status.
pub fn vehicle_status_after_booking(current: VehicleStatus) -> VehicleStatus {
    match current {
        VehicleStatus::Available => VehicleStatus::Reserved,
        other => other,
    }
}

/// Vehicle status once a rental lets go of it, given the statuses of the
/// vehicle's other active rentals
pub fn vehicle_status_after_release(current: VehicleStatus, others: &[RentalStatus]) -> VehicleStatus {
    if current == VehicleStatus::Maintenance {
        VehicleStatus::Maintenance
    } else if others.contains(&RentalStatus::InProgress) {
        VehicleStatus::Rented
    } else if others.is_empty() {
        VehicleStatus::Available
    } else {
        VehicleStatus::Reserved
    }
}

#[derive(Clone)]
pub struct RentalsService {
    repository: Repository,
}

impl RentalsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Rental visible to the caller
    pub async fn get_for(&self, caller: &UserClaims, id: i32) -> AppResult<Rental> {
        let rental = self.repository.rentals.get_by_id(id).await?;
        caller.require_self_or_staff(rental.user_id)?;
        Ok(rental)
    }

    pub async fn details(&self, caller: &UserClaims, id: i32) -> AppResult<RentalDetails> {
        let rental = self.get_for(caller, id).await?;
        let deposit = self.repository.deposits.get_by_rental(rental.id).await?;
        Ok(RentalDetails { rental, deposit })
    }

    /// Customers only see their own rentals
    pub async fn list(&self, caller: &UserClaims, mut query: RentalQuery) -> AppResult<Vec<Rental>> {
        if !caller.is_staff() {
            query.user_id = Some(caller.user_id);
        }
        self.repository.rentals.list(&query).await
    }

    /// Book a vehicle. Creates the rental and its deposit, and reserves the vehicle.
    pub async fn book(&self, caller: &UserClaims, request: CreateRental) -> AppResult<RentalDetails> {
        request.validate()?;
        if request.end_time <= request.start_time {
            return Err(AppError::Validation("End time must be after start time".to_string()));
        }

        let return_station_id = request.return_station_id.unwrap_or(request.pickup_station_id);
        for station_id in [request.pickup_station_id, return_station_id] {
            let station = self.repository.stations.get_by_id(station_id).await?;
            if !station.is_active {
                return Err(AppError::InvalidState(format!("Station {} is not active", station.name)));
            }
        }

        let mut tx = self.repository.pool.begin().await?;

        let vehicle = self.repository.vehicles.lock_by_id(&mut tx, request.vehicle_id).await?;
        if vehicle.status == VehicleStatus::Maintenance {
            return Err(AppError::InvalidState("Vehicle is under maintenance".to_string()));
        }
        if vehicle.station_id != request.pickup_station_id {
            return Err(AppError::InvalidState(
                "Vehicle is not parked at the pickup station".to_string(),
            ));
        }
        if self
            .repository
            .rentals
            .has_overlap(&mut tx, vehicle.id, request.start_time, request.end_time)
            .await?
        {
            return Err(AppError::Conflict(
                "Vehicle is already booked for this period".to_string(),
            ));
        }

        let total_cost = rental_cost(vehicle.price_per_hour, request.start_time, request.end_time);
        let rental = self
            .repository
            .rentals
            .insert(
                &mut tx,
                &NewRental {
                    user_id: caller.user_id,
                    vehicle_id: vehicle.id,
                    pickup_station_id: request.pickup_station_id,
                    return_station_id,
                    start_time: request.start_time,
                    end_time: request.end_time,
                    total_cost,
                },
            )
            .await?;
        let deposit = self
            .repository
            .deposits
            .insert(&mut tx, rental.id, vehicle.deposit_amount)
            .await?;
        let vehicle_status = vehicle_status_after_booking(vehicle.status);
        if vehicle_status != vehicle.status {
            self.repository
                .vehicles
                .set_status(&mut tx, vehicle.id, vehicle_status)
                .await?;
        }

        tx.commit().await?;

        tracing::info!(
            rental_id = rental.id,
            user_id = caller.user_id,
            vehicle_id = vehicle.id,
            %total_cost,
            deposit = %deposit.amount,
            "Rental booked"
        );

        Ok(RentalDetails {
            rental,
            deposit: Some(deposit),
        })
    }

    /// Hand the vehicle over to the customer
    pub async fn check_in(&self, id: i32) -> AppResult<Rental> {
        let mut tx = self.repository.pool.begin().await?;

        let rental = self.repository.rentals.lock_by_id(&mut tx, id).await?;
        ensure_transition(&rental, RentalStatus::InProgress)?;

        let rental = self.repository.rentals.start(&mut tx, id, Utc::now()).await?;
        self.repository
            .vehicles
            .set_status(&mut tx, rental.vehicle_id, VehicleStatus::Rented)
            .await?;

        tx.commit().await?;
        tracing::info!(rental_id = id, vehicle_id = rental.vehicle_id, "Rental checked in");
        Ok(rental)
    }

    /// Take the vehicle back and close the rental
    pub async fn check_out(&self, id: i32, request: CheckoutRequest) -> AppResult<Rental> {
        request.validate()?;

        let mut tx = self.repository.pool.begin().await?;

        let rental = self.repository.rentals.lock_by_id(&mut tx, id).await?;
        ensure_transition(&rental, RentalStatus::Completed)?;

        let return_station_id = request.return_station_id.unwrap_or(rental.return_station_id);
        let station = self.repository.stations.get_by_id(return_station_id).await?;
        if !station.is_active {
            return Err(AppError::InvalidState(format!("Station {} is not active", station.name)));
        }

        let rental = self
            .repository
            .rentals
            .finish(&mut tx, id, return_station_id, Utc::now())
            .await?;
        let vehicle = self.repository.vehicles.lock_by_id(&mut tx, rental.vehicle_id).await?;
        let others = self
            .repository
            .rentals
            .other_active_statuses(&mut tx, vehicle.id, id)
            .await?;
        self.repository
            .vehicles
            .park(
                &mut tx,
                vehicle.id,
                return_station_id,
                request.battery_level,
                vehicle_status_after_release(vehicle.status, &others),
            )
            .await?;

        tx.commit().await?;
        tracing::info!(
            rental_id = id,
            vehicle_id = rental.vehicle_id,
            station_id = return_station_id,
            "Rental checked out"
        );
        Ok(rental)
    }

    pub async fn cancel(&self, caller: &UserClaims, id: i32) -> AppResult<Rental> {
        let mut tx = self.repository.pool.begin().await?;

        let rental = self.repository.rentals.lock_by_id(&mut tx, id).await?;
        caller.require_self_or_staff(rental.user_id)?;
        ensure_transition(&rental, RentalStatus::Cancelled)?;

        let rental = self
            .repository
            .rentals
            .set_status(&mut tx, id, RentalStatus::Cancelled)
            .await?;
        let vehicle = self.repository.vehicles.lock_by_id(&mut tx, rental.vehicle_id).await?;
        let others = self
            .repository
            .rentals
            .other_active_statuses(&mut tx, vehicle.id, id)
            .await?;
        let vehicle_status = vehicle_status_after_release(vehicle.status, &others);
        if vehicle_status != vehicle.status {
            self.repository
                .vehicles
                .set_status(&mut tx, vehicle.id, vehicle_status)
                .await?;
        }

        tx.commit().await?;
        tracing::info!(rental_id = id, by = caller.user_id, "Rental cancelled");
        Ok(rental)
    }

    /// Customer asks to bring the vehicle back before the booked end time
    pub async fn request_early_return(&self, caller: &UserClaims, id: i32) -> AppResult<Rental> {
        let rental = self.repository.rentals.get_by_id(id).await?;
        if rental.user_id != caller.user_id {
            return Err(AppError::Authorization(
                "Only the renter can request an early return".to_string(),
            ));
        }
        if rental.status != RentalStatus::InProgress {
            return Err(AppError::InvalidState(
                "Early return can only be requested for a rental in progress".to_string(),
            ));
        }
        if rental.early_return_requested {
            return Err(AppError::InvalidState("Early return already requested".to_string()));
        }

        let rental = self.repository.rentals.request_early_return(id, Utc::now()).await?;
        tracing::info!(rental_id = id, "Early return requested");
        Ok(rental)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal::Decimal;

    fn rental(status: RentalStatus) -> Rental {
        let now = Utc::now();
        Rental {
            id: 1,
            user_id: 2,
            vehicle_id: 3,
            pickup_station_id: 4,
            return_station_id: 4,
            start_time: now,
            end_time: now + Duration::hours(2),
            actual_start: None,
            actual_end: None,
            total_cost: Decimal::from(100_000),
            status,
            contract_id: None,
            early_return_requested: false,
            early_return_requested_at: None,
            created_at: now,
        }
    }

    #[test]
    fn test_ensure_transition() {
        assert!(ensure_transition(&rental(RentalStatus::Paid), RentalStatus::InProgress).is_ok());
        assert!(matches!(
            ensure_transition(&rental(RentalStatus::Booking), RentalStatus::InProgress),
            Err(AppError::InvalidState(_))
        ));
        assert!(matches!(
            ensure_transition(&rental(RentalStatus::Completed), RentalStatus::Cancelled),
            Err(AppError::InvalidState(_))
        ));
    }

    #[test]
    fn test_booking_keeps_vehicle_out_with_another_renter() {
        assert_eq!(vehicle_status_after_booking(VehicleStatus::Available), VehicleStatus::Reserved);
        assert_eq!(vehicle_status_after_booking(VehicleStatus::Rented), VehicleStatus::Rented);
        assert_eq!(vehicle_status_after_booking(VehicleStatus::Reserved), VehicleStatus::Reserved);
    }

    #[test]
    fn test_cancel_does_not_free_a_rented_vehicle() {
        // Rental A is out with the car, B booked for next week then cancelled
        let status = vehicle_status_after_booking(VehicleStatus::Rented);
        assert_eq!(
            vehicle_status_after_release(status, &[RentalStatus::InProgress]),
            VehicleStatus::Rented
        );
    }

    #[test]
    fn test_release_status_follows_remaining_rentals() {
        assert_eq!(vehicle_status_after_release(VehicleStatus::Reserved, &[]), VehicleStatus::Available);
        assert_eq!(vehicle_status_after_release(VehicleStatus::Rented, &[]), VehicleStatus::Available);
        assert_eq!(
            vehicle_status_after_release(VehicleStatus::Reserved, &[RentalStatus::Paid]),
            VehicleStatus::Reserved
        );
        assert_eq!(
            vehicle_status_after_release(VehicleStatus::Rented, &[RentalStatus::Booking, RentalStatus::Paid]),
            VehicleStatus::Reserved
        );
        assert_eq!(vehicle_status_after_release(VehicleStatus::Maintenance, &[]), VehicleStatus::Maintenance);
    }
}
