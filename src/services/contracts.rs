//! Rental contracts service

use chrono::Utc;

use crate::{
    error::{AppError, AppResult},
    models::{Contract, Rental, RentalStatus, Station, User, UserClaims, Vehicle},
    repository::Repository,
};

/// Plain-text contract terms for a rental
pub fn render_terms(rental: &Rental, renter: &User, vehicle: &Vehicle, pickup: &Station, dropoff: &Station) -> String {
    let mut terms = format!(
        "EV RENTAL CONTRACT No. {rental_id}\n\n\
         Renter: {name} <{email}>\n\
         Identity number: {identity}\n\n\
         Vehicle: {model}, plate {plate}\n\
         Pickup: {pickup_name}, {pickup_address} at {start}\n\
         Return: {dropoff_name}, {dropoff_address} by {end}\n\n\
         Rental price: {cost} ({price} per hour)\n\
         Deposit: {deposit}\n",
        rental_id = rental.id,
        name = renter.full_name,
        email = renter.email,
        identity = renter.identity_number.as_deref().unwrap_or("not provided"),
        model = vehicle.model,
        plate = vehicle.license_plate,
        pickup_name = pickup.name,
        pickup_address = pickup.address,
        start = rental.start_time.format("%Y-%m-%d %H:%M UTC"),
        dropoff_name = dropoff.name,
        dropoff_address = dropoff.address,
        end = rental.end_time.format("%Y-%m-%d %H:%M UTC"),
        cost = rental.total_cost,
        price = vehicle.price_per_hour,
        deposit = vehicle.deposit_amount,
    );
    terms.push_str(
        "\nPenalties charged during the rental (late return, damage, low battery, \
         wrong return station) may be offset from the deposit. The remaining deposit \
         is refunded once the rental is closed and all penalties are paid.\n",
    );
    terms
}

#[derive(Clone)]
pub struct ContractsService {
    repository: Repository,
}

impl ContractsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Draft the contract of a rental
    pub async fn create(&self, rental_id: i32) -> AppResult<Contract> {
        let mut tx = self.repository.pool.begin().await?;

        let rental = self.repository.rentals.lock_by_id(&mut tx, rental_id).await?;
        if rental.status == RentalStatus::Cancelled {
            return Err(AppError::InvalidState("Rental has been cancelled".to_string()));
        }
        if rental.contract_id.is_some() || self.repository.contracts.get_by_rental(rental_id).await?.is_some() {
            return Err(AppError::Conflict("Rental already has a contract".to_string()));
        }

        let renter = self.repository.users.get_by_id(rental.user_id).await?;
        let vehicle = self.repository.vehicles.get_by_id(rental.vehicle_id).await?;
        let pickup = self.repository.stations.get_by_id(rental.pickup_station_id).await?;
        let dropoff = self.repository.stations.get_by_id(rental.return_station_id).await?;
        let terms = render_terms(&rental, &renter, &vehicle, &pickup, &dropoff);

        let contract = self.repository.contracts.insert(&mut tx, rental_id, &terms).await?;
        self.repository.rentals.set_contract(&mut tx, rental_id, contract.id).await?;

        tx.commit().await?;

        tracing::info!(rental_id, contract_id = contract.id, "Contract drafted");
        Ok(contract)
    }

    pub async fn get(&self, caller: &UserClaims, id: i32) -> AppResult<Contract> {
        let contract = self.repository.contracts.get_by_id(id).await?;
        let rental = self.repository.rentals.get_by_id(contract.rental_id).await?;
        caller.require_self_or_staff(rental.user_id)?;
        Ok(contract)
    }

    /// Renter signs the contract
    pub async fn sign(&self, caller: &UserClaims, id: i32) -> AppResult<Contract> {
        let contract = self.repository.contracts.get_by_id(id).await?;
        let rental = self.repository.rentals.get_by_id(contract.rental_id).await?;
        if rental.user_id != caller.user_id {
            return Err(AppError::Authorization("Only the renter can sign the contract".to_string()));
        }

        let signed = self
            .repository
            .contracts
            .mark_signed(id, Utc::now())
            .await?
            .ok_or_else(|| AppError::InvalidState("Contract is already signed".to_string()))?;

        tracing::info!(contract_id = id, rental_id = rental.id, "Contract signed");
        Ok(signed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Role, UserStatus, VehicleStatus};
    use chrono::{Duration, TimeZone};
    use rust_decimal::Decimal;

    #[test]
    fn test_render_terms() {
        let start = Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap();
        let rental = Rental {
            id: 12,
            user_id: 1,
            vehicle_id: 2,
            pickup_station_id: 3,
            return_station_id: 4,
            start_time: start,
            end_time: start + Duration::hours(3),
            actual_start: None,
            actual_end: None,
            total_cost: Decimal::from(150_000),
            status: RentalStatus::Paid,
            contract_id: None,
            early_return_requested: false,
            early_return_requested_at: None,
            created_at: start,
        };
        let renter = User {
            id: 1,
            email: "an@evrental.vn".to_string(),
            password: "hash".to_string(),
            full_name: "Tran Thi An".to_string(),
            phone: None,
            identity_number: None,
            role: Role::Customer,
            station_id: None,
            email_verified: true,
            verification_token: None,
            verification_sent_at: None,
            status: UserStatus::Active,
            created_at: start,
            updated_at: start,
        };
        let vehicle = Vehicle {
            id: 2,
            station_id: 3,
            license_plate: "51H-123.45".to_string(),
            model: "VinFast VF e34".to_string(),
            battery_capacity_kwh: None,
            battery_level: 90,
            price_per_hour: Decimal::from(50_000),
            deposit_amount: Decimal::from(1_000_000),
            status: VehicleStatus::Reserved,
            created_at: start,
        };
        let station = |id: i32, name: &str| Station {
            id,
            name: name.to_string(),
            address: "District 1".to_string(),
            latitude: None,
            longitude: None,
            capacity: 10,
            is_active: true,
            created_at: start,
        };

        let terms = render_terms(&rental, &renter, &vehicle, &station(3, "Ben Thanh"), &station(4, "Thu Duc"));

        assert!(terms.starts_with("EV RENTAL CONTRACT No. 12"));
        assert!(terms.contains("Tran Thi An <an@evrental.vn>"));
        assert!(terms.contains("Identity number: not provided"));
        assert!(terms.contains("plate 51H-123.45"));
        assert!(terms.contains("Ben Thanh, District 1 at 2024-06-01 08:00 UTC"));
        assert!(terms.contains("Thu Duc, District 1 by 2024-06-01 11:00 UTC"));
        assert!(terms.contains("Deposit: 1000000"));
    }
}
