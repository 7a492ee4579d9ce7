//! Rental stations service

use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::station::{CreateStation, Station, UpdateStation},
    repository::Repository,
};

#[derive(Clone)]
pub struct StationsService {
    repository: Repository,
}

impl StationsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn list(&self, include_inactive: bool) -> AppResult<Vec<Station>> {
        self.repository.stations.list(include_inactive).await
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Station> {
        self.repository.stations.get_by_id(id).await
    }

    pub async fn create(&self, station: CreateStation) -> AppResult<Station> {
        station.validate()?;
        let created = self.repository.stations.create(&station).await?;
        tracing::info!(station_id = created.id, name = %created.name, "Station created");
        Ok(created)
    }

    pub async fn update(&self, id: i32, station: UpdateStation) -> AppResult<Station> {
        station.validate()?;
        self.repository.stations.update(id, &station).await
    }

    /// Delete a station that no longer hosts vehicles
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        self.repository.stations.get_by_id(id).await?;

        let vehicles = self.repository.stations.count_vehicles(id).await?;
        if vehicles > 0 {
            return Err(AppError::InvalidState(format!(
                "Station still has {} vehicle(s) assigned",
                vehicles
            )));
        }

        self.repository.stations.delete(id).await?;
        tracing::info!(station_id = id, "Station deleted");
        Ok(())
    }
}
