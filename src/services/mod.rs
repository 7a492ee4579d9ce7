//! Business logic services

pub mod auth;
pub mod contracts;
pub mod deposits;
pub mod email;
pub mod feedback;
pub mod payments;
pub mod penalties;
pub mod redis;
pub mod rentals;
pub mod stations;
pub mod users;
pub mod vehicles;

use std::sync::Arc;

use crate::{config::AuthConfig, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub auth: auth::AuthService,
    pub users: users::UsersService,
    pub stations: stations::StationsService,
    pub vehicles: vehicles::VehiclesService,
    pub rentals: rentals::RentalsService,
    pub payments: payments::PaymentsService,
    pub deposits: deposits::DepositsService,
    pub penalties: penalties::PenaltiesService,
    pub contracts: contracts::ContractsService,
    pub feedback: feedback::FeedbackService,
    pub redis: redis::RedisService,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(
        repository: Repository,
        auth_config: AuthConfig,
        mailer: Arc<dyn email::Mailer>,
        redis_service: redis::RedisService,
    ) -> Self {
        Self {
            auth: auth::AuthService::new(repository.clone(), auth_config, redis_service.clone(), mailer),
            users: users::UsersService::new(repository.clone()),
            stations: stations::StationsService::new(repository.clone()),
            vehicles: vehicles::VehiclesService::new(repository.clone()),
            rentals: rentals::RentalsService::new(repository.clone()),
            payments: payments::PaymentsService::new(repository.clone()),
            deposits: deposits::DepositsService::new(repository.clone()),
            penalties: penalties::PenaltiesService::new(repository.clone()),
            contracts: contracts::ContractsService::new(repository.clone()),
            feedback: feedback::FeedbackService::new(repository),
            redis: redis_service,
        }
    }
}
