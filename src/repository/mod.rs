//! Repository layer for database operations

pub mod contracts;
pub mod deposits;
pub mod feedback;
pub mod payments;
pub mod penalties;
pub mod rentals;
pub mod stations;
pub mod users;
pub mod vehicles;

use sqlx::{Pool, Postgres};

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub users: users::UsersRepository,
    pub stations: stations::StationsRepository,
    pub vehicles: vehicles::VehiclesRepository,
    pub rentals: rentals::RentalsRepository,
    pub deposits: deposits::DepositsRepository,
    pub penalties: penalties::PenaltiesRepository,
    pub payments: payments::PaymentsRepository,
    pub contracts: contracts::ContractsRepository,
    pub feedback: feedback::FeedbackRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            users: users::UsersRepository::new(pool.clone()),
            stations: stations::StationsRepository::new(pool.clone()),
            vehicles: vehicles::VehiclesRepository::new(pool.clone()),
            rentals: rentals::RentalsRepository::new(pool.clone()),
            deposits: deposits::DepositsRepository::new(pool.clone()),
            penalties: penalties::PenaltiesRepository::new(pool.clone()),
            payments: payments::PaymentsRepository::new(pool.clone()),
            contracts: contracts::ContractsRepository::new(pool.clone()),
            feedback: feedback::FeedbackRepository::new(pool.clone()),
            pool,
        }
    }
}
