//! Data models for EV Rental

pub mod contract;
pub mod deposit;
pub mod enums;
pub mod feedback;
pub mod payment;
pub mod penalty;
pub mod rental;
pub mod station;
pub mod user;
pub mod vehicle;

// Re-export commonly used types
pub use contract::Contract;
pub use deposit::Deposit;
pub use enums::{
    ContractStatus, DepositStatus, PaymentMethod, PaymentStatus, PenaltyStatus, RentalStatus,
    Role, UserStatus, VehicleStatus,
};
pub use feedback::Feedback;
pub use payment::Payment;
pub use penalty::{Penalty, RentalPenalty};
pub use rental::{Rental, RentalDetails};
pub use station::Station;
pub use user::{User, UserClaims, UserShort};
pub use vehicle::Vehicle;
