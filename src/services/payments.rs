//! Rental payments service

use rust_decimal::Decimal;
use validator::Validate;

use super::rentals::ensure_transition;
use crate::{
    error::{AppError, AppResult},
    models::{payment::CreatePayment, Payment, PaymentMethod, RentalStatus, UserClaims},
    repository::Repository,
};

#[derive(Clone)]
pub struct PaymentsService {
    repository: Repository,
}

impl PaymentsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Record a payment; a booking becomes Paid once its cost is covered
    pub async fn create(&self, caller: &UserClaims, payment: CreatePayment) -> AppResult<Payment> {
        payment.validate()?;
        if payment.amount <= Decimal::ZERO {
            return Err(AppError::Validation("Payment amount must be greater than zero".to_string()));
        }
        if payment.method == PaymentMethod::Deposit {
            return Err(AppError::Validation(
                "Deposit offsets are recorded on penalties, not as payments".to_string(),
            ));
        }

        let mut tx = self.repository.pool.begin().await?;

        let rental = self.repository.rentals.lock_by_id(&mut tx, payment.rental_id).await?;
        caller.require_self_or_staff(rental.user_id)?;
        if rental.status == RentalStatus::Cancelled {
            return Err(AppError::InvalidState("Rental has been cancelled".to_string()));
        }

        let created = self.repository.payments.insert(&mut tx, &payment).await?;

        if rental.status == RentalStatus::Booking {
            let total = self.repository.payments.total_completed(&mut tx, rental.id).await?;
            if total >= rental.total_cost {
                ensure_transition(&rental, RentalStatus::Paid)?;
                self.repository
                    .rentals
                    .set_status(&mut tx, rental.id, RentalStatus::Paid)
                    .await?;
                tracing::info!(rental_id = rental.id, %total, "Rental fully paid");
            }
        }

        tx.commit().await?;

        tracing::info!(
            rental_id = rental.id,
            payment_id = created.id,
            amount = %created.amount,
            method = %created.method,
            "Payment recorded"
        );
        Ok(created)
    }

    pub async fn list_for_rental(&self, caller: &UserClaims, rental_id: i32) -> AppResult<Vec<Payment>> {
        let rental = self.repository.rentals.get_by_id(rental_id).await?;
        caller.require_self_or_staff(rental.user_id)?;
        self.repository.payments.list_by_rental(rental_id).await
    }
}
