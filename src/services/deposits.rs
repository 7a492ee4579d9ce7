//! Deposit service: lookup and final refund

use chrono::Utc;

use crate::{
    error::{AppError, AppResult},
    models::{Deposit, UserClaims},
    repository::Repository,
    settlement::DepositLedger,
};

#[derive(Clone)]
pub struct DepositsService {
    repository: Repository,
}

impl DepositsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn get_for_rental(&self, caller: &UserClaims, rental_id: i32) -> AppResult<Deposit> {
        let rental = self.repository.rentals.get_by_id(rental_id).await?;
        caller.require_self_or_staff(rental.user_id)?;
        self.repository
            .deposits
            .get_by_rental(rental_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Rental {} has no deposit", rental_id)))
    }

    /// Hand back what is left of the deposit once the rental is closed
    /// and every penalty is covered
    pub async fn refund(&self, rental_id: i32) -> AppResult<Deposit> {
        let mut tx = self.repository.pool.begin().await?;

        let rental = self.repository.rentals.lock_by_id(&mut tx, rental_id).await?;
        if !rental.status.is_closed() {
            return Err(AppError::InvalidState(format!(
                "Deposit can only be refunded once the rental is closed (status {})",
                rental.status
            )));
        }

        let mut deposit = self.repository.deposits.lock_by_rental(&mut tx, rental_id).await?;

        let pending = self.repository.penalties.count_pending(&mut tx, rental_id).await?;
        if pending > 0 {
            return Err(AppError::InvalidState(format!(
                "Rental still has {} unpaid penalt{}",
                pending,
                if pending == 1 { "y" } else { "ies" }
            )));
        }

        let refunded = DepositLedger::new(deposit.as_mut()).refund(Utc::now())?;
        let deposit = deposit
            .ok_or_else(|| AppError::NotFound(format!("Rental {} has no deposit", rental_id)))?;
        self.repository.deposits.save_balance(&mut tx, &deposit).await?;

        tx.commit().await?;

        tracing::info!(rental_id, deposit_id = deposit.id, %refunded, "Deposit refunded");
        Ok(deposit)
    }
}
