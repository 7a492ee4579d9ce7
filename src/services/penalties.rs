//! Penalty service: catalog management and charging penalties against rentals
//!
//! Each mutation of a rental penalty runs in one transaction that locks the
//! penalty and the rental deposit, applies the settlement rules in memory and
//! writes both rows back.

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::PgConnection;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        penalty::{CreatePenalty, CreateRentalPenalty, SettlePenalty, UpdatePenalty, UpdateRentalPenalty},
        Deposit, Penalty, RentalPenalty, UserClaims,
    },
    repository::Repository,
    settlement::{self, DepositLedger},
};

#[derive(Clone)]
pub struct PenaltiesService {
    repository: Repository,
}

impl PenaltiesService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    // Catalog

    pub async fn list_catalog(&self) -> AppResult<Vec<Penalty>> {
        self.repository.penalties.list_catalog().await
    }

    pub async fn create_catalog(&self, penalty: CreatePenalty) -> AppResult<Penalty> {
        penalty.validate()?;
        if penalty.amount <= Decimal::ZERO {
            return Err(AppError::Validation("Penalty amount must be greater than zero".to_string()));
        }
        if self
            .repository
            .penalties
            .violation_type_exists(&penalty.violation_type, None)
            .await?
        {
            return Err(AppError::Conflict("Violation type already exists".to_string()));
        }

        let created = self.repository.penalties.create_catalog(&penalty).await?;
        tracing::info!(penalty_id = created.id, violation_type = %created.violation_type, "Penalty type created");
        Ok(created)
    }

    pub async fn update_catalog(&self, id: i32, penalty: UpdatePenalty) -> AppResult<Penalty> {
        penalty.validate()?;
        if penalty.amount.is_some_and(|a| a <= Decimal::ZERO) {
            return Err(AppError::Validation("Penalty amount must be greater than zero".to_string()));
        }
        if let Some(ref violation_type) = penalty.violation_type {
            if self
                .repository
                .penalties
                .violation_type_exists(violation_type, Some(id))
                .await?
            {
                return Err(AppError::Conflict("Violation type already exists".to_string()));
            }
        }

        self.repository.penalties.update_catalog(id, &penalty).await
    }

    pub async fn delete_catalog(&self, id: i32) -> AppResult<()> {
        self.repository.penalties.delete_catalog(id).await?;
        tracing::info!(penalty_id = id, "Penalty type deleted");
        Ok(())
    }

    // Rental penalties

    pub async fn list_for_rental(&self, caller: &UserClaims, rental_id: i32) -> AppResult<Vec<RentalPenalty>> {
        let rental = self.repository.rentals.get_by_id(rental_id).await?;
        caller.require_self_or_staff(rental.user_id)?;
        self.repository.penalties.list_by_rental(rental_id).await
    }

    pub async fn get(&self, caller: &UserClaims, id: i32) -> AppResult<RentalPenalty> {
        let penalty = self.repository.penalties.get_by_id(id).await?;
        let rental = self.repository.rentals.get_by_id(penalty.rental_id).await?;
        caller.require_self_or_staff(rental.user_id)?;
        Ok(penalty)
    }

    /// Charge a penalty against a rental
    pub async fn create(&self, rental_id: i32, request: CreateRentalPenalty) -> AppResult<RentalPenalty> {
        let catalog = match request.penalty_id {
            Some(penalty_id) => Some(self.repository.penalties.get_catalog(penalty_id).await?),
            None => None,
        };

        let mut tx = self.repository.pool.begin().await?;

        let rental = self.repository.rentals.lock_by_id(&mut tx, rental_id).await?;
        let mut deposit = self.repository.deposits.lock_by_rental(&mut tx, rental_id).await?;

        let now = Utc::now();
        let (penalty, touched) = {
            let mut ledger = DepositLedger::new(deposit.as_mut());
            let penalty = settlement::open_penalty(&rental, catalog.as_ref(), &request, &mut ledger, now)?;
            (penalty, ledger.is_touched())
        };

        let penalty = self.repository.penalties.insert(&mut tx, &penalty).await?;
        self.persist_deposit(&mut tx, deposit.as_ref(), touched).await?;

        tx.commit().await?;

        tracing::info!(
            rental_id,
            penalty_id = penalty.id,
            amount = %penalty.amount,
            deposit_used = %penalty.deposit_used_amount,
            status = %penalty.status,
            "Penalty charged"
        );
        Ok(penalty)
    }

    /// Pay a penalty from the deposit and/or another payment method
    pub async fn settle(&self, id: i32, request: SettlePenalty) -> AppResult<RentalPenalty> {
        let mut tx = self.repository.pool.begin().await?;

        let mut penalty = self.repository.penalties.lock_by_id(&mut tx, id).await?;
        let mut deposit = self
            .repository
            .deposits
            .lock_by_rental(&mut tx, penalty.rental_id)
            .await?;

        let now = Utc::now();
        let (changed, touched) = {
            let mut ledger = DepositLedger::new(deposit.as_mut());
            let changed = settlement::settle_penalty(&mut penalty, &mut ledger, &request, now)?;
            (changed, ledger.is_touched())
        };

        if !changed {
            tracing::debug!(penalty_id = id, "Penalty already settled, nothing to do");
            return Ok(penalty);
        }

        self.repository.penalties.save(&mut tx, &penalty).await?;
        self.persist_deposit(&mut tx, deposit.as_ref(), touched).await?;

        tx.commit().await?;

        tracing::info!(
            rental_id = penalty.rental_id,
            penalty_id = id,
            deposit_used = %penalty.deposit_used_amount,
            paid = %penalty.paid_amount,
            status = %penalty.status,
            "Penalty settlement recorded"
        );
        Ok(penalty)
    }

    /// Change the amount of an unsettled penalty
    pub async fn update(&self, id: i32, request: UpdateRentalPenalty) -> AppResult<RentalPenalty> {
        let mut tx = self.repository.pool.begin().await?;

        let mut penalty = self.repository.penalties.lock_by_id(&mut tx, id).await?;
        let mut deposit = self
            .repository
            .deposits
            .lock_by_rental(&mut tx, penalty.rental_id)
            .await?;

        let previous_amount = penalty.amount;
        let now = Utc::now();
        let touched = {
            let mut ledger = DepositLedger::new(deposit.as_mut());
            settlement::amend_penalty(&mut penalty, &mut ledger, request.amount, request.description, now)?;
            ledger.is_touched()
        };

        self.repository.penalties.save(&mut tx, &penalty).await?;
        self.persist_deposit(&mut tx, deposit.as_ref(), touched).await?;

        tx.commit().await?;

        tracing::info!(
            rental_id = penalty.rental_id,
            penalty_id = id,
            from = %previous_amount,
            to = %penalty.amount,
            status = %penalty.status,
            "Penalty amended"
        );
        Ok(penalty)
    }

    /// Delete an unsettled penalty, crediting its deposit share back
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let mut tx = self.repository.pool.begin().await?;

        let mut penalty = self.repository.penalties.lock_by_id(&mut tx, id).await?;
        let mut deposit = self
            .repository
            .deposits
            .lock_by_rental(&mut tx, penalty.rental_id)
            .await?;

        let now = Utc::now();
        let (credited, touched) = {
            let mut ledger = DepositLedger::new(deposit.as_mut());
            let credited = settlement::release_penalty(&mut penalty, &mut ledger, now)?;
            (credited, ledger.is_touched())
        };

        self.persist_deposit(&mut tx, deposit.as_ref(), touched).await?;
        self.repository.penalties.delete(&mut tx, id).await?;

        tx.commit().await?;

        tracing::info!(rental_id = penalty.rental_id, penalty_id = id, %credited, "Penalty deleted");
        Ok(())
    }

    async fn persist_deposit(
        &self,
        conn: &mut PgConnection,
        deposit: Option<&Deposit>,
        touched: bool,
    ) -> AppResult<()> {
        match deposit {
            Some(deposit) if touched => self.repository.deposits.save_balance(conn, deposit).await,
            _ => Ok(()),
        }
    }
}
