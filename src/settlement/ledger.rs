//! Deposit ledger: the only code that moves money in or out of a deposit.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::{
    error::{AppError, AppResult},
    models::{Deposit, DepositStatus, PaymentMethod, RentalPenalty},
};

/// Wraps the (possibly missing) deposit of one rental.
///
/// `offset` and `reverse` are exact mirrors: whatever `offset` moves from the
/// deposit onto a penalty, `reverse` can move back, and the deposit balance
/// stays within `0 <= used_amount <= amount`.
pub struct DepositLedger<'a> {
    deposit: Option<&'a mut Deposit>,
    touched: bool,
}

impl<'a> DepositLedger<'a> {
    pub fn new(deposit: Option<&'a mut Deposit>) -> Self {
        Self {
            deposit,
            touched: false,
        }
    }

    /// A ledger for a rental without deposit
    pub fn empty() -> Self {
        Self::new(None)
    }

    /// True when the deposit was modified and must be persisted
    pub fn is_touched(&self) -> bool {
        self.touched
    }

    /// Balance that can still be drawn
    pub fn available(&self) -> Decimal {
        match self.deposit.as_deref() {
            Some(deposit) if deposit.status == DepositStatus::Held && deposit.amount > Decimal::ZERO => {
                (deposit.amount - deposit.used_amount).max(Decimal::ZERO)
            }
            _ => Decimal::ZERO,
        }
    }

    /// Draw up to `requested` from the deposit onto `penalty`.
    /// Returns the amount actually drawn.
    pub fn offset(&mut self, penalty: &mut RentalPenalty, requested: Decimal, now: DateTime<Utc>) -> Decimal {
        if requested <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        let available = self.available();
        if available <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        let Some(deposit) = self.deposit.as_deref_mut() else {
            return Decimal::ZERO;
        };

        let amount_to_use = requested.min(available);
        deposit.used_amount += amount_to_use;
        deposit.last_used_at = Some(now);
        self.touched = true;

        penalty.deposit_used_amount += amount_to_use;
        penalty.payment_method = Some(PaymentMethod::Deposit);

        tracing::debug!(
            rental_id = penalty.rental_id,
            penalty_id = penalty.id,
            %amount_to_use,
            "Deposit offset applied"
        );

        amount_to_use
    }

    /// True once the deposit has been refunded; its balance is frozen
    pub fn is_closed(&self) -> bool {
        matches!(self.deposit.as_deref(), Some(deposit) if deposit.status == DepositStatus::Refunded)
    }

    /// Reject any change that would move money back into a refunded deposit
    pub fn ensure_open(&self) -> AppResult<()> {
        if self.is_closed() {
            return Err(AppError::InvalidState(
                "Deposit has already been refunded, its penalties can no longer change".to_string(),
            ));
        }
        Ok(())
    }

    /// Give back up to `amount` of what `penalty` drew from the deposit.
    /// Returns the amount credited back to the deposit.
    pub fn reverse(
        &mut self,
        penalty: &mut RentalPenalty,
        amount: Decimal,
        now: DateTime<Utc>,
    ) -> AppResult<Decimal> {
        let amount = amount.min(penalty.deposit_used_amount);
        if amount <= Decimal::ZERO {
            return Ok(Decimal::ZERO);
        }
        self.ensure_open()?;

        penalty.deposit_used_amount -= amount;
        if penalty.deposit_used_amount.is_zero()
            && penalty.paid_amount.is_zero()
            && penalty.payment_method == Some(PaymentMethod::Deposit)
        {
            penalty.payment_method = None;
        }

        let Some(deposit) = self.deposit.as_deref_mut() else {
            tracing::warn!(
                rental_id = penalty.rental_id,
                penalty_id = penalty.id,
                "Penalty drew from a deposit that no longer exists"
            );
            return Ok(Decimal::ZERO);
        };

        let credited = amount.min(deposit.used_amount);
        deposit.used_amount = (deposit.used_amount - amount).max(Decimal::ZERO);
        deposit.last_used_at = Some(now);
        self.touched = true;

        tracing::debug!(
            rental_id = penalty.rental_id,
            penalty_id = penalty.id,
            %credited,
            "Deposit offset reversed"
        );

        Ok(credited)
    }

    /// Close the deposit and hand back what is left of it
    pub fn refund(&mut self, now: DateTime<Utc>) -> AppResult<Decimal> {
        let available = self.available();
        let deposit = self
            .deposit
            .as_deref_mut()
            .ok_or_else(|| AppError::NotFound("Rental has no deposit".to_string()))?;

        if deposit.status == DepositStatus::Refunded {
            return Err(AppError::InvalidState("Deposit has already been refunded".to_string()));
        }

        deposit.refunded_amount = Some(available);
        deposit.refunded_at = Some(now);
        deposit.status = DepositStatus::Refunded;
        self.touched = true;

        Ok(available)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PenaltyStatus;

    fn deposit(amount: i64, used: i64) -> Deposit {
        Deposit {
            id: 1,
            rental_id: 10,
            amount: Decimal::from(amount),
            used_amount: Decimal::from(used),
            status: DepositStatus::Held,
            last_used_at: None,
            refunded_amount: None,
            refunded_at: None,
            created_at: Utc::now(),
        }
    }

    fn penalty(amount: i64) -> RentalPenalty {
        RentalPenalty {
            id: 5,
            rental_id: 10,
            penalty_id: None,
            amount: Decimal::from(amount),
            deposit_used_amount: Decimal::ZERO,
            paid_amount: Decimal::ZERO,
            status: PenaltyStatus::Pending,
            description: None,
            payment_method: None,
            paid_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_offset_is_capped_by_available_balance() {
        let mut dep = deposit(1_000_000, 700_000);
        let mut pen = penalty(500_000);
        let mut ledger = DepositLedger::new(Some(&mut dep));

        let used = ledger.offset(&mut pen, Decimal::from(500_000), Utc::now());

        assert_eq!(used, Decimal::from(300_000));
        assert!(ledger.is_touched());
        assert_eq!(ledger.available(), Decimal::ZERO);
        assert_eq!(dep.used_amount, dep.amount);
        assert_eq!(pen.deposit_used_amount, Decimal::from(300_000));
        assert_eq!(pen.payment_method, Some(PaymentMethod::Deposit));
    }

    #[test]
    fn test_offset_without_deposit_is_noop() {
        let mut pen = penalty(100);
        let mut ledger = DepositLedger::empty();
        assert_eq!(ledger.offset(&mut pen, Decimal::from(100), Utc::now()), Decimal::ZERO);
        assert!(!ledger.is_touched());
        assert_eq!(pen.payment_method, None);
    }

    #[test]
    fn test_offset_on_zero_deposit_is_noop() {
        let mut dep = deposit(0, 0);
        let mut pen = penalty(100);
        let mut ledger = DepositLedger::new(Some(&mut dep));
        assert_eq!(ledger.offset(&mut pen, Decimal::from(100), Utc::now()), Decimal::ZERO);
        assert!(!ledger.is_touched());
    }

    #[test]
    fn test_reverse_restores_balance() {
        let mut dep = deposit(1_000_000, 0);
        let mut pen = penalty(400_000);
        let now = Utc::now();
        {
            let mut ledger = DepositLedger::new(Some(&mut dep));
            ledger.offset(&mut pen, Decimal::from(400_000), now);
            let credited = ledger.reverse(&mut pen, Decimal::from(400_000), now).unwrap();
            assert_eq!(credited, Decimal::from(400_000));
            assert_eq!(ledger.available(), Decimal::from(1_000_000));
        }
        assert_eq!(dep.used_amount, Decimal::ZERO);
        assert_eq!(pen.deposit_used_amount, Decimal::ZERO);
        assert_eq!(pen.payment_method, None);
    }

    #[test]
    fn test_reverse_never_goes_below_zero() {
        // Deposit row was corrected by hand after the penalty drew from it
        let mut dep = deposit(1_000_000, 100_000);
        let mut pen = penalty(400_000);
        pen.deposit_used_amount = Decimal::from(400_000);

        let mut ledger = DepositLedger::new(Some(&mut dep));
        let credited = ledger.reverse(&mut pen, Decimal::from(400_000), Utc::now()).unwrap();

        assert_eq!(credited, Decimal::from(100_000));
        assert_eq!(dep.used_amount, Decimal::ZERO);
        assert_eq!(pen.deposit_used_amount, Decimal::ZERO);
    }

    #[test]
    fn test_reverse_is_bounded_by_penalty_share() {
        let mut dep = deposit(1_000_000, 600_000);
        let mut pen = penalty(400_000);
        pen.deposit_used_amount = Decimal::from(200_000);

        let mut ledger = DepositLedger::new(Some(&mut dep));
        let credited = ledger.reverse(&mut pen, Decimal::from(350_000), Utc::now()).unwrap();

        assert_eq!(credited, Decimal::from(200_000));
        assert_eq!(dep.used_amount, Decimal::from(400_000));
    }

    #[test]
    fn test_used_amount_never_exceeds_amount() {
        let mut dep = deposit(1_000_000, 0);
        let now = Utc::now();
        let mut penalties: Vec<RentalPenalty> = (0..6).map(|_| penalty(300_000)).collect();
        {
            let mut ledger = DepositLedger::new(Some(&mut dep));
            for (i, pen) in penalties.iter_mut().enumerate() {
                ledger.offset(pen, Decimal::from(300_000), now);
                if i % 2 == 1 {
                    ledger.reverse(pen, Decimal::from(150_000), now).unwrap();
                }
            }
        }
        let drawn: Decimal = penalties.iter().map(|p| p.deposit_used_amount).sum();
        assert!(dep.used_amount <= dep.amount);
        assert_eq!(dep.used_amount, drawn);
    }

    #[test]
    fn test_refund_returns_remaining_balance_once() {
        let mut dep = deposit(1_000_000, 250_000);
        let now = Utc::now();
        {
            let mut ledger = DepositLedger::new(Some(&mut dep));
            assert_eq!(ledger.refund(now).unwrap(), Decimal::from(750_000));
            assert_eq!(ledger.available(), Decimal::ZERO);
            assert!(matches!(ledger.refund(now), Err(AppError::InvalidState(_))));

            let mut pen = penalty(100);
            assert_eq!(ledger.offset(&mut pen, Decimal::from(100), now), Decimal::ZERO);
        }
        assert_eq!(dep.status, DepositStatus::Refunded);
        assert_eq!(dep.refunded_amount, Some(Decimal::from(750_000)));
    }

    #[test]
    fn test_reverse_after_refund_is_rejected() {
        let mut dep = deposit(1_000_000, 0);
        let mut pen = penalty(400_000);
        let now = Utc::now();
        {
            let mut ledger = DepositLedger::new(Some(&mut dep));
            ledger.offset(&mut pen, Decimal::from(400_000), now);
            assert_eq!(ledger.refund(now).unwrap(), Decimal::from(600_000));
            assert!(ledger.is_closed());

            let result = ledger.reverse(&mut pen, Decimal::from(400_000), now);
            assert!(matches!(result, Err(AppError::InvalidState(_))));
        }
        assert_eq!(dep.used_amount, Decimal::from(400_000));
        assert_eq!(pen.deposit_used_amount, Decimal::from(400_000));
        assert_eq!(dep.refunded_amount.unwrap() + dep.used_amount, dep.amount);
    }

    #[test]
    fn test_refund_without_deposit() {
        let mut ledger = DepositLedger::empty();
        assert!(matches!(ledger.refund(Utc::now()), Err(AppError::NotFound(_))));
    }
}
