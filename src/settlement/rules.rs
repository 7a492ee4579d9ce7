//! Penalty charging and settlement rules.
//!
//! Every function works on in-memory rows; the caller loads them inside a
//! transaction (deposit row locked) and persists whatever changed.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::ledger::DepositLedger;
use crate::{
    error::{AppError, AppResult},
    models::{
        penalty::{CreateRentalPenalty, SettlePenalty},
        PaymentMethod, Penalty, PenaltyStatus, Rental, RentalPenalty, RentalStatus,
    },
};

/// Check that `catalog` may be charged against `rental` at all
pub fn ensure_chargeable(rental: &Rental, catalog: Option<&Penalty>) -> AppResult<()> {
    if rental.status == RentalStatus::Cancelled {
        return Err(AppError::InvalidState(
            "Cannot charge a penalty on a cancelled rental".to_string(),
        ));
    }

    if let Some(catalog) = catalog {
        if catalog.requires_customer_request && !rental.early_return_requested {
            return Err(AppError::InvalidState(format!(
                "Penalty '{}' requires an early return request from the customer",
                catalog.violation_type
            )));
        }
    }

    Ok(())
}

/// Build a new penalty for `rental`, drawing on the deposit first when asked.
/// The returned row has no id yet.
pub fn open_penalty(
    rental: &Rental,
    catalog: Option<&Penalty>,
    request: &CreateRentalPenalty,
    ledger: &mut DepositLedger<'_>,
    now: DateTime<Utc>,
) -> AppResult<RentalPenalty> {
    ensure_chargeable(rental, catalog)?;

    let amount = request
        .amount
        .or_else(|| catalog.map(|c| c.amount))
        .ok_or_else(|| AppError::Validation("Penalty amount is required".to_string()))?;
    if amount <= Decimal::ZERO {
        return Err(AppError::Validation("Penalty amount must be greater than zero".to_string()));
    }

    let mut penalty = RentalPenalty {
        id: 0,
        rental_id: rental.id,
        penalty_id: catalog.map(|c| c.id),
        amount,
        deposit_used_amount: Decimal::ZERO,
        paid_amount: Decimal::ZERO,
        status: PenaltyStatus::Pending,
        description: request
            .description
            .clone()
            .or_else(|| catalog.and_then(|c| c.description.clone())),
        payment_method: None,
        paid_at: None,
        created_at: now,
    };

    if request.use_deposit_first {
        ledger.offset(&mut penalty, amount, now);
        if penalty.deposit_used_amount >= penalty.amount {
            penalty.status = PenaltyStatus::OffsetFromDeposit;
            penalty.paid_at = Some(now);
        }
    }

    Ok(penalty)
}

/// Apply a settlement request. Returns false when the penalty was already
/// settled and nothing changed.
pub fn settle_penalty(
    penalty: &mut RentalPenalty,
    ledger: &mut DepositLedger<'_>,
    request: &SettlePenalty,
    now: DateTime<Utc>,
) -> AppResult<bool> {
    if penalty.status == PenaltyStatus::Settled {
        return Ok(false);
    }
    if request.payment_amount < Decimal::ZERO {
        return Err(AppError::Validation("Payment amount cannot be negative".to_string()));
    }
    if request.payment_amount > Decimal::ZERO && request.payment_method == Some(PaymentMethod::Deposit) {
        return Err(AppError::Validation(
            "Use the deposit flag to pay from the deposit".to_string(),
        ));
    }

    let remaining = penalty.remaining();
    let deposit_share = if request.use_deposit && remaining > Decimal::ZERO {
        remaining.min(ledger.available())
    } else {
        Decimal::ZERO
    };
    if request.payment_amount > remaining - deposit_share {
        return Err(AppError::Validation(format!(
            "Payment of {} exceeds the {} still owed",
            request.payment_amount,
            remaining - deposit_share
        )));
    }

    if deposit_share > Decimal::ZERO {
        ledger.offset(penalty, remaining, now);
    }

    if request.payment_amount > Decimal::ZERO {
        penalty.paid_amount += request.payment_amount;
        penalty.payment_method = Some(request.payment_method.unwrap_or(PaymentMethod::Cash));
    }

    refresh_status(penalty, now);
    Ok(true)
}

/// Change the amount (and optionally description) of an unsettled penalty,
/// handing back to the deposit whatever the new amount no longer needs.
pub fn amend_penalty(
    penalty: &mut RentalPenalty,
    ledger: &mut DepositLedger<'_>,
    new_amount: Decimal,
    description: Option<String>,
    now: DateTime<Utc>,
) -> AppResult<()> {
    if penalty.status == PenaltyStatus::Settled {
        return Err(AppError::InvalidState("A settled penalty cannot be modified".to_string()));
    }
    ledger.ensure_open()?;
    if new_amount <= Decimal::ZERO {
        return Err(AppError::Validation("Penalty amount must be greater than zero".to_string()));
    }
    if penalty.paid_amount > new_amount {
        return Err(AppError::InvalidState(format!(
            "Amount cannot be lowered below the {} already paid",
            penalty.paid_amount
        )));
    }

    let previous_deposit_share = penalty.deposit_used_amount;
    let excess = penalty.covered_amount() - new_amount;
    if excess > Decimal::ZERO {
        ledger.reverse(penalty, excess, now)?;
    }

    if new_amount > previous_deposit_share && penalty.status == PenaltyStatus::OffsetFromDeposit {
        penalty.status = PenaltyStatus::Pending;
        penalty.paid_at = None;
    }

    penalty.amount = new_amount;
    if description.is_some() {
        penalty.description = description;
    }

    refresh_status(penalty, now);
    Ok(())
}

/// Prepare an unsettled penalty for deletion by handing its deposit share back.
/// Returns the amount credited to the deposit.
pub fn release_penalty(
    penalty: &mut RentalPenalty,
    ledger: &mut DepositLedger<'_>,
    now: DateTime<Utc>,
) -> AppResult<Decimal> {
    if penalty.status == PenaltyStatus::Settled {
        return Err(AppError::InvalidState("A settled penalty cannot be deleted".to_string()));
    }
    ledger.ensure_open()?;

    let share = penalty.deposit_used_amount;
    ledger.reverse(penalty, share, now)
}

/// Derive the status from the amounts
pub fn refresh_status(penalty: &mut RentalPenalty, now: DateTime<Utc>) {
    if penalty.covered_amount() >= penalty.amount {
        let status = if penalty.deposit_used_amount >= penalty.amount {
            PenaltyStatus::OffsetFromDeposit
        } else {
            PenaltyStatus::Settled
        };
        if penalty.status != status || penalty.paid_at.is_none() {
            penalty.paid_at = Some(now);
        }
        penalty.status = status;
    } else {
        penalty.status = PenaltyStatus::Pending;
        penalty.paid_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Deposit, DepositStatus};

    fn rental(early_return_requested: bool) -> Rental {
        let now = Utc::now();
        Rental {
            id: 42,
            user_id: 3,
            vehicle_id: 9,
            pickup_station_id: 1,
            return_station_id: 1,
            start_time: now,
            end_time: now + chrono::Duration::hours(4),
            actual_start: Some(now),
            actual_end: None,
            total_cost: Decimal::from(200_000),
            status: RentalStatus::InProgress,
            contract_id: None,
            early_return_requested,
            early_return_requested_at: None,
            created_at: now,
        }
    }

    fn deposit(amount: i64) -> Deposit {
        Deposit {
            id: 1,
            rental_id: 42,
            amount: Decimal::from(amount),
            used_amount: Decimal::ZERO,
            status: DepositStatus::Held,
            last_used_at: None,
            refunded_amount: None,
            refunded_at: None,
            created_at: Utc::now(),
        }
    }

    fn catalog(violation_type: &str, requires_customer_request: bool) -> Penalty {
        Penalty {
            id: 2,
            violation_type: violation_type.to_string(),
            description: Some("catalog text".to_string()),
            amount: Decimal::from(50_000),
            requires_customer_request,
        }
    }

    fn charge(amount: i64, use_deposit_first: bool) -> CreateRentalPenalty {
        CreateRentalPenalty {
            penalty_id: None,
            amount: Some(Decimal::from(amount)),
            description: None,
            use_deposit_first,
        }
    }

    fn pending(amount: i64) -> RentalPenalty {
        RentalPenalty {
            id: 7,
            rental_id: 42,
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
    fn test_create_offset_fully_from_deposit() {
        let mut dep = deposit(1_000_000);
        let now = Utc::now();
        let penalty = {
            let mut ledger = DepositLedger::new(Some(&mut dep));
            open_penalty(&rental(false), None, &charge(400_000, true), &mut ledger, now).unwrap()
        };

        assert_eq!(penalty.deposit_used_amount, Decimal::from(400_000));
        assert_eq!(penalty.status, PenaltyStatus::OffsetFromDeposit);
        assert_eq!(penalty.paid_at, Some(now));
        assert_eq!(dep.used_amount, Decimal::from(400_000));
    }

    #[test]
    fn test_create_partially_covered_stays_pending() {
        let mut dep = deposit(100_000);
        let mut ledger = DepositLedger::new(Some(&mut dep));
        let penalty =
            open_penalty(&rental(false), None, &charge(400_000, true), &mut ledger, Utc::now()).unwrap();

        assert_eq!(penalty.deposit_used_amount, Decimal::from(100_000));
        assert_eq!(penalty.status, PenaltyStatus::Pending);
        assert_eq!(penalty.remaining(), Decimal::from(300_000));
    }

    #[test]
    fn test_create_without_deposit_flag_leaves_deposit_alone() {
        let mut dep = deposit(1_000_000);
        {
            let mut ledger = DepositLedger::new(Some(&mut dep));
            let penalty =
                open_penalty(&rental(false), None, &charge(400_000, false), &mut ledger, Utc::now()).unwrap();
            assert_eq!(penalty.status, PenaltyStatus::Pending);
            assert!(!ledger.is_touched());
        }
        assert_eq!(dep.used_amount, Decimal::ZERO);
    }

    #[test]
    fn test_create_rejects_non_positive_amount() {
        let mut ledger = DepositLedger::empty();
        let result = open_penalty(&rental(false), None, &charge(0, true), &mut ledger, Utc::now());
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_create_uses_catalog_defaults() {
        let mut ledger = DepositLedger::empty();
        let request = CreateRentalPenalty {
            penalty_id: Some(2),
            amount: None,
            description: None,
            use_deposit_first: false,
        };
        let cat = catalog("LateReturn", false);
        let penalty = open_penalty(&rental(false), Some(&cat), &request, &mut ledger, Utc::now()).unwrap();
        assert_eq!(penalty.amount, Decimal::from(50_000));
        assert_eq!(penalty.penalty_id, Some(2));
        assert_eq!(penalty.description.as_deref(), Some("catalog text"));
    }

    #[test]
    fn test_early_return_penalty_requires_customer_request() {
        let cat = catalog("EarlyReturn", true);
        for use_deposit_first in [true, false] {
            let mut dep = deposit(1_000_000);
            {
                let mut ledger = DepositLedger::new(Some(&mut dep));
                let result = open_penalty(
                    &rental(false),
                    Some(&cat),
                    &charge(50_000, use_deposit_first),
                    &mut ledger,
                    Utc::now(),
                );
                assert!(matches!(result, Err(AppError::InvalidState(_))));
            }
            assert_eq!(dep.used_amount, Decimal::ZERO);
        }

        let mut ledger = DepositLedger::empty();
        assert!(open_penalty(&rental(true), Some(&cat), &charge(50_000, false), &mut ledger, Utc::now()).is_ok());
    }

    #[test]
    fn test_cancelled_rental_cannot_be_charged() {
        let mut cancelled = rental(false);
        cancelled.status = RentalStatus::Cancelled;
        assert!(matches!(ensure_chargeable(&cancelled, None), Err(AppError::InvalidState(_))));
    }

    #[test]
    fn test_settle_with_cash() {
        let mut penalty = pending(500_000);
        let mut ledger = DepositLedger::empty();
        let request = SettlePenalty {
            use_deposit: false,
            payment_amount: Decimal::from(500_000),
            payment_method: Some(PaymentMethod::Cash),
        };

        assert!(settle_penalty(&mut penalty, &mut ledger, &request, Utc::now()).unwrap());
        assert_eq!(penalty.paid_amount, Decimal::from(500_000));
        assert_eq!(penalty.status, PenaltyStatus::Settled);
        assert!(penalty.paid_at.is_some());
        assert_eq!(penalty.payment_method, Some(PaymentMethod::Cash));
    }

    #[test]
    fn test_settle_is_idempotent_once_settled() {
        let mut penalty = pending(500_000);
        penalty.paid_amount = Decimal::from(500_000);
        penalty.status = PenaltyStatus::Settled;
        let before = penalty.clone();

        let mut dep = deposit(1_000_000);
        let mut ledger = DepositLedger::new(Some(&mut dep));
        let request = SettlePenalty {
            use_deposit: true,
            payment_amount: Decimal::from(100),
            payment_method: None,
        };

        assert!(!settle_penalty(&mut penalty, &mut ledger, &request, Utc::now()).unwrap());
        assert!(!ledger.is_touched());
        assert_eq!(penalty.paid_amount, before.paid_amount);
        assert_eq!(penalty.status, before.status);
    }

    #[test]
    fn test_settle_mixed_deposit_and_cash() {
        let mut dep = deposit(200_000);
        let mut penalty = pending(500_000);
        let now = Utc::now();
        {
            let mut ledger = DepositLedger::new(Some(&mut dep));
            let request = SettlePenalty {
                use_deposit: true,
                payment_amount: Decimal::from(300_000),
                payment_method: Some(PaymentMethod::BankTransfer),
            };
            settle_penalty(&mut penalty, &mut ledger, &request, now).unwrap();
        }

        assert_eq!(penalty.deposit_used_amount, Decimal::from(200_000));
        assert_eq!(penalty.paid_amount, Decimal::from(300_000));
        assert_eq!(penalty.status, PenaltyStatus::Settled);
        assert_eq!(dep.used_amount, Decimal::from(200_000));
    }

    #[test]
    fn test_settle_from_deposit_only() {
        let mut dep = deposit(1_000_000);
        let mut penalty = pending(300_000);
        let mut ledger = DepositLedger::new(Some(&mut dep));
        let request = SettlePenalty {
            use_deposit: true,
            payment_amount: Decimal::ZERO,
            payment_method: None,
        };
        settle_penalty(&mut penalty, &mut ledger, &request, Utc::now()).unwrap();
        assert_eq!(penalty.status, PenaltyStatus::OffsetFromDeposit);
    }

    #[test]
    fn test_partial_payment_stays_pending() {
        let mut penalty = pending(500_000);
        let mut ledger = DepositLedger::empty();
        let request = SettlePenalty {
            use_deposit: false,
            payment_amount: Decimal::from(200_000),
            payment_method: None,
        };
        settle_penalty(&mut penalty, &mut ledger, &request, Utc::now()).unwrap();
        assert_eq!(penalty.status, PenaltyStatus::Pending);
        assert_eq!(penalty.paid_at, None);
        assert_eq!(penalty.remaining(), Decimal::from(300_000));
        assert_eq!(penalty.payment_method, Some(PaymentMethod::Cash));
    }

    #[test]
    fn test_overpayment_is_rejected_before_touching_deposit() {
        let mut dep = deposit(100_000);
        let mut penalty = pending(500_000);
        {
            let mut ledger = DepositLedger::new(Some(&mut dep));
            let request = SettlePenalty {
                use_deposit: true,
                payment_amount: Decimal::from(450_000),
                payment_method: Some(PaymentMethod::Cash),
            };
            let result = settle_penalty(&mut penalty, &mut ledger, &request, Utc::now());
            assert!(matches!(result, Err(AppError::Validation(_))));
        }
        assert_eq!(dep.used_amount, Decimal::ZERO);
        assert_eq!(penalty.deposit_used_amount, Decimal::ZERO);
    }

    #[test]
    fn test_settled_iff_fully_covered() {
        let cases = [(0, 100_000), (100_000, 0), (40_000, 30_000), (60_000, 40_000)];
        for (deposit_used, paid) in cases {
            let mut penalty = pending(100_000);
            penalty.deposit_used_amount = Decimal::from(deposit_used);
            penalty.paid_amount = Decimal::from(paid);
            refresh_status(&mut penalty, Utc::now());

            let covered = penalty.covered_amount() >= penalty.amount;
            assert_eq!(penalty.status != PenaltyStatus::Pending, covered);
            assert_eq!(
                penalty.status == PenaltyStatus::Settled,
                covered && penalty.deposit_used_amount < penalty.amount
            );
        }
    }

    #[test]
    fn test_amend_down_reverses_excess() {
        let mut dep = deposit(1_000_000);
        let now = Utc::now();
        let mut penalty = {
            let mut ledger = DepositLedger::new(Some(&mut dep));
            open_penalty(&rental(false), None, &charge(400_000, true), &mut ledger, now).unwrap()
        };
        {
            let mut ledger = DepositLedger::new(Some(&mut dep));
            amend_penalty(&mut penalty, &mut ledger, Decimal::from(200_000), None, now).unwrap();
        }

        assert_eq!(dep.used_amount, Decimal::from(200_000));
        assert_eq!(penalty.deposit_used_amount, Decimal::from(200_000));
        assert_eq!(penalty.amount, Decimal::from(200_000));
        assert_eq!(penalty.status, PenaltyStatus::OffsetFromDeposit);
    }

    #[test]
    fn test_amend_up_reopens_offset_penalty() {
        let mut dep = deposit(1_000_000);
        let now = Utc::now();
        let mut penalty = {
            let mut ledger = DepositLedger::new(Some(&mut dep));
            open_penalty(&rental(false), None, &charge(400_000, true), &mut ledger, now).unwrap()
        };
        {
            let mut ledger = DepositLedger::new(Some(&mut dep));
            amend_penalty(
                &mut penalty,
                &mut ledger,
                Decimal::from(600_000),
                Some("Rear bumper too".to_string()),
                now,
            )
            .unwrap();
        }

        assert_eq!(penalty.status, PenaltyStatus::Pending);
        assert_eq!(penalty.paid_at, None);
        assert_eq!(penalty.remaining(), Decimal::from(200_000));
        assert_eq!(penalty.description.as_deref(), Some("Rear bumper too"));
        assert_eq!(dep.used_amount, Decimal::from(400_000));
    }

    #[test]
    fn test_amend_rejects_settled_and_below_paid() {
        let mut ledger = DepositLedger::empty();

        let mut settled = pending(100_000);
        settled.paid_amount = Decimal::from(100_000);
        settled.status = PenaltyStatus::Settled;
        let result = amend_penalty(&mut settled, &mut ledger, Decimal::from(50_000), None, Utc::now());
        assert!(matches!(result, Err(AppError::InvalidState(_))));

        let mut partly_paid = pending(100_000);
        partly_paid.paid_amount = Decimal::from(80_000);
        let result = amend_penalty(&mut partly_paid, &mut ledger, Decimal::from(50_000), None, Utc::now());
        assert!(matches!(result, Err(AppError::InvalidState(_))));
    }

    #[test]
    fn test_release_restores_deposit() {
        let mut dep = deposit(1_000_000);
        let now = Utc::now();
        let mut penalty = {
            let mut ledger = DepositLedger::new(Some(&mut dep));
            open_penalty(&rental(false), None, &charge(400_000, true), &mut ledger, now).unwrap()
        };
        let restored = {
            let mut ledger = DepositLedger::new(Some(&mut dep));
            release_penalty(&mut penalty, &mut ledger, now).unwrap()
        };

        assert_eq!(restored, Decimal::from(400_000));
        assert_eq!(dep.used_amount, Decimal::ZERO);
    }

    /// Offset 400 000 from the deposit, then refund the remaining 600 000
    fn offset_then_refund(dep: &mut Deposit) -> RentalPenalty {
        let now = Utc::now();
        let mut ledger = DepositLedger::new(Some(dep));
        let penalty = open_penalty(&rental(false), None, &charge(400_000, true), &mut ledger, now).unwrap();
        assert_eq!(ledger.refund(now).unwrap(), Decimal::from(600_000));
        penalty
    }

    #[test]
    fn test_release_after_refund_is_rejected() {
        let mut dep = deposit(1_000_000);
        let mut penalty = offset_then_refund(&mut dep);
        {
            let mut ledger = DepositLedger::new(Some(&mut dep));
            let result = release_penalty(&mut penalty, &mut ledger, Utc::now());
            assert!(matches!(result, Err(AppError::InvalidState(_))));
            assert!(!ledger.is_touched());
        }
        assert_eq!(dep.used_amount, Decimal::from(400_000));
        assert_eq!(penalty.deposit_used_amount, Decimal::from(400_000));
        assert_eq!(dep.refunded_amount.unwrap() + dep.used_amount, dep.amount);
    }

    #[test]
    fn test_amend_after_refund_is_rejected() {
        let mut dep = deposit(1_000_000);
        let mut penalty = offset_then_refund(&mut dep);
        {
            let mut ledger = DepositLedger::new(Some(&mut dep));
            let result = amend_penalty(&mut penalty, &mut ledger, Decimal::from(100_000), None, Utc::now());
            assert!(matches!(result, Err(AppError::InvalidState(_))));
        }
        assert_eq!(penalty.amount, Decimal::from(400_000));
        assert_eq!(penalty.status, PenaltyStatus::OffsetFromDeposit);
        assert_eq!(dep.used_amount, Decimal::from(400_000));
    }

    #[test]
    fn test_release_rejects_settled() {
        let mut penalty = pending(100_000);
        penalty.paid_amount = Decimal::from(100_000);
        penalty.status = PenaltyStatus::Settled;
        let mut ledger = DepositLedger::empty();
        assert!(matches!(
            release_penalty(&mut penalty, &mut ledger, Utc::now()),
            Err(AppError::InvalidState(_))
        ));
    }
}
