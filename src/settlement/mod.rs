//! Penalty and deposit settlement bookkeeping.
//!
//! Pure logic only: no I/O happens here, the penalties service wraps each
//! call in a database transaction.

pub mod ledger;
pub mod rules;

pub use ledger::DepositLedger;
pub use rules::{amend_penalty, ensure_chargeable, open_penalty, refresh_status, release_penalty, settle_penalty};
