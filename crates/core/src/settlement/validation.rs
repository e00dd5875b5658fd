//! Pure balance validation for settlement application.
//!
//! Everything here operates on plain values already inside the invoice's
//! critical section; the engine supplies the live remaining balance and
//! commits the outcome atomically. The one-cent epsilon rules:
//!
//! - an amount within one cent of the remaining balance is a full payment
//!   and snaps the balance to exactly zero (no sub-cent residue, no
//!   negative balance),
//! - an amount more than one cent over the remaining balance is rejected
//!   with the maximum acceptable amount in the caller's currency.

use rust_decimal::Decimal;
use saldo_shared::types::{Currency, Money};

use crate::currency::{BALANCE_EPSILON, RateSnapshot, from_hkd, to_hkd};

use super::error::SettlementError;

/// The admitted outcome of a settlement application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyOutcome {
    /// The HKD value to freeze on the settlement record.
    pub amount_in_hkd: Decimal,
    /// True unless this settlement zeroes the balance.
    pub is_partial: bool,
    /// The invoice's remaining balance after commit.
    pub new_remaining_in_hkd: Decimal,
}

/// Validates a settlement of `amount_in_hkd` against a live remaining
/// balance.
///
/// `requested_currency` is only used to phrase the overdraw correction hint.
///
/// # Errors
///
/// - `InvalidAmount` if the converted amount is not at least one HKD cent
/// - `InvoiceAlreadySettled` if the balance is already zero (within one cent)
/// - `ExceedsRemainingBalance` if the amount overshoots by more than one cent
pub fn check_apply(
    amount_in_hkd: Decimal,
    remaining_in_hkd: Decimal,
    requested_currency: Currency,
    rates: &RateSnapshot,
) -> Result<ApplyOutcome, SettlementError> {
    if amount_in_hkd < BALANCE_EPSILON {
        return Err(SettlementError::InvalidAmount);
    }
    if remaining_in_hkd < BALANCE_EPSILON {
        return Err(SettlementError::InvoiceAlreadySettled);
    }
    if amount_in_hkd > remaining_in_hkd + BALANCE_EPSILON {
        let max_allowed = from_hkd(remaining_in_hkd, requested_currency, rates);
        return Err(SettlementError::ExceedsRemainingBalance {
            max_allowed_amount: max_allowed.amount,
            max_allowed_currency: max_allowed.currency,
            remaining_amount_in_hkd: remaining_in_hkd,
        });
    }

    let is_partial = amount_in_hkd < remaining_in_hkd - BALANCE_EPSILON;
    let new_remaining_in_hkd = if is_partial {
        remaining_in_hkd - amount_in_hkd
    } else {
        // Full payment: snap so the balance holds no sub-cent residue and
        // can never go negative.
        Decimal::ZERO
    };

    Ok(ApplyOutcome {
        amount_in_hkd,
        is_partial,
        new_remaining_in_hkd,
    })
}

/// Returns true if settling `amount` would zero out `remaining_in_hkd`
/// (within one cent).
#[must_use]
pub fn is_full_payment(amount: Money, remaining_in_hkd: Decimal, rates: &RateSnapshot) -> bool {
    (to_hkd(amount, rates) - remaining_in_hkd).abs() < BALANCE_EPSILON
}
