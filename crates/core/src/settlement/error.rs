//! Settlement error types.
//!
//! Every validation failure is returned as a typed result; nothing is
//! swallowed. `ExceedsRemainingBalance` carries the correction hint as
//! structured fields (not just a message) so callers can offer the maximum
//! acceptable amount in the currency they asked in.

use rust_decimal::Decimal;
use saldo_shared::types::{Currency, SettlementId};
use thiserror::Error;

/// Errors that can occur during settlement operations.
#[derive(Debug, Error)]
pub enum SettlementError {
    // ========== Validation Errors ==========
    /// Settlement amount must be positive (and at least one HKD cent).
    #[error("Settlement amount must be positive")]
    InvalidAmount,

    /// Currency code outside the supported set.
    #[error("Unsupported currency: {0}")]
    UnsupportedCurrency(String),

    /// The invoice has no remaining balance.
    #[error("Invoice is already fully settled")]
    InvoiceAlreadySettled,

    /// The settlement would overdraw the invoice.
    #[error(
        "Settlement exceeds remaining balance: at most {max_allowed_amount} {max_allowed_currency} ({remaining_amount_in_hkd} HKD) can be settled"
    )]
    ExceedsRemainingBalance {
        /// Maximum acceptable amount, in the caller's requested currency.
        max_allowed_amount: Decimal,
        /// The currency `max_allowed_amount` is expressed in.
        max_allowed_currency: Currency,
        /// The invoice's remaining balance in HKD.
        remaining_amount_in_hkd: Decimal,
    },

    /// Replacement metadata does not match the settlement's kind.
    #[error("Settlement kind cannot change: expected {expected}, got {got}")]
    KindMismatch {
        /// The settlement's kind.
        expected: &'static str,
        /// The kind of the replacement metadata.
        got: &'static str,
    },

    // ========== Identity Errors ==========
    /// Settlement not found.
    #[error("Settlement not found: {0}")]
    NotFound(SettlementId),

    /// Target invoice not found.
    #[error("Invoice not found: {0}")]
    InvoiceNotFound(String),

    // ========== Concurrency Errors ==========
    /// The invoice's lock could not be acquired in time; retry.
    #[error("Invoice is busy, please retry")]
    LockTimeout,
}

impl SettlementError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidAmount => "INVALID_AMOUNT",
            Self::UnsupportedCurrency(_) => "UNSUPPORTED_CURRENCY",
            Self::InvoiceAlreadySettled => "INVOICE_ALREADY_SETTLED",
            Self::ExceedsRemainingBalance { .. } => "EXCEEDS_REMAINING_BALANCE",
            Self::KindMismatch { .. } => "SETTLEMENT_KIND_MISMATCH",
            Self::NotFound(_) => "SETTLEMENT_NOT_FOUND",
            Self::InvoiceNotFound(_) => "INVOICE_NOT_FOUND",
            Self::LockTimeout => "LOCK_TIMEOUT",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - validation errors
            Self::InvalidAmount
            | Self::UnsupportedCurrency(_)
            | Self::InvoiceAlreadySettled
            | Self::ExceedsRemainingBalance { .. }
            | Self::KindMismatch { .. } => 400,

            // 404 Not Found
            Self::NotFound(_) | Self::InvoiceNotFound(_) => 404,

            // 409 Conflict - concurrency errors
            Self::LockTimeout => 409,
        }
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::LockTimeout)
    }
}
