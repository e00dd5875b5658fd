//! Invoice error types.

use saldo_shared::types::InvoiceId;
use thiserror::Error;

/// Errors that can occur during invoice operations.
#[derive(Debug, Error)]
pub enum InvoiceError {
    // ========== Validation Errors ==========
    /// Invoice amount must be positive.
    #[error("Invoice amount must be positive")]
    InvalidAmount,

    /// Currency code outside the supported set.
    #[error("Unsupported currency: {0}")]
    UnsupportedCurrency(String),

    // ========== Identity Errors ==========
    /// Invoice number is already taken.
    #[error("Invoice number already exists: {0}")]
    DuplicateInvoiceNumber(String),

    /// Invoice not found by ID.
    #[error("Invoice not found: {0}")]
    NotFound(InvoiceId),

    /// Invoice not found by number.
    #[error("Invoice not found: {0}")]
    NumberNotFound(String),
}

impl InvoiceError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidAmount => "INVALID_AMOUNT",
            Self::UnsupportedCurrency(_) => "UNSUPPORTED_CURRENCY",
            Self::DuplicateInvoiceNumber(_) => "DUPLICATE_INVOICE_NUMBER",
            Self::NotFound(_) | Self::NumberNotFound(_) => "INVOICE_NOT_FOUND",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - validation errors
            Self::InvalidAmount | Self::UnsupportedCurrency(_) => 400,

            // 404 Not Found
            Self::NotFound(_) | Self::NumberNotFound(_) => 404,

            // 409 Conflict
            Self::DuplicateInvoiceNumber(_) => 409,
        }
    }
}
