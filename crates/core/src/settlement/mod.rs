//! The settlement engine and settlement records.
//!
//! This module implements the transactional core:
//! - Settlement record types (cash receipts and delivery orders)
//! - Pure balance validation (overdraw checks, full-payment detection)
//! - The engine that atomically applies, updates and removes settlements
//!   against an invoice's remaining balance
//! - Error types for settlement operations

pub mod engine;
pub mod error;
pub mod types;
pub mod validation;

#[cfg(test)]
mod validation_props;

pub use engine::SettlementEngine;
pub use error::SettlementError;
pub use types::{
    ApplySettlementInput, CashReceiptDetails, DeliveryOrderDetails, InvoiceRef, Settlement,
    SettlementKind, UpdateSettlementInput,
};
pub use validation::is_full_payment;
