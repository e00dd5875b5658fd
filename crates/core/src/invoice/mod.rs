//! The authoritative invoice ledger.
//!
//! This module implements the system of record for invoices:
//! - Invoice domain types and derived payment status
//! - The ledger itself (creation, lookups, listing, dashboard summary)
//! - Error types for invoice operations
//!
//! `remaining_amount_in_hkd` is owned here but mutated only through the
//! settlement engine's transactional path.

pub mod error;
pub mod ledger;
pub mod types;

pub use error::InvoiceError;
pub use ledger::{InvoiceLedger, LedgerSummary};
pub use types::{CreateInvoiceInput, Invoice, PaymentStatus};
