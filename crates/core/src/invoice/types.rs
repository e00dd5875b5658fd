//! Invoice domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use saldo_shared::types::{Currency, CustomerId, InvoiceId};
use serde::{Deserialize, Serialize};

use crate::currency::BALANCE_EPSILON;

/// Payment status derived from the remaining balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// No settlement has been applied yet.
    Unsettled,
    /// Partially settled; some balance remains.
    Partial,
    /// Fully settled (remaining balance zero within one HKD cent).
    Complete,
}

/// An invoice and its settlement balance, all balances in the HKD base.
///
/// `amount_in_hkd` is frozen at creation from the rate snapshot then in
/// effect; `remaining_amount_in_hkd` starts equal to it and only the
/// settlement engine may move it. Invariant:
/// `0 <= remaining_amount_in_hkd <= amount_in_hkd`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    /// The invoice ID.
    pub id: InvoiceId,
    /// Unique, immutable invoice number.
    pub invoice_number: String,
    /// The customer this invoice bills.
    pub customer_id: CustomerId,
    /// The currency the invoice was issued in.
    pub currency: Currency,
    /// The invoice total, in `currency`.
    pub amount: Decimal,
    /// The invoice total in HKD, frozen at creation.
    pub amount_in_hkd: Decimal,
    /// The unsettled portion of `amount_in_hkd`.
    pub remaining_amount_in_hkd: Decimal,
    /// Total units of goods on the invoice.
    pub total_units: u32,
    /// The rate snapshot version `amount_in_hkd` was frozen under.
    pub rate_version: u64,
    /// When the invoice was created.
    pub created_at: DateTime<Utc>,
}

impl Invoice {
    /// The HKD value settled so far.
    #[must_use]
    pub fn settled_in_hkd(&self) -> Decimal {
        self.amount_in_hkd - self.remaining_amount_in_hkd
    }

    /// Returns true if the remaining balance is zero within one cent.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.remaining_amount_in_hkd < BALANCE_EPSILON
    }

    /// Derives the payment status from the remaining balance.
    #[must_use]
    pub fn payment_status(&self) -> PaymentStatus {
        if self.is_settled() {
            PaymentStatus::Complete
        } else if self.settled_in_hkd() >= BALANCE_EPSILON {
            PaymentStatus::Partial
        } else {
            PaymentStatus::Unsettled
        }
    }
}

/// Input for creating a new invoice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateInvoiceInput {
    /// Unique invoice number.
    pub invoice_number: String,
    /// The customer being billed.
    pub customer_id: CustomerId,
    /// Invoice total, in `currency`.
    pub amount: Decimal,
    /// Currency code (HKD, MOP or CNY).
    pub currency: String,
    /// Total units of goods on the invoice.
    pub total_units: u32,
}
