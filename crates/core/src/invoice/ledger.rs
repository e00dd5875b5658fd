//! The invoice ledger: system of record for invoices and their balances.
//!
//! The ledger owns every invoice's state behind a per-invoice mutex. Reads
//! clone a consistent snapshot; the only writer of
//! `remaining_amount_in_hkd` is the settlement engine, which serializes on
//! the same mutex through the crate-private handles at the bottom of this
//! file.

use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use saldo_shared::types::{Currency, InvoiceId, Money, PageRequest, PageResponse};
use serde::{Deserialize, Serialize};

use crate::currency::{BALANCE_EPSILON, RateSnapshot, round_money, to_hkd};
use crate::settlement::types::Settlement;

use super::error::InvoiceError;
use super::types::{CreateInvoiceInput, Invoice, PaymentStatus};

/// Everything committed atomically per invoice: the invoice row and its
/// settlement records live under one lock.
pub(crate) struct InvoiceState {
    pub(crate) invoice: Invoice,
    pub(crate) settlements: Vec<Settlement>,
}

/// Dashboard totals over the whole ledger, in HKD.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerSummary {
    /// Number of invoices on the ledger.
    pub invoice_count: u64,
    /// Sum of all invoice totals.
    pub total_invoiced_in_hkd: Decimal,
    /// Sum of all remaining balances.
    pub total_outstanding_in_hkd: Decimal,
    /// Sum of all settled value.
    pub total_settled_in_hkd: Decimal,
    /// Invoices with no settlements applied.
    pub unsettled_count: u64,
    /// Invoices partially settled.
    pub partial_count: u64,
    /// Invoices fully settled.
    pub complete_count: u64,
}

/// The authoritative invoice store.
#[derive(Default)]
pub struct InvoiceLedger {
    invoices: DashMap<InvoiceId, Arc<Mutex<InvoiceState>>>,
    by_number: DashMap<String, InvoiceId>,
}

impl InvoiceLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new invoice, freezing its HKD total from `rates`.
    ///
    /// # Errors
    ///
    /// - `InvalidAmount` if the amount is not positive (or rounds below one
    ///   HKD cent, which would create an invoice born settled)
    /// - `UnsupportedCurrency` for a currency code outside HKD/MOP/CNY
    /// - `DuplicateInvoiceNumber` if the number is already taken
    pub fn create(
        &self,
        input: CreateInvoiceInput,
        rates: &RateSnapshot,
    ) -> Result<Invoice, InvoiceError> {
        if input.amount <= Decimal::ZERO {
            return Err(InvoiceError::InvalidAmount);
        }
        let currency = Currency::from_str(&input.currency)
            .map_err(|_| InvoiceError::UnsupportedCurrency(input.currency.clone()))?;

        let amount = round_money(input.amount);
        let amount_in_hkd = to_hkd(Money::new(amount, currency), rates);
        if amount_in_hkd < BALANCE_EPSILON {
            return Err(InvoiceError::InvalidAmount);
        }

        let id = InvoiceId::new();
        match self.by_number.entry(input.invoice_number.clone()) {
            Entry::Occupied(_) => {
                return Err(InvoiceError::DuplicateInvoiceNumber(input.invoice_number));
            }
            Entry::Vacant(slot) => {
                slot.insert(id);
            }
        }

        let invoice = Invoice {
            id,
            invoice_number: input.invoice_number,
            customer_id: input.customer_id,
            currency,
            amount,
            amount_in_hkd,
            remaining_amount_in_hkd: amount_in_hkd,
            total_units: input.total_units,
            rate_version: rates.version,
            created_at: Utc::now(),
        };
        self.invoices.insert(
            id,
            Arc::new(Mutex::new(InvoiceState {
                invoice: invoice.clone(),
                settlements: Vec::new(),
            })),
        );

        tracing::info!(
            "Created invoice {} for {} {} ({} HKD at rates v{})",
            invoice.invoice_number,
            invoice.amount,
            invoice.currency,
            invoice.amount_in_hkd,
            invoice.rate_version
        );
        Ok(invoice)
    }

    /// Returns a snapshot of the invoice.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no invoice has this ID.
    pub fn get(&self, id: InvoiceId) -> Result<Invoice, InvoiceError> {
        let state = self.state(id).ok_or(InvoiceError::NotFound(id))?;
        let invoice = state.lock().invoice.clone();
        Ok(invoice)
    }

    /// Returns a snapshot of the invoice with this number.
    ///
    /// # Errors
    ///
    /// Returns `NumberNotFound` if no invoice has this number.
    pub fn get_by_number(&self, invoice_number: &str) -> Result<Invoice, InvoiceError> {
        let id = self
            .id_for_number(invoice_number)
            .ok_or_else(|| InvoiceError::NumberNotFound(invoice_number.to_string()))?;
        self.get(id)
            .map_err(|_| InvoiceError::NumberNotFound(invoice_number.to_string()))
    }

    /// Lists invoices ordered by invoice number, optionally filtered by a
    /// case-insensitive substring of the number.
    #[must_use]
    pub fn list(&self, search: Option<&str>, page: &PageRequest) -> PageResponse<Invoice> {
        let states: Vec<Arc<Mutex<InvoiceState>>> = self
            .invoices
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        let needle = search.map(str::to_lowercase);
        let mut matching: Vec<Invoice> = states
            .iter()
            .map(|state| state.lock().invoice.clone())
            .filter(|invoice| match &needle {
                Some(n) => invoice.invoice_number.to_lowercase().contains(n),
                None => true,
            })
            .collect();
        matching.sort_by(|a, b| a.invoice_number.cmp(&b.invoice_number));

        let total = matching.len() as u64;
        let data: Vec<Invoice> = matching
            .into_iter()
            .skip(page.offset())
            .take(page.limit())
            .collect();
        PageResponse::new(data, page.page, page.per_page, total)
    }

    /// Aggregates dashboard totals over the whole ledger.
    ///
    /// The totals are a stale-read view: consistent per invoice, not across
    /// invoices. Display only, never a basis for a write decision.
    #[must_use]
    pub fn summary(&self) -> LedgerSummary {
        let states: Vec<Arc<Mutex<InvoiceState>>> = self
            .invoices
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        let mut summary = LedgerSummary {
            invoice_count: 0,
            total_invoiced_in_hkd: Decimal::ZERO,
            total_outstanding_in_hkd: Decimal::ZERO,
            total_settled_in_hkd: Decimal::ZERO,
            unsettled_count: 0,
            partial_count: 0,
            complete_count: 0,
        };
        for state in &states {
            let invoice = state.lock().invoice.clone();
            summary.invoice_count += 1;
            summary.total_invoiced_in_hkd += invoice.amount_in_hkd;
            summary.total_outstanding_in_hkd += invoice.remaining_amount_in_hkd;
            summary.total_settled_in_hkd += invoice.settled_in_hkd();
            match invoice.payment_status() {
                PaymentStatus::Unsettled => summary.unsettled_count += 1,
                PaymentStatus::Partial => summary.partial_count += 1,
                PaymentStatus::Complete => summary.complete_count += 1,
            }
        }
        summary
    }

    /// Crate-private handle to an invoice's lockable state.
    ///
    /// The Arc is cloned out so the map shard is released before anyone
    /// waits on the mutex.
    pub(crate) fn state(&self, id: InvoiceId) -> Option<Arc<Mutex<InvoiceState>>> {
        self.invoices.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    /// Crate-private number lookup.
    pub(crate) fn id_for_number(&self, invoice_number: &str) -> Option<InvoiceId> {
        self.by_number.get(invoice_number).map(|entry| *entry.value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::currency::RateTable;
    use rust_decimal_macros::dec;
    use saldo_shared::types::CustomerId;

    fn rates() -> Arc<RateSnapshot> {
        RateTable::new(dec!(1.03), dec!(0.93)).unwrap().get()
    }

    fn input(number: &str, amount: Decimal, currency: &str) -> CreateInvoiceInput {
        CreateInvoiceInput {
            invoice_number: number.to_string(),
            customer_id: CustomerId::new(),
            amount,
            currency: currency.to_string(),
            total_units: 10,
        }
    }

    #[test]
    fn test_create_freezes_hkd_amount() {
        let ledger = InvoiceLedger::new();
        let invoice = ledger
            .create(input("INV-001", dec!(500), "MOP"), &rates())
            .unwrap();
        assert_eq!(invoice.amount_in_hkd, dec!(485.44));
        assert_eq!(invoice.remaining_amount_in_hkd, dec!(485.44));
        assert_eq!(invoice.rate_version, 1);
        assert_eq!(invoice.payment_status(), PaymentStatus::Unsettled);
    }

    #[test]
    fn test_create_hkd_invoice_is_identity() {
        let ledger = InvoiceLedger::new();
        let invoice = ledger
            .create(input("INV-001", dec!(1000), "HKD"), &rates())
            .unwrap();
        assert_eq!(invoice.amount_in_hkd, dec!(1000));
    }

    #[test]
    fn test_duplicate_invoice_number_rejected() {
        let ledger = InvoiceLedger::new();
        ledger
            .create(input("INV-001", dec!(100), "HKD"), &rates())
            .unwrap();
        let result = ledger.create(input("INV-001", dec!(200), "HKD"), &rates());
        assert!(matches!(
            result,
            Err(InvoiceError::DuplicateInvoiceNumber(n)) if n == "INV-001"
        ));
    }

    #[test]
    fn test_non_positive_amount_rejected() {
        let ledger = InvoiceLedger::new();
        assert!(matches!(
            ledger.create(input("INV-001", dec!(0), "HKD"), &rates()),
            Err(InvoiceError::InvalidAmount)
        ));
        assert!(matches!(
            ledger.create(input("INV-002", dec!(-5), "HKD"), &rates()),
            Err(InvoiceError::InvalidAmount)
        ));
    }

    #[test]
    fn test_sub_cent_amount_rejected() {
        let ledger = InvoiceLedger::new();
        assert!(matches!(
            ledger.create(input("INV-001", dec!(0.001), "HKD"), &rates()),
            Err(InvoiceError::InvalidAmount)
        ));
    }

    #[test]
    fn test_unsupported_currency_rejected() {
        let ledger = InvoiceLedger::new();
        assert!(matches!(
            ledger.create(input("INV-001", dec!(100), "USD"), &rates()),
            Err(InvoiceError::UnsupportedCurrency(c)) if c == "USD"
        ));
    }

    #[test]
    fn test_get_and_get_by_number() {
        let ledger = InvoiceLedger::new();
        let created = ledger
            .create(input("INV-001", dec!(100), "HKD"), &rates())
            .unwrap();
        assert_eq!(ledger.get(created.id).unwrap().id, created.id);
        assert_eq!(ledger.get_by_number("INV-001").unwrap().id, created.id);
        assert!(matches!(
            ledger.get(InvoiceId::new()),
            Err(InvoiceError::NotFound(_))
        ));
        assert!(matches!(
            ledger.get_by_number("INV-999"),
            Err(InvoiceError::NumberNotFound(_))
        ));
    }

    #[test]
    fn test_list_orders_and_paginates() {
        let ledger = InvoiceLedger::new();
        for n in ["INV-003", "INV-001", "INV-002"] {
            ledger.create(input(n, dec!(100), "HKD"), &rates()).unwrap();
        }
        let page = ledger.list(None, &PageRequest { page: 1, per_page: 2 });
        assert_eq!(page.meta.total, 3);
        assert_eq!(page.meta.total_pages, 2);
        let numbers: Vec<&str> = page.data.iter().map(|i| i.invoice_number.as_str()).collect();
        assert_eq!(numbers, vec!["INV-001", "INV-002"]);
    }

    #[test]
    fn test_list_search_filters() {
        let ledger = InvoiceLedger::new();
        for n in ["INV-001", "INV-002", "QUO-001"] {
            ledger.create(input(n, dec!(100), "HKD"), &rates()).unwrap();
        }
        let page = ledger.list(Some("inv"), &PageRequest::default());
        assert_eq!(page.meta.total, 2);
    }

    #[test]
    fn test_summary_counts_fresh_invoices() {
        let ledger = InvoiceLedger::new();
        ledger
            .create(input("INV-001", dec!(100), "HKD"), &rates())
            .unwrap();
        ledger
            .create(input("INV-002", dec!(200), "HKD"), &rates())
            .unwrap();
        let summary = ledger.summary();
        assert_eq!(summary.invoice_count, 2);
        assert_eq!(summary.total_invoiced_in_hkd, dec!(300));
        assert_eq!(summary.total_outstanding_in_hkd, dec!(300));
        assert_eq!(summary.total_settled_in_hkd, dec!(0));
        assert_eq!(summary.unsettled_count, 2);
    }
}
