//! The settlement engine: atomic application of settlements to invoices.
//!
//! Every mutating operation runs as one critical section keyed on the
//! target invoice: load the current rate snapshot, convert, re-read the live
//! remaining balance, validate, and commit the settlement record together
//! with the recomputed balance. Validation against a balance fetched in an
//! earlier call is exactly the race this engine exists to close, so nothing
//! outside the critical section ever feeds a write decision.
//!
//! Contention is strictly per invoice; there is no cross-invoice locking.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use rust_decimal::Decimal;
use saldo_shared::config::EngineConfig;
use saldo_shared::types::{Currency, InvoiceId, Money, SettlementId};

use crate::currency::{RateTable, from_hkd, round_money, to_hkd};
use crate::invoice::ledger::{InvoiceLedger, InvoiceState};

use super::error::SettlementError;
use super::types::{
    ApplySettlementInput, InvoiceRef, Settlement, UpdateSettlementInput,
};
use super::validation;

/// The transactional settlement core.
///
/// Cheap to share behind an `Arc`; all methods take `&self`.
pub struct SettlementEngine {
    rates: Arc<RateTable>,
    ledger: Arc<InvoiceLedger>,
    /// Locates the parent invoice of a settlement without scanning.
    settlement_index: DashMap<SettlementId, InvoiceId>,
    lock_timeout: Duration,
}

impl SettlementEngine {
    /// Creates an engine over the shared rate table and invoice ledger.
    #[must_use]
    pub fn new(rates: Arc<RateTable>, ledger: Arc<InvoiceLedger>, config: &EngineConfig) -> Self {
        Self {
            rates,
            ledger,
            settlement_index: DashMap::new(),
            lock_timeout: Duration::from_millis(config.lock_timeout_ms),
        }
    }

    /// Applies a new settlement against an invoice.
    ///
    /// # Errors
    ///
    /// - `UnsupportedCurrency`, `InvoiceNotFound` before the critical section
    /// - `InvalidAmount`, `InvoiceAlreadySettled`, `ExceedsRemainingBalance`
    ///   from validation against the live balance
    /// - `LockTimeout` if the invoice stays contended past the configured
    ///   bound (retryable; no state was touched)
    pub fn apply(&self, input: ApplySettlementInput) -> Result<Settlement, SettlementError> {
        let currency = parse_currency(&input.currency)?;
        let invoice_id = self.resolve_invoice(&input.invoice)?;
        let rates = self.rates.get();
        let amount = round_money(input.amount);
        let amount_in_hkd = to_hkd(Money::new(amount, currency), &rates);

        self.with_invoice(invoice_id, |state| {
            let outcome = validation::check_apply(
                amount_in_hkd,
                state.invoice.remaining_amount_in_hkd,
                currency,
                &rates,
            )?;

            let now = Utc::now();
            let settlement = Settlement {
                id: SettlementId::new(),
                invoice_id,
                currency,
                amount,
                amount_in_hkd: outcome.amount_in_hkd,
                is_partial: outcome.is_partial,
                rate_version: rates.version,
                kind: input.details.clone(),
                created_at: now,
                updated_at: now,
            };

            state.invoice.remaining_amount_in_hkd = outcome.new_remaining_in_hkd;
            state.settlements.push(settlement.clone());
            self.settlement_index.insert(settlement.id, invoice_id);

            tracing::info!(
                "Applied {} settlement {} to invoice {}: {} HKD, remaining {} HKD",
                settlement.kind.tag(),
                settlement.id,
                state.invoice.invoice_number,
                settlement.amount_in_hkd,
                state.invoice.remaining_amount_in_hkd
            );
            Ok(settlement)
        })
    }

    /// Updates an existing settlement.
    ///
    /// An amount change is validated as remove-then-reapply inside one
    /// critical section: the ceiling is the live remaining balance plus the
    /// old settlement's contribution, so the balance is never transiently
    /// wrong. A currency change without an amount re-expresses the frozen
    /// HKD value in the new currency; the frozen value itself stays put.
    ///
    /// # Errors
    ///
    /// Same kinds as [`Self::apply`], plus `NotFound` if the settlement does
    /// not exist and `KindMismatch` if replacement metadata changes the kind.
    pub fn update(
        &self,
        id: SettlementId,
        input: UpdateSettlementInput,
    ) -> Result<Settlement, SettlementError> {
        let invoice_id = self.invoice_of(id)?;
        let new_currency = input
            .currency
            .as_deref()
            .map(parse_currency)
            .transpose()?;
        let rates = self.rates.get();

        self.with_invoice(invoice_id, |state| {
            let position = state
                .settlements
                .iter()
                .position(|s| s.id == id)
                .ok_or(SettlementError::NotFound(id))?;
            let old = state.settlements[position].clone();

            if let Some(details) = &input.details {
                if !details.same_kind(&old.kind) {
                    return Err(SettlementError::KindMismatch {
                        expected: old.kind.tag(),
                        got: details.tag(),
                    });
                }
            }

            let currency = new_currency.unwrap_or(old.currency);
            let mut updated = old.clone();

            match input.amount {
                Some(new_amount) => {
                    // Remove the old effect, then validate the replacement
                    // against the restored ceiling.
                    let ceiling =
                        state.invoice.remaining_amount_in_hkd + old.amount_in_hkd;
                    let amount = round_money(new_amount);
                    let amount_in_hkd = to_hkd(Money::new(amount, currency), &rates);
                    let outcome =
                        validation::check_apply(amount_in_hkd, ceiling, currency, &rates)?;

                    updated.amount = amount;
                    updated.amount_in_hkd = outcome.amount_in_hkd;
                    updated.is_partial = outcome.is_partial;
                    updated.rate_version = rates.version;
                    state.invoice.remaining_amount_in_hkd = outcome
                        .new_remaining_in_hkd
                        .min(state.invoice.amount_in_hkd);
                }
                None if currency != old.currency => {
                    // Currency switch only: re-express the frozen HKD value
                    // instead of recomputing from an already-rounded figure.
                    // The freeze keeps its original snapshot pin.
                    updated.amount = from_hkd(old.amount_in_hkd, currency, &rates).amount;
                }
                None => {}
            }

            updated.currency = currency;
            if let Some(details) = input.details {
                updated.kind = details;
            }
            updated.updated_at = Utc::now();

            state.settlements[position] = updated.clone();
            tracing::info!(
                "Updated settlement {} on invoice {}: {} HKD, remaining {} HKD",
                updated.id,
                state.invoice.invoice_number,
                updated.amount_in_hkd,
                state.invoice.remaining_amount_in_hkd
            );
            Ok(updated)
        })
    }

    /// Removes a settlement, restoring its HKD value to the invoice.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the settlement does not exist (including a
    /// repeated removal, which therefore cannot double-credit the invoice),
    /// or `LockTimeout` under contention.
    pub fn remove(&self, id: SettlementId) -> Result<(), SettlementError> {
        let invoice_id = self.invoice_of(id)?;

        self.with_invoice(invoice_id, |state| {
            let position = state
                .settlements
                .iter()
                .position(|s| s.id == id)
                .ok_or(SettlementError::NotFound(id))?;
            let removed = state.settlements.remove(position);
            self.settlement_index.remove(&id);

            // Cap at the invoice total: a full payment that overshot by up
            // to one cent must not restore beyond it.
            state.invoice.remaining_amount_in_hkd = (state.invoice.remaining_amount_in_hkd
                + removed.amount_in_hkd)
                .min(state.invoice.amount_in_hkd);

            tracing::info!(
                "Removed settlement {} from invoice {}: restored {} HKD, remaining {} HKD",
                removed.id,
                state.invoice.invoice_number,
                removed.amount_in_hkd,
                state.invoice.remaining_amount_in_hkd
            );
            Ok(())
        })
    }

    /// Returns a snapshot of a settlement.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the settlement does not exist.
    pub fn get(&self, id: SettlementId) -> Result<Settlement, SettlementError> {
        let invoice_id = self.invoice_of(id)?;
        self.with_invoice(invoice_id, |state| {
            state
                .settlements
                .iter()
                .find(|s| s.id == id)
                .cloned()
                .ok_or(SettlementError::NotFound(id))
        })
    }

    /// Returns all settlements applied to an invoice, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `InvoiceNotFound` if the invoice does not exist.
    pub fn settlements_for_invoice(
        &self,
        invoice_id: InvoiceId,
    ) -> Result<Vec<Settlement>, SettlementError> {
        self.with_invoice(invoice_id, |state| Ok(state.settlements.clone()))
    }

    /// Returns true if settling `amount` in `currency` would zero out
    /// `remaining_in_hkd` under the current rate snapshot.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedCurrency` for an unknown currency code.
    pub fn is_full_payment(
        &self,
        amount: Decimal,
        currency: &str,
        remaining_in_hkd: Decimal,
    ) -> Result<bool, SettlementError> {
        let currency = parse_currency(currency)?;
        let rates = self.rates.get();
        Ok(validation::is_full_payment(
            Money::new(amount, currency),
            remaining_in_hkd,
            &rates,
        ))
    }

    fn resolve_invoice(&self, invoice: &InvoiceRef) -> Result<InvoiceId, SettlementError> {
        match invoice {
            InvoiceRef::Id(id) => Ok(*id),
            InvoiceRef::Number(number) => self
                .ledger
                .id_for_number(number)
                .ok_or_else(|| SettlementError::InvoiceNotFound(number.clone())),
        }
    }

    fn invoice_of(&self, id: SettlementId) -> Result<InvoiceId, SettlementError> {
        self.settlement_index
            .get(&id)
            .map(|entry| *entry.value())
            .ok_or(SettlementError::NotFound(id))
    }

    /// Runs `f` inside the invoice's critical section.
    ///
    /// Lock acquisition is bounded; on timeout nothing has been touched and
    /// the caller gets a retryable error.
    fn with_invoice<T>(
        &self,
        invoice_id: InvoiceId,
        f: impl FnOnce(&mut InvoiceState) -> Result<T, SettlementError>,
    ) -> Result<T, SettlementError> {
        let state = self
            .ledger
            .state(invoice_id)
            .ok_or_else(|| SettlementError::InvoiceNotFound(invoice_id.to_string()))?;
        let Some(mut guard) = state.try_lock_for(self.lock_timeout) else {
            tracing::warn!("Lock timeout on invoice {invoice_id}");
            return Err(SettlementError::LockTimeout);
        };
        f(&mut guard)
    }
}

fn parse_currency(code: &str) -> Result<Currency, SettlementError> {
    Currency::from_str(code).map_err(|_| SettlementError::UnsupportedCurrency(code.to_string()))
}
