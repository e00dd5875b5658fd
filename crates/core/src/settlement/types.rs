//! Settlement record types.
//!
//! A settlement is either a cash receipt (money physically picked up) or a
//! delivery order (goods/value delivered). Both share the balance-bearing
//! fields; the kind-specific metadata rides in a tagged sum type rather than
//! any inheritance scheme.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use saldo_shared::types::{Currency, InvoiceId, SettlementId};
use serde::{Deserialize, Serialize};

/// A settlement event applied against an invoice.
///
/// `amount_in_hkd` is frozen from the rate snapshot in effect at apply time
/// and only changes through an explicit update (remove-then-reapply under
/// one lock). Identity and equality are by `id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settlement {
    /// The settlement ID.
    pub id: SettlementId,
    /// The invoice this settlement pays down.
    pub invoice_id: InvoiceId,
    /// The currency the settlement was entered in.
    pub currency: Currency,
    /// The settled amount, in `currency`.
    pub amount: Decimal,
    /// The settled amount in HKD, frozen at apply time.
    pub amount_in_hkd: Decimal,
    /// True unless this settlement zeroed the invoice's balance.
    pub is_partial: bool,
    /// The rate snapshot version `amount_in_hkd` was frozen under.
    pub rate_version: u64,
    /// Kind-specific metadata.
    #[serde(flatten)]
    pub kind: SettlementKind,
    /// When the settlement was created.
    pub created_at: DateTime<Utc>,
    /// When the settlement was last updated.
    pub updated_at: DateTime<Utc>,
}

impl PartialEq for Settlement {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Settlement {}

/// Cash receipt or delivery order, tagged for the wire as `cash`/`delivery`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum SettlementKind {
    /// Money physically picked up from the customer.
    #[serde(rename = "cash")]
    CashReceipt(CashReceiptDetails),
    /// Goods or value delivered against the invoice.
    #[serde(rename = "delivery")]
    DeliveryOrder(DeliveryOrderDetails),
}

impl SettlementKind {
    /// The wire tag for this kind.
    #[must_use]
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::CashReceipt(_) => "cash",
            Self::DeliveryOrder(_) => "delivery",
        }
    }

    /// Returns true if `other` is the same kind of settlement.
    #[must_use]
    pub fn same_kind(&self, other: &Self) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

/// Metadata for a cash receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashReceiptDetails {
    /// Receipt number handed to the customer.
    pub receipt_number: String,
    /// Who picked the cash up.
    pub picked_by: String,
    /// Pickup date.
    pub pickup_date: NaiveDate,
    /// Pickup time.
    pub pickup_time: NaiveTime,
}

/// Metadata for a delivery order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryOrderDetails {
    /// Delivery order number.
    pub order_number: String,
    /// Units delivered.
    pub delivered_units: u32,
    /// Who made the delivery.
    pub delivered_by: String,
}

/// How callers name the invoice a settlement targets.
///
/// The cash flow submits invoice numbers, the order flow submits IDs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InvoiceRef {
    /// By invoice ID.
    Id(InvoiceId),
    /// By unique invoice number.
    Number(String),
}

/// Input for applying a new settlement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplySettlementInput {
    /// The invoice to settle against.
    pub invoice: InvoiceRef,
    /// The settled amount, in `currency`.
    pub amount: Decimal,
    /// Currency code (HKD, MOP or CNY).
    pub currency: String,
    /// Kind-specific metadata.
    #[serde(flatten)]
    pub details: SettlementKind,
}

/// Input for updating an existing settlement.
///
/// Absent fields keep their current value. A currency change without an
/// amount re-expresses the frozen HKD value in the new currency instead of
/// recomputing from a stale, already-rounded figure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateSettlementInput {
    /// New amount, in the settlement's (possibly new) currency.
    pub amount: Option<Decimal>,
    /// New currency code.
    pub currency: Option<String>,
    /// Replacement metadata; must match the settlement's kind.
    pub details: Option<SettlementKind>,
}
