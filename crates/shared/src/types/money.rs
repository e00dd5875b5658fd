//! Money type with decimal precision and currency.
//!
//! CRITICAL: Never use floating-point for money calculations.
//! This type wraps `rust_decimal::Decimal` for arbitrary precision.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Represents a monetary amount with currency.
///
/// Uses `Decimal` internally to avoid floating-point precision errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// The amount, in major units of `currency`.
    pub amount: Decimal,
    /// ISO 4217 currency code (e.g., "HKD", "MOP").
    pub currency: Currency,
}

/// ISO 4217 currency codes supported by the system.
///
/// HKD is the base currency: every invoice and settlement value is
/// ultimately compared in HKD.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    /// Hong Kong Dollar (base currency).
    Hkd,
    /// Macanese Pataca.
    Mop,
    /// Chinese Yuan.
    Cny,
}

impl Currency {
    /// The base currency all balances are compared in.
    pub const BASE: Self = Self::Hkd;

    /// All supported currencies.
    pub const ALL: [Self; 3] = [Self::Hkd, Self::Mop, Self::Cny];

    /// Returns true if this is the base currency (HKD).
    #[must_use]
    pub fn is_base(self) -> bool {
        self == Self::BASE
    }
}

impl Money {
    /// Creates a new Money instance.
    #[must_use]
    pub const fn new(amount: Decimal, currency: Currency) -> Self {
        Self { amount, currency }
    }

    /// Creates an amount in the base currency (HKD).
    #[must_use]
    pub const fn hkd(amount: Decimal) -> Self {
        Self {
            amount,
            currency: Currency::Hkd,
        }
    }

    /// Creates a zero amount in the specified currency.
    #[must_use]
    pub fn zero(currency: Currency) -> Self {
        Self {
            amount: Decimal::ZERO,
            currency,
        }
    }

    /// Returns true if the amount is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    /// Returns true if the amount is negative.
    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.amount.is_sign_negative()
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hkd => write!(f, "HKD"),
            Self::Mop => write!(f, "MOP"),
            Self::Cny => write!(f, "CNY"),
        }
    }
}

impl std::str::FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "HKD" => Ok(Self::Hkd),
            "MOP" => Ok(Self::Mop),
            "CNY" => Ok(Self::Cny),
            _ => Err(format!("Unknown currency: {s}")),
        }
    }
}
