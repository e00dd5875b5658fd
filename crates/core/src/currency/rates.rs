//! Exchange rate snapshots and the mutable rate table.
//!
//! Rates are expressed from the HKD side: `hkd_to_mop` is how many MOP one
//! HKD buys. A snapshot is immutable once installed; administrative updates
//! replace it wholesale and bump a monotonically increasing version so every
//! settlement can pin the snapshot it was converted under.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use saldo_shared::config::RatesConfig;
use saldo_shared::types::Currency;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by rate table updates.
#[derive(Debug, Error)]
pub enum RateError {
    /// Exchange rates must be strictly positive.
    #[error("Exchange rate must be positive, got {0}")]
    InvalidRate(Decimal),
}

impl RateError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidRate(_) => "INVALID_RATE",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::InvalidRate(_) => 400,
        }
    }
}

/// An immutable view of the exchange rates at a point in time.
///
/// Both rates are strictly positive; construction enforces it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateSnapshot {
    /// How many MOP one HKD buys.
    pub hkd_to_mop: Decimal,
    /// How many CNY one HKD buys.
    pub hkd_to_cny: Decimal,
    /// When this snapshot was installed.
    pub effective_at: DateTime<Utc>,
    /// Monotonically increasing snapshot version.
    pub version: u64,
}

impl RateSnapshot {
    fn new(
        hkd_to_mop: Decimal,
        hkd_to_cny: Decimal,
        version: u64,
    ) -> Result<Self, RateError> {
        for rate in [hkd_to_mop, hkd_to_cny] {
            if rate <= Decimal::ZERO {
                return Err(RateError::InvalidRate(rate));
            }
        }
        Ok(Self {
            hkd_to_mop,
            hkd_to_cny,
            effective_at: Utc::now(),
            version,
        })
    }

    /// Returns how many units of `currency` one HKD buys.
    #[must_use]
    pub fn rate_for(&self, currency: Currency) -> Decimal {
        match currency {
            Currency::Hkd => Decimal::ONE,
            Currency::Mop => self.hkd_to_mop,
            Currency::Cny => self.hkd_to_cny,
        }
    }
}

/// The globally shared, administratively updatable rate table.
///
/// Readers take one Arc clone; writers install a fresh snapshot in a single
/// swap. Updates never alter amounts already frozen against an earlier
/// snapshot.
#[derive(Debug)]
pub struct RateTable {
    current: RwLock<Arc<RateSnapshot>>,
}

impl RateTable {
    /// Creates a table with an initial snapshot (version 1).
    ///
    /// # Errors
    ///
    /// Returns `InvalidRate` if either rate is not strictly positive.
    pub fn new(hkd_to_mop: Decimal, hkd_to_cny: Decimal) -> Result<Self, RateError> {
        let snapshot = RateSnapshot::new(hkd_to_mop, hkd_to_cny, 1)?;
        Ok(Self {
            current: RwLock::new(Arc::new(snapshot)),
        })
    }

    /// Creates a table from configured startup rates.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRate` if the configuration carries a non-positive rate.
    pub fn from_config(config: &RatesConfig) -> Result<Self, RateError> {
        Self::new(config.hkd_to_mop, config.hkd_to_cny)
    }

    /// Returns the currently effective snapshot.
    #[must_use]
    pub fn get(&self) -> Arc<RateSnapshot> {
        Arc::clone(&self.current.read())
    }

    /// Validates and atomically installs a new snapshot.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRate` if either rate is not strictly positive; the
    /// current snapshot stays in effect.
    pub fn update(
        &self,
        hkd_to_mop: Decimal,
        hkd_to_cny: Decimal,
    ) -> Result<Arc<RateSnapshot>, RateError> {
        let mut current = self.current.write();
        let snapshot = Arc::new(RateSnapshot::new(
            hkd_to_mop,
            hkd_to_cny,
            current.version + 1,
        )?);
        *current = Arc::clone(&snapshot);
        tracing::info!(
            "Installed rate snapshot v{}: 1 HKD = {} MOP, 1 HKD = {} CNY",
            snapshot.version,
            snapshot.hkd_to_mop,
            snapshot.hkd_to_cny
        );
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_new_table_starts_at_version_one() {
        let table = RateTable::new(dec!(1.03), dec!(0.91)).unwrap();
        let snapshot = table.get();
        assert_eq!(snapshot.version, 1);
        assert_eq!(snapshot.hkd_to_mop, dec!(1.03));
        assert_eq!(snapshot.hkd_to_cny, dec!(0.91));
    }

    #[test]
    fn test_rejects_non_positive_rates() {
        assert!(matches!(
            RateTable::new(dec!(0), dec!(0.91)),
            Err(RateError::InvalidRate(_))
        ));
        assert!(matches!(
            RateTable::new(dec!(1.03), dec!(-0.5)),
            Err(RateError::InvalidRate(_))
        ));
    }

    #[test]
    fn test_update_replaces_snapshot_and_bumps_version() {
        let table = RateTable::new(dec!(1.03), dec!(0.91)).unwrap();
        let updated = table.update(dec!(1.05), dec!(0.93)).unwrap();
        assert_eq!(updated.version, 2);
        assert_eq!(table.get().hkd_to_mop, dec!(1.05));
    }

    #[test]
    fn test_failed_update_keeps_current_snapshot() {
        let table = RateTable::new(dec!(1.03), dec!(0.91)).unwrap();
        assert!(table.update(dec!(0), dec!(0.93)).is_err());
        let snapshot = table.get();
        assert_eq!(snapshot.version, 1);
        assert_eq!(snapshot.hkd_to_mop, dec!(1.03));
    }

    #[test]
    fn test_old_snapshots_survive_updates() {
        let table = RateTable::new(dec!(1.03), dec!(0.91)).unwrap();
        let pinned = table.get();
        table.update(dec!(2.00), dec!(2.00)).unwrap();
        assert_eq!(pinned.hkd_to_mop, dec!(1.03));
        assert_eq!(pinned.version, 1);
    }

    #[test]
    fn test_rate_for() {
        let table = RateTable::new(dec!(1.03), dec!(0.91)).unwrap();
        let snapshot = table.get();
        assert_eq!(snapshot.rate_for(Currency::Hkd), Decimal::ONE);
        assert_eq!(snapshot.rate_for(Currency::Mop), dec!(1.03));
        assert_eq!(snapshot.rate_for(Currency::Cny), dec!(0.91));
    }

    #[test]
    fn test_from_config_defaults() {
        let table = RateTable::from_config(&RatesConfig::default()).unwrap();
        assert_eq!(table.get().hkd_to_mop, dec!(1.03));
    }
}
