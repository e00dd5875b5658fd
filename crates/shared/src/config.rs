//! Application configuration management.

use rust_decimal::Decimal;
use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Initial exchange rates installed at startup.
    #[serde(default)]
    pub rates: RatesConfig,
    /// Settlement engine tuning.
    #[serde(default)]
    pub engine: EngineConfig,
}

/// Initial exchange rates, replaceable at runtime through the rate table.
#[derive(Debug, Clone, Deserialize)]
pub struct RatesConfig {
    /// How many MOP one HKD buys.
    #[serde(default = "default_hkd_to_mop")]
    pub hkd_to_mop: Decimal,
    /// How many CNY one HKD buys.
    #[serde(default = "default_hkd_to_cny")]
    pub hkd_to_cny: Decimal,
}

fn default_hkd_to_mop() -> Decimal {
    Decimal::new(103, 2) // 1 HKD = 1.03 MOP
}

fn default_hkd_to_cny() -> Decimal {
    Decimal::new(91, 2) // 1 HKD = 0.91 CNY
}

impl Default for RatesConfig {
    fn default() -> Self {
        Self {
            hkd_to_mop: default_hkd_to_mop(),
            hkd_to_cny: default_hkd_to_cny(),
        }
    }
}

/// Settlement engine tuning.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// How long a mutating operation waits for an invoice's lock before
    /// failing with a retryable error.
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

fn default_lock_timeout_ms() -> u64 {
    5000
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lock_timeout_ms: default_lock_timeout_ms(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("SALDO").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}
