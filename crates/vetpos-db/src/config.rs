//! Engine configuration module.
//!
//! Configuration is loaded from environment variables with fallback to defaults.
//!
//! | Variable                      | Default        |
//! |-------------------------------|----------------|
//! | `VETPOS_DB_PATH`              | `./vetpos.db`  |
//! | `VETPOS_MAX_CONNECTIONS`      | `5`            |
//! | `VETPOS_TAX_RATE_BPS`         | `0`            |
//! | `VETPOS_ALLOW_NEGATIVE_STOCK` | `false`        |
//! | `VETPOS_SALE_NUMBER_ATTEMPTS` | `3`            |

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use vetpos_core::TaxRate;

use crate::pool::DbConfig;

/// Settings shared by the sale and transfer services.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// SQLite database file.
    pub database_path: PathBuf,

    /// Pool size.
    pub max_connections: u32,

    /// Rate for the receipt's tax breakdown when the cart carries none.
    pub default_tax_rate_bps: u32,

    /// Let sales take stock below zero instead of failing.
    pub allow_negative_stock: bool,

    /// How many sale numbers to try before giving up on a collision.
    pub sale_number_attempts: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            database_path: PathBuf::from("./vetpos.db"),
            max_connections: 5,
            default_tax_rate_bps: 0,
            allow_negative_stock: false,
            sale_number_attempts: 3,
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = EngineConfig::default();

        let config = EngineConfig {
            database_path: lookup("VETPOS_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),

            max_connections: parse_or(&lookup, "VETPOS_MAX_CONNECTIONS", defaults.max_connections)?,

            default_tax_rate_bps: parse_or(
                &lookup,
                "VETPOS_TAX_RATE_BPS",
                defaults.default_tax_rate_bps,
            )?,

            allow_negative_stock: parse_or(
                &lookup,
                "VETPOS_ALLOW_NEGATIVE_STOCK",
                defaults.allow_negative_stock,
            )?,

            sale_number_attempts: parse_or(
                &lookup,
                "VETPOS_SALE_NUMBER_ATTEMPTS",
                defaults.sale_number_attempts,
            )?,
        };

        if config.max_connections == 0 {
            return Err(ConfigError::InvalidValue("VETPOS_MAX_CONNECTIONS".to_string()));
        }
        if config.default_tax_rate_bps > 10_000 {
            return Err(ConfigError::InvalidValue("VETPOS_TAX_RATE_BPS".to_string()));
        }
        if config.sale_number_attempts == 0 {
            return Err(ConfigError::InvalidValue("VETPOS_SALE_NUMBER_ATTEMPTS".to_string()));
        }

        Ok(config)
    }

    /// Pool settings for [`Database::new`](crate::Database::new).
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(self.database_path.clone()).max_connections(self.max_connections)
    }

    pub fn default_tax_rate(&self) -> TaxRate {
        TaxRate::from_bps(self.default_tax_rate_bps)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = EngineConfig::from_lookup(lookup(&[])).unwrap();

        assert_eq!(config.database_path, PathBuf::from("./vetpos.db"));
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.default_tax_rate_bps, 0);
        assert!(!config.allow_negative_stock);
        assert_eq!(config.sale_number_attempts, 3);
    }

    #[test]
    fn test_overrides() {
        let config = EngineConfig::from_lookup(lookup(&[
            ("VETPOS_DB_PATH", "/data/clinic.db"),
            ("VETPOS_TAX_RATE_BPS", "2500"),
            ("VETPOS_ALLOW_NEGATIVE_STOCK", "true"),
        ]))
        .unwrap();

        assert_eq!(config.database_path, PathBuf::from("/data/clinic.db"));
        assert_eq!(config.default_tax_rate().bps(), 2500);
        assert!(config.allow_negative_stock);
        assert_eq!(config.db_config().max_connections, 5);
    }

    #[test]
    fn test_invalid_values() {
        let err = EngineConfig::from_lookup(lookup(&[("VETPOS_MAX_CONNECTIONS", "many")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(ref v) if v == "VETPOS_MAX_CONNECTIONS"));

        let err = EngineConfig::from_lookup(lookup(&[("VETPOS_TAX_RATE_BPS", "10001")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(ref v) if v == "VETPOS_TAX_RATE_BPS"));

        assert!(EngineConfig::from_lookup(lookup(&[("VETPOS_SALE_NUMBER_ATTEMPTS", "0")])).is_err());
    }
}
