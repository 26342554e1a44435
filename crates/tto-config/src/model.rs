use std::path::PathBuf;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ConfigError;

const APP_DIR: &str = "tto-ledger";

/// Office-wide settings persisted next to the book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub locale: String,
    pub currency: String,
    /// VAT percentage applied to incomes that do not carry their own rate.
    #[serde(default = "Config::default_vat_rate_value")]
    pub default_vat_rate: Decimal,
    /// Office commission percentage proposed for new projects.
    #[serde(default = "Config::default_company_rate_value")]
    pub default_company_rate: Decimal,
    /// Number of book backups kept by the JSON store.
    #[serde(default = "Config::default_backup_retention_value")]
    pub backup_retention: usize,

    #[serde(skip_serializing_if = "Option::is_none")]
    /// Optional custom directory for the book. Defaults to the platform data dir.
    pub data_root: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_filter: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            locale: "tr-TR".into(),
            currency: "TRY".into(),
            default_vat_rate: Self::default_vat_rate_value(),
            default_company_rate: Self::default_company_rate_value(),
            backup_retention: Self::default_backup_retention_value(),
            data_root: None,
            log_filter: None,
        }
    }
}

impl Config {
    pub fn default_vat_rate_value() -> Decimal {
        Decimal::from(18)
    }

    pub fn default_company_rate_value() -> Decimal {
        Decimal::from(10)
    }

    pub fn default_backup_retention_value() -> usize {
        10
    }

    pub fn resolve_data_root(&self) -> PathBuf {
        if let Some(path) = &self.data_root {
            return path.clone();
        }

        let base = dirs::data_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."));

        base.join(APP_DIR)
    }

    pub fn resolve_backup_root(&self) -> PathBuf {
        self.resolve_data_root().join("backups")
    }

    /// Rejects rates outside `[0, 100]` and empty locale or currency codes.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let hundred = Decimal::ONE_HUNDRED;
        for (name, rate) in [
            ("default_vat_rate", self.default_vat_rate),
            ("default_company_rate", self.default_company_rate),
        ] {
            if rate < Decimal::ZERO || rate > hundred {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be between 0 and 100, got {rate}"
                )));
            }
        }
        if self.locale.trim().is_empty() {
            return Err(ConfigError::Invalid("locale must not be empty".into()));
        }
        if self.currency.trim().len() != 3 {
            return Err(ConfigError::Invalid(format!(
                "currency `{}` is not a three-letter code",
                self.currency
            )));
        }
        Ok(())
    }
}
