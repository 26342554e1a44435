//! tto-config
//!
//! Persisted office settings: locale, currency, default project rates, data
//! location, backup retention, and log filter. Owns the Config data structure
//! plus disk persistence helpers.

pub mod error;
pub mod manager;
pub mod model;

pub use error::ConfigError;
pub use manager::ConfigManager;
pub use model::Config;
