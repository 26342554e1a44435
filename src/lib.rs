#![doc(test(attr(deny(warnings))))]

//! TTO Ledger keeps the books of a technology-transfer office: project budgets,
//! incomes with VAT and commission, payee balances, and payment instructions.
//!
//! The heavy lifting lives in the `tto-*` crates; this crate wires them into
//! [`OfficeManager`] and owns tracing setup.

pub mod core;
pub mod errors;
pub mod utils;

use std::sync::Once;

pub use crate::core::OfficeManager;
pub use errors::OfficeError;
pub use tto_config::{Config, ConfigManager};
pub use tto_core::{
    format::{format_money, format_percent},
    money::to_money,
    BalanceTotals, Clock, CoreError, FixedClock, ProjectSummary, SystemClock,
};
pub use tto_domain::{
    Balance, Income, IncomeDraft, Money, Payee, PaymentInstruction, PaymentStatus, Project,
    ProjectStatus, ProjectTerms, Rate,
};

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::info!("TTO ledger tracing initialized.");
    });
}

/// Like [`init`], honouring the config's `log_filter` when `RUST_LOG` is unset.
pub fn init_with_config(config: &Config) {
    INIT_TRACING.call_once(|| {
        utils::init_tracing_with(config.log_filter.as_deref());
        tracing::info!(locale = %config.locale, currency = %config.currency, "TTO ledger tracing initialized.");
    });
}
