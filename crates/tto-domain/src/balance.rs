//! Per-payee balance account.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{common::*, payee::Payee};

/// Spendable, earmarked, and owed money held for a single payee.
///
/// All four pools are non-negative. Mutations go through the balance ledger in
/// `tto-core`; this type only carries state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Balance {
    pub payee: Payee,
    pub available_amount: Money,
    pub reserved_amount: Money,
    pub debt_amount: Money,
    /// Cumulative amount paid out through completed instructions.
    pub total_payment: Money,
    pub last_updated: DateTime<Utc>,
    #[serde(default)]
    pub version: u64,
}

impl Balance {
    /// Creates an empty account for `payee`.
    pub fn open(payee: Payee, now: DateTime<Utc>) -> Self {
        Self {
            payee,
            available_amount: Decimal::ZERO,
            reserved_amount: Decimal::ZERO,
            debt_amount: Decimal::ZERO,
            total_payment: Decimal::ZERO,
            last_updated: now,
            version: 0,
        }
    }

    /// Money still held by the office on behalf of the payee.
    pub fn held_amount(&self) -> Money {
        self.available_amount + self.reserved_amount
    }
}

impl Versioned for Balance {
    fn version(&self) -> u64 {
        self.version
    }
}

impl Displayable for Balance {
    fn display_label(&self) -> String {
        format!(
            "{} available={} reserved={} debt={}",
            self.payee, self.available_amount, self.reserved_amount, self.debt_amount
        )
    }
}
