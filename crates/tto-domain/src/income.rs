//! Domain models for project incomes.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::*;

/// An invoiced amount booked against a project.
///
/// Every amount except `gross_amount` and `collected_amount` is derived by the
/// accounting pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Income {
    pub id: Uuid,
    pub project_id: Uuid,
    pub gross_amount: Money,
    pub vat_rate: Rate,
    pub vat_amount: Money,
    pub net_amount: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub withholding_tax_amount: Option<Money>,
    #[serde(default)]
    pub commission_amount: Money,
    #[serde(default)]
    pub distributable_amount: Money,
    #[serde(default)]
    pub collected_amount: Money,
    pub income_date: NaiveDate,
    /// `false` marks money that passes through the project without being office income.
    pub is_tto_income: bool,
    #[serde(default)]
    pub description: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub version: u64,
}

impl Income {
    /// Invoiced money not yet received; never negative.
    pub fn uncollected_amount(&self) -> Money {
        (self.gross_amount - self.collected_amount).max(Decimal::ZERO)
    }
}

impl Identifiable for Income {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Versioned for Income {
    fn version(&self) -> u64 {
        self.version
    }
}

impl Displayable for Income {
    fn display_label(&self) -> String {
        if self.description.is_empty() {
            format!("income:{} ({})", self.id, self.income_date)
        } else {
            format!("{} ({})", self.description, self.income_date)
        }
    }
}

/// Caller-supplied candidate for a new income.
///
/// Only the gross amount and the VAT rate are trusted amount inputs; when the
/// rate is omitted the project's rate applies.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IncomeDraft {
    pub gross_amount: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vat_rate: Option<Rate>,
    pub income_date: NaiveDate,
    #[serde(default = "IncomeDraft::default_is_tto_income")]
    pub is_tto_income: bool,
    #[serde(default)]
    pub collected_amount: Money,
    #[serde(default)]
    pub description: String,
}

impl IncomeDraft {
    pub fn new(gross_amount: Money, income_date: NaiveDate) -> Self {
        Self {
            gross_amount,
            vat_rate: None,
            income_date,
            is_tto_income: Self::default_is_tto_income(),
            collected_amount: Decimal::ZERO,
            description: String::new(),
        }
    }

    pub fn default_is_tto_income() -> bool {
        true
    }

    pub fn with_vat_rate(mut self, rate: Rate) -> Self {
        self.vat_rate = Some(rate);
        self
    }

    pub fn not_office_income(mut self) -> Self {
        self.is_tto_income = false;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}
