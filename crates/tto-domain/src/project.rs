//! Domain types representing funded projects.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::*;

/// A contract whose incomes are capped by a fixed budget.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub budget: Money,
    /// Office commission percentage applied to the net of office incomes.
    pub company_rate: Rate,
    pub vat_rate: Rate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub withholding_tax_rate: Option<Rate>,
    #[serde(default)]
    pub has_withholding_tax: bool,
    #[serde(default)]
    pub total_commission_due: Money,
    #[serde(default)]
    pub total_commission_collected: Money,
    /// `None` until the first income is booked against the project.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining_budget: Option<Money>,
    pub status: ProjectStatus,
    #[serde(default)]
    pub referee_approved: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub version: u64,
}

impl Project {
    pub fn new(
        name: impl Into<String>,
        budget: Money,
        company_rate: Rate,
        vat_rate: Rate,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            budget,
            company_rate,
            vat_rate,
            withholding_tax_rate: None,
            has_withholding_tax: false,
            total_commission_due: Decimal::ZERO,
            total_commission_collected: Decimal::ZERO,
            remaining_budget: None,
            status: ProjectStatus::Active,
            referee_approved: false,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    pub fn with_withholding_tax(mut self, rate: Rate) -> Self {
        self.has_withholding_tax = true;
        self.withholding_tax_rate = Some(rate);
        self
    }

    pub fn is_editable(&self) -> bool {
        self.status == ProjectStatus::Active
    }

    /// Remaining budget, falling back to the full budget before any income exists.
    pub fn effective_remaining_budget(&self) -> Money {
        self.remaining_budget.unwrap_or(self.budget)
    }

    /// Commission the office has earned but not yet collected.
    pub fn outstanding_commission(&self) -> Money {
        self.total_commission_due - self.total_commission_collected
    }

    /// Withholding rate in force, if the project withholds tax at all.
    pub fn active_withholding_rate(&self) -> Option<Rate> {
        if self.has_withholding_tax {
            self.withholding_tax_rate
        } else {
            None
        }
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}

impl Identifiable for Project {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Versioned for Project {
    fn version(&self) -> u64 {
        self.version
    }
}

impl Displayable for Project {
    fn display_label(&self) -> String {
        format!("{} [{}]", self.name, self.status)
    }
}

/// Mutable commercial terms of an active project.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectTerms {
    pub budget: Money,
    pub company_rate: Rate,
    pub vat_rate: Rate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub withholding_tax_rate: Option<Rate>,
}

impl ProjectTerms {
    pub fn of(project: &Project) -> Self {
        Self {
            budget: project.budget,
            company_rate: project.company_rate,
            vat_rate: project.vat_rate,
            withholding_tax_rate: project.active_withholding_rate(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
/// Enumerates the lifecycle state of a project.
pub enum ProjectStatus {
    Active,
    Completed,
    Cancelled,
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ProjectStatus::Active => "active",
            ProjectStatus::Completed => "completed",
            ProjectStatus::Cancelled => "cancelled",
        };
        f.write_str(label)
    }
}
