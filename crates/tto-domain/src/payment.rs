//! Domain models for payment instructions.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{common::*, payee::Payee};

/// An instruction to pay `total_amount` out of a payee's balance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentInstruction {
    pub id: Uuid,
    pub payee: Payee,
    pub total_amount: Money,
    pub status: PaymentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub version: u64,
}

impl PaymentInstruction {
    /// Builds a new instruction in the `pending` state.
    pub fn pending(payee: Payee, total_amount: Money, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            payee,
            total_amount,
            status: PaymentStatus::Pending,
            notes: None,
            created_at: now,
            approved_at: None,
            version: 0,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        let notes = notes.into();
        self.notes = if notes.trim().is_empty() {
            None
        } else {
            Some(notes)
        };
        self
    }
}

impl Identifiable for PaymentInstruction {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Versioned for PaymentInstruction {
    fn version(&self) -> u64 {
        self.version
    }
}

impl Displayable for PaymentInstruction {
    fn display_label(&self) -> String {
        format!("payment:{} {} [{}]", self.id, self.total_amount, self.status)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
/// Enumerates the lifecycle state of a payment instruction.
pub enum PaymentStatus {
    Pending,
    Completed,
    Rejected,
}

impl PaymentStatus {
    pub const ALL: [PaymentStatus; 3] = [
        PaymentStatus::Pending,
        PaymentStatus::Completed,
        PaymentStatus::Rejected,
    ];

    pub fn is_terminal(self) -> bool {
        matches!(self, PaymentStatus::Completed)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Rejected => "rejected",
        };
        f.write_str(label)
    }
}
