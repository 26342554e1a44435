use std::io;

use thiserror::Error;
use uuid::Uuid;

use tto_domain::{Money, Payee, PaymentStatus, ProjectStatus, Rate};

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid rate: {0} (expected a percentage between 0 and 100)")]
    InvalidRate(Rate),
    #[error("Project {project_id} is {status} and can no longer be edited")]
    ProjectNotEditable {
        project_id: Uuid,
        status: ProjectStatus,
    },
    #[error("Project {0} needs referee approval before incomes can be recorded")]
    RefereeApprovalRequired(Uuid),
    #[error(
        "Budget exceeded: project budget is {budget}, existing incomes total {existing}, \
         attempted amount {candidate}"
    )]
    BudgetExceeded {
        budget: Money,
        existing: Money,
        candidate: Money,
    },
    #[error(
        "Commission coverage violated: remaining budget would drop to {remaining_after} \
         but {outstanding_commission} of commission is still uncollected"
    )]
    CommissionCoverageViolation {
        remaining_after: Money,
        outstanding_commission: Money,
    },
    #[error("Insufficient funds for {payee}: available {available}, requested {requested}")]
    InsufficientFunds {
        payee: Payee,
        available: Money,
        requested: Money,
    },
    #[error("Invalid status transition: {current} -> {requested}")]
    InvalidStatusTransition {
        current: PaymentStatus,
        requested: PaymentStatus,
    },
    #[error("Payment instruction {0} is completed and cannot be deleted")]
    CompletedInstructionImmutable(Uuid),
    #[error("Concurrent modification of {0}; retry the operation")]
    ConcurrencyConflict(String),
    #[error("Project not found: {0}")]
    ProjectNotFound(Uuid),
    #[error("Income not found: {0}")]
    IncomeNotFound(Uuid),
    #[error("Payment instruction not found: {0}")]
    PaymentInstructionNotFound(Uuid),
    #[error("Balance not found: {0}")]
    BalanceNotFound(Payee),
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Serialization error: {0}")]
    Serde(String),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl CoreError {
    /// Only stale writes are worth repeating; everything else fails the same way twice.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CoreError::ConcurrencyConflict(_))
    }

    /// Returns `true` for business-rule rejections that should be shown to the user
    /// as-is, and `false` for infrastructure failures.
    pub fn is_domain(&self) -> bool {
        !matches!(
            self,
            CoreError::Storage(_) | CoreError::Serde(_) | CoreError::Io(_)
        )
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
