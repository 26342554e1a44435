//! tto-core
//!
//! Financial ledger core for the technology-transfer office: money math, the
//! budget guard, the balance ledger, the payment instruction state machine, and
//! the income accounting pipeline.
//! Depends on tto-domain. No CLI, no terminal I/O, no file storage.

pub mod allocation_service;
pub mod balance_ledger;
pub mod budget_guard;
pub mod context;
pub mod error;
pub mod format;
pub mod income_service;
pub mod installments;
pub mod money;
pub mod payment_service;
pub mod project_service;
pub mod storage;
pub mod summary_service;
pub mod time;


pub use allocation_service::AllocationService;
pub use balance_ledger::BalanceLedger;
pub use budget_guard::BudgetGuard;
pub use context::LedgerContext;
pub use error::{CoreError, CoreResult};
pub use income_service::IncomeService;
pub use money::IncomeBreakdown;
pub use payment_service::{LedgerEffect, PaymentService};
pub use project_service::ProjectService;
pub use storage::{Book, BookSnapshot, MemoryStorage, OfficeStorage, WriteBatch};
pub use summary_service::{BalanceTotals, ProjectSummary, SummaryService};
pub use time::{Clock, FixedClock, SystemClock};
