//! tto-domain
//!
//! Pure domain models for the technology-transfer office ledger (Project, Income,
//! Balance, PaymentInstruction, Payee). No I/O, no storage. Only data types and
//! core enums.

pub mod balance;
pub mod common;
pub mod income;
pub mod payee;
pub mod payment;
pub mod project;

pub use balance::*;
pub use common::*;
pub use income::*;
pub use payee::*;
pub use payment::*;
pub use project::*;
