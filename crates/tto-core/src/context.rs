//! Request-scoped handle passed explicitly into every service call.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use tto_domain::{Balance, Income, Payee, PaymentInstruction, Project};

use crate::{
    error::{CoreError, CoreResult},
    storage::OfficeStorage,
    time::Clock,
};

/// Storage and clock for one logical operation.
#[derive(Clone, Copy)]
pub struct LedgerContext<'a> {
    pub storage: &'a dyn OfficeStorage,
    pub clock: &'a dyn Clock,
}

impl<'a> LedgerContext<'a> {
    pub fn new(storage: &'a dyn OfficeStorage, clock: &'a dyn Clock) -> Self {
        Self { storage, clock }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn load_project(&self, id: Uuid) -> CoreResult<Project> {
        self.storage
            .project(id)?
            .ok_or(CoreError::ProjectNotFound(id))
    }

    pub fn load_income(&self, id: Uuid) -> CoreResult<Income> {
        self.storage.income(id)?.ok_or(CoreError::IncomeNotFound(id))
    }

    pub fn load_instruction(&self, id: Uuid) -> CoreResult<PaymentInstruction> {
        self.storage
            .instruction(id)?
            .ok_or(CoreError::PaymentInstructionNotFound(id))
    }

    pub fn load_balance(&self, payee: &Payee) -> CoreResult<Balance> {
        self.storage
            .balance(payee)?
            .ok_or(CoreError::BalanceNotFound(*payee))
    }
}
