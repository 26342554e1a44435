use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info};
use uuid::Uuid;

use tto_config::{Config, ConfigManager};
use tto_core::{
    format::{self, CurrencyCode, LocaleConfig},
    AllocationService, BalanceTotals, BudgetGuard, Clock, CoreResult, IncomeService,
    LedgerContext, MemoryStorage, OfficeStorage, PaymentService, ProjectService, ProjectSummary,
    SummaryService, SystemClock,
};
use tto_domain::{
    Balance, Income, IncomeDraft, Money, Payee, PaymentInstruction, PaymentStatus, Project,
    ProjectTerms,
};
use tto_storage_json::{JsonOfficeStorage, StoragePaths};

use crate::{errors::OfficeError, utils::DEFAULT_CONFIG_BASE};

/// Facade that owns the storage backend and clock and exposes every office
/// operation.
///
/// Each call builds a fresh [`LedgerContext`]. A call that loses an optimistic
/// concurrency race is re-run once against fresh state before the conflict is
/// reported.
pub struct OfficeManager {
    storage: Box<dyn OfficeStorage>,
    clock: Arc<dyn Clock>,
    config: Config,
    locale: LocaleConfig,
    currency: CurrencyCode,
}

impl OfficeManager {
    pub fn new(storage: Box<dyn OfficeStorage>, clock: Arc<dyn Clock>, config: Config) -> Self {
        let locale = LocaleConfig::from_tag(&config.locale);
        let currency = CurrencyCode::new(config.currency.clone());
        Self {
            storage,
            clock,
            config,
            locale,
            currency,
        }
    }

    /// Volatile office, mostly for tests and demos.
    pub fn in_memory(config: Config) -> Self {
        Self::new(Box::new(MemoryStorage::new()), Arc::new(SystemClock), config)
    }

    /// Opens the JSON book under the configured data root.
    pub fn open(config: &Config) -> Result<Self, OfficeError> {
        config.validate()?;
        let root = config.resolve_data_root();
        let paths = StoragePaths {
            backup_root: config.resolve_backup_root(),
            ..StoragePaths::under(&root)
        };
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let storage =
            JsonOfficeStorage::with_clock(paths, config.backup_retention, Arc::clone(&clock))?;
        info!(root = %root.display(), "office book opened");
        Ok(Self::new(Box::new(storage), clock, config.clone()))
    }

    /// Loads the config from the platform config directory and opens its book.
    pub fn open_default() -> Result<Self, OfficeError> {
        let manager = ConfigManager::with_base_dir(DEFAULT_CONFIG_BASE.clone())?;
        let config = manager.load()?;
        Self::open(&config)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn storage(&self) -> &dyn OfficeStorage {
        self.storage.as_ref()
    }

    /// Today's date according to the office clock.
    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    fn context(&self) -> LedgerContext<'_> {
        LedgerContext::new(self.storage.as_ref(), self.clock.as_ref())
    }

    fn run<T>(&self, op: impl Fn(&LedgerContext<'_>) -> CoreResult<T>) -> Result<T, OfficeError> {
        let ctx = self.context();
        match op(&ctx) {
            Err(err) if err.is_retryable() => {
                debug!("retrying after conflict: {err}");
                Ok(op(&ctx)?)
            }
            other => Ok(other?),
        }
    }

    // Projects

    /// Terms for a new project using the configured default rates.
    pub fn default_terms(&self, budget: Money) -> ProjectTerms {
        ProjectTerms {
            budget,
            company_rate: self.config.default_company_rate,
            vat_rate: self.config.default_vat_rate,
            withholding_tax_rate: None,
        }
    }

    pub fn create_project(&self, name: &str, terms: ProjectTerms) -> Result<Project, OfficeError> {
        self.run(|ctx| ProjectService::create(ctx, name, terms.clone()))
    }

    pub fn approve_referee(&self, project_id: Uuid) -> Result<Project, OfficeError> {
        self.run(|ctx| ProjectService::approve_referee(ctx, project_id))
    }

    pub fn update_project_terms(
        &self,
        project_id: Uuid,
        terms: ProjectTerms,
    ) -> Result<Project, OfficeError> {
        self.run(|ctx| ProjectService::update_terms(ctx, project_id, terms.clone()))
    }

    pub fn complete_project(&self, project_id: Uuid) -> Result<Project, OfficeError> {
        self.run(|ctx| ProjectService::complete(ctx, project_id))
    }

    pub fn cancel_project(&self, project_id: Uuid) -> Result<Project, OfficeError> {
        self.run(|ctx| ProjectService::cancel(ctx, project_id))
    }

    pub fn project(&self, project_id: Uuid) -> Result<Project, OfficeError> {
        Ok(self.context().load_project(project_id)?)
    }

    pub fn projects(&self) -> Result<Vec<Project>, OfficeError> {
        Ok(ProjectService::list(&self.context())?)
    }

    pub fn project_summary(&self, project_id: Uuid) -> Result<ProjectSummary, OfficeError> {
        Ok(SummaryService::project_summary(&self.context(), project_id)?)
    }

    // Incomes

    /// Dry-runs the budget guard for a candidate income without booking it.
    pub fn can_accept_income(
        &self,
        project_id: Uuid,
        gross_amount: Money,
        is_tto_income: bool,
    ) -> Result<(), OfficeError> {
        let ctx = self.context();
        let project = ctx.load_project(project_id)?;
        let incomes = ctx.storage.incomes_for_project(project_id)?;
        let existing = IncomeService::incomes_total(&project, &incomes);
        Ok(BudgetGuard::can_accept_income(
            &project,
            existing,
            gross_amount,
            is_tto_income,
        )?)
    }

    pub fn create_income(&self, project_id: Uuid, draft: IncomeDraft) -> Result<Income, OfficeError> {
        self.run(|ctx| IncomeService::create(ctx, project_id, draft.clone()))
    }

    pub fn record_collection(
        &self,
        income_id: Uuid,
        collected_amount: Money,
    ) -> Result<Income, OfficeError> {
        self.run(|ctx| IncomeService::record_collection(ctx, income_id, collected_amount))
    }

    pub fn incomes(&self, project_id: Uuid) -> Result<Vec<Income>, OfficeError> {
        Ok(IncomeService::list_for_project(&self.context(), project_id)?)
    }

    // Balances

    pub fn allocate(&self, payee: Payee, amount: Money) -> Result<Balance, OfficeError> {
        self.run(|ctx| AllocationService::allocate(ctx, payee, amount))
    }

    pub fn record_debt(&self, payee: Payee, amount: Money) -> Result<Balance, OfficeError> {
        self.run(|ctx| AllocationService::record_debt(ctx, payee, amount))
    }

    pub fn balance(&self, payee: &Payee) -> Result<Balance, OfficeError> {
        Ok(self.context().load_balance(payee)?)
    }

    pub fn balances(&self) -> Result<Vec<Balance>, OfficeError> {
        Ok(SummaryService::balances(&self.context())?)
    }

    pub fn balance_totals(&self) -> Result<BalanceTotals, OfficeError> {
        Ok(SummaryService::balance_totals(&self.context())?)
    }

    // Payment instructions

    pub fn create_payment_instruction(
        &self,
        payee: Payee,
        total_amount: Money,
        notes: Option<&str>,
    ) -> Result<PaymentInstruction, OfficeError> {
        self.run(|ctx| {
            PaymentService::create(ctx, payee, total_amount, notes.map(str::to_string))
        })
    }

    pub fn transition_payment(
        &self,
        id: Uuid,
        requested: PaymentStatus,
    ) -> Result<PaymentInstruction, OfficeError> {
        self.run(|ctx| PaymentService::transition(ctx, id, requested))
    }

    pub fn complete_payment(&self, id: Uuid) -> Result<PaymentInstruction, OfficeError> {
        self.transition_payment(id, PaymentStatus::Completed)
    }

    pub fn reject_payment(&self, id: Uuid) -> Result<PaymentInstruction, OfficeError> {
        self.transition_payment(id, PaymentStatus::Rejected)
    }

    pub fn reopen_payment(&self, id: Uuid) -> Result<PaymentInstruction, OfficeError> {
        self.transition_payment(id, PaymentStatus::Pending)
    }

    pub fn delete_payment_instruction(&self, id: Uuid) -> Result<PaymentInstruction, OfficeError> {
        self.run(|ctx| PaymentService::delete(ctx, id))
    }

    pub fn payment_instruction(&self, id: Uuid) -> Result<PaymentInstruction, OfficeError> {
        Ok(self.context().load_instruction(id)?)
    }

    pub fn payment_instructions(&self, payee: &Payee) -> Result<Vec<PaymentInstruction>, OfficeError> {
        Ok(PaymentService::list_for_payee(&self.context(), payee)?)
    }

    // Presentation

    /// Renders an amount with the configured locale and currency.
    pub fn format_money(&self, amount: Money) -> String {
        format::format_money(amount, &self.currency, &self.locale)
    }

    /// Pretty-printed JSON of every row in the book.
    pub fn export_json(&self) -> Result<String, OfficeError> {
        let ctx = self.context();
        let snapshot = ExportedBook {
            projects: ctx.storage.projects()?,
            balances: ctx.storage.balances()?,
            incomes: self.all_incomes(&ctx)?,
            instructions: self.all_instructions(&ctx)?,
        };
        Ok(serde_json::to_string_pretty(&snapshot)?)
    }

    fn all_incomes(&self, ctx: &LedgerContext<'_>) -> CoreResult<Vec<Income>> {
        let mut incomes = Vec::new();
        for project in ctx.storage.projects()? {
            incomes.extend(ctx.storage.incomes_for_project(project.id)?);
        }
        Ok(incomes)
    }

    fn all_instructions(&self, ctx: &LedgerContext<'_>) -> CoreResult<Vec<PaymentInstruction>> {
        let mut instructions = Vec::new();
        for balance in ctx.storage.balances()? {
            instructions.extend(ctx.storage.instructions_for_payee(&balance.payee)?);
        }
        Ok(instructions)
    }
}

#[derive(serde::Serialize)]
struct ExportedBook {
    projects: Vec<Project>,
    incomes: Vec<Income>,
    balances: Vec<Balance>,
    instructions: Vec<PaymentInstruction>,
}
