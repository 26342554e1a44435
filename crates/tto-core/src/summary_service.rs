//! Read-only views for reporting collaborators.

use uuid::Uuid;

use tto_domain::{Balance, Money, ProjectStatus};

use crate::{context::LedgerContext, error::CoreResult};

/// Budget and commission position of one project.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectSummary {
    pub project_id: Uuid,
    pub name: String,
    pub status: ProjectStatus,
    pub budget: Money,
    pub incomes_total: Money,
    pub remaining_budget: Money,
    pub collected_total: Money,
    pub uncollected_total: Money,
    pub commission_due: Money,
    pub commission_collected: Money,
    pub commission_outstanding: Money,
    pub income_count: usize,
}

/// Totals across every balance account.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BalanceTotals {
    pub available: Money,
    pub reserved: Money,
    pub debt: Money,
    pub paid_out: Money,
}

pub struct SummaryService;

impl SummaryService {
    pub fn project_summary(ctx: &LedgerContext<'_>, project_id: Uuid) -> CoreResult<ProjectSummary> {
        let project = ctx.load_project(project_id)?;
        let incomes = ctx.storage.incomes_for_project(project_id)?;
        let incomes_total: Money = incomes.iter().map(|income| income.gross_amount).sum();
        let collected_total: Money = incomes.iter().map(|income| income.collected_amount).sum();
        let uncollected_total: Money = incomes
            .iter()
            .map(|income| income.uncollected_amount())
            .sum();
        Ok(ProjectSummary {
            project_id,
            name: project.name.clone(),
            status: project.status,
            budget: project.budget,
            incomes_total,
            remaining_budget: project.budget - incomes_total,
            collected_total,
            uncollected_total,
            commission_due: project.total_commission_due,
            commission_collected: project.total_commission_collected,
            commission_outstanding: project.outstanding_commission(),
            income_count: incomes.len(),
        })
    }

    /// All balances, ordered by payee.
    pub fn balances(ctx: &LedgerContext<'_>) -> CoreResult<Vec<Balance>> {
        let mut balances = ctx.storage.balances()?;
        balances.sort_by_key(|balance| balance.payee);
        Ok(balances)
    }

    pub fn balance_totals(ctx: &LedgerContext<'_>) -> CoreResult<BalanceTotals> {
        Ok(ctx
            .storage
            .balances()?
            .iter()
            .fold(BalanceTotals::default(), |mut acc, balance| {
                acc.available += balance.available_amount;
                acc.reserved += balance.reserved_amount;
                acc.debt += balance.debt_amount;
                acc.paid_out += balance.total_payment;
                acc
            }))
    }
}
