//! Income accounting pipeline: guard, derive, persist.

use rust_decimal::Decimal;
use tracing::{info, warn};
use uuid::Uuid;

use tto_domain::{Displayable, Income, IncomeDraft, Money, Project};

use crate::{
    budget_guard::BudgetGuard,
    context::LedgerContext,
    error::{CoreError, CoreResult},
    installments,
    money::{ensure_amount, ensure_positive, ensure_rate, proportional, round_money, IncomeBreakdown},
    storage::WriteBatch,
};

pub struct IncomeService;

impl IncomeService {
    /// Books a new income against `project_id`.
    ///
    /// Derived amounts are always computed here; the draft contributes only the
    /// gross amount, the VAT rate, and the initial collected amount.
    pub fn create(
        ctx: &LedgerContext<'_>,
        project_id: Uuid,
        draft: IncomeDraft,
    ) -> CoreResult<Income> {
        let mut project = ctx.load_project(project_id)?;
        let existing = ctx.storage.incomes_for_project(project_id)?;
        let existing_total: Money = existing.iter().map(|income| income.gross_amount).sum();

        let gross = ensure_positive(round_money(draft.gross_amount))?;
        let vat_rate = ensure_rate(draft.vat_rate.unwrap_or(project.vat_rate))?;
        let collected = round_money(ensure_amount(draft.collected_amount)?);
        if collected > gross {
            return Err(CoreError::InvalidAmount(format!(
                "collected amount {collected} exceeds gross amount {gross}"
            )));
        }

        BudgetGuard::can_accept_income(&project, existing_total, gross, draft.is_tto_income)?;

        let commission_rate = draft.is_tto_income.then_some(project.company_rate);
        let breakdown = IncomeBreakdown::compute(
            gross,
            vat_rate,
            project.active_withholding_rate(),
            commission_rate,
        )?;

        let now = ctx.now();
        let income = Income {
            id: Uuid::new_v4(),
            project_id,
            gross_amount: breakdown.gross,
            vat_rate,
            vat_amount: breakdown.vat,
            net_amount: breakdown.net,
            withholding_tax_amount: breakdown.withholding,
            commission_amount: breakdown.commission,
            distributable_amount: breakdown.distributable,
            collected_amount: collected,
            income_date: draft.income_date,
            is_tto_income: draft.is_tto_income,
            description: draft.description.trim().to_string(),
            created_at: now,
            version: 0,
        };

        project.total_commission_due += breakdown.commission;
        project.total_commission_collected +=
            proportional(breakdown.commission, collected, breakdown.gross)?;
        project.remaining_budget = Some(project.budget - (existing_total + breakdown.gross));
        project.touch(now);

        let mut batch = WriteBatch::new();
        batch
            .update_project(project)
            .insert_income(income.clone());
        ctx.storage.commit(batch)?;

        info!(
            id = %income.id,
            project = %project_id,
            gross = %income.gross_amount,
            vat = %income.vat_amount,
            net = %income.net_amount,
            commission = %income.commission_amount,
            "income recorded"
        );

        Self::relabel_installments(ctx, project_id);
        ctx.load_income(income.id)
    }

    /// Updates how much of an income has been collected and moves the project's
    /// collected commission by the same share.
    pub fn record_collection(
        ctx: &LedgerContext<'_>,
        income_id: Uuid,
        collected_amount: Money,
    ) -> CoreResult<Income> {
        let collected = round_money(ensure_amount(collected_amount)?);
        let mut income = ctx.load_income(income_id)?;
        if collected > income.gross_amount {
            return Err(CoreError::InvalidAmount(format!(
                "collected amount {collected} exceeds gross amount {}",
                income.gross_amount
            )));
        }
        let mut project = ctx.load_project(income.project_id)?;

        let before = proportional(
            income.commission_amount,
            income.collected_amount,
            income.gross_amount,
        )?;
        let after = proportional(income.commission_amount, collected, income.gross_amount)?;
        project.total_commission_collected = (project.total_commission_collected - before + after)
            .max(Decimal::ZERO)
            .min(project.total_commission_due);
        project.touch(ctx.now());
        income.collected_amount = collected;

        let mut batch = WriteBatch::new();
        batch.update_project(project).update_income(income);
        ctx.storage.commit(batch)?;
        let income = ctx.load_income(income_id)?;
        info!(income = %income.display_label(), %collected, "income collection recorded");
        Ok(income)
    }

    /// Incomes of a project ordered by income date.
    pub fn list_for_project(ctx: &LedgerContext<'_>, project_id: Uuid) -> CoreResult<Vec<Income>> {
        let mut incomes = ctx.storage.incomes_for_project(project_id)?;
        incomes.sort_by(|a, b| {
            a.income_date
                .cmp(&b.income_date)
                .then(a.created_at.cmp(&b.created_at))
        });
        Ok(incomes)
    }

    pub fn incomes_total(project: &Project, incomes: &[Income]) -> Money {
        incomes
            .iter()
            .filter(|income| income.project_id == project.id)
            .map(|income| income.gross_amount)
            .sum()
    }

    /// Cosmetic; a failure here never fails the income that triggered it.
    fn relabel_installments(ctx: &LedgerContext<'_>, project_id: Uuid) {
        let result = ctx
            .storage
            .incomes_for_project(project_id)
            .and_then(|incomes| {
                let changed = installments::relabel(&incomes);
                if changed.is_empty() {
                    return Ok(());
                }
                let mut batch = WriteBatch::new();
                for income in changed {
                    batch.update_income(income);
                }
                ctx.storage.commit(batch)
            });
        if let Err(err) = result {
            warn!(project = %project_id, "installment relabeling skipped: {err}");
        }
    }
}
