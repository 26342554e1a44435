//! Project administration: creation, referee approval, terms, and closing.

use rust_decimal::Decimal;
use tracing::{info, warn};
use uuid::Uuid;

use tto_domain::{Displayable, Money, Project, ProjectStatus, ProjectTerms};

use crate::{
    context::LedgerContext,
    error::{CoreError, CoreResult},
    money::{ensure_positive, ensure_rate, round_money},
    storage::WriteBatch,
};

pub struct ProjectService;

impl ProjectService {
    pub fn create(
        ctx: &LedgerContext<'_>,
        name: impl Into<String>,
        terms: ProjectTerms,
    ) -> CoreResult<Project> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(CoreError::Validation("project name must not be empty".into()));
        }
        Self::validate_terms(&terms)?;
        let mut project = Project::new(
            name.trim(),
            round_money(terms.budget),
            terms.company_rate,
            terms.vat_rate,
            ctx.now(),
        );
        if let Some(rate) = terms.withholding_tax_rate {
            project = project.with_withholding_tax(rate);
        }

        let mut batch = WriteBatch::new();
        batch.insert_project(project.clone());
        ctx.storage.commit(batch)?;
        info!(id = %project.id, name = %project.name, budget = %project.budget, "project created");
        ctx.load_project(project.id)
    }

    pub fn approve_referee(ctx: &LedgerContext<'_>, id: Uuid) -> CoreResult<Project> {
        let mut project = Self::load_editable(ctx, id)?;
        if project.referee_approved {
            return Ok(project);
        }
        project.referee_approved = true;
        project.touch(ctx.now());
        Self::save(ctx, project)
    }

    /// Replaces budget and rates of an active project.
    ///
    /// Commission already booked on existing incomes is not recomputed.
    pub fn update_terms(
        ctx: &LedgerContext<'_>,
        id: Uuid,
        terms: ProjectTerms,
    ) -> CoreResult<Project> {
        Self::validate_terms(&terms)?;
        let mut project = Self::load_editable(ctx, id)?;
        let incomes = ctx.storage.incomes_for_project(id)?;
        let incomes_total: Money = incomes.iter().map(|income| income.gross_amount).sum();
        let budget = round_money(terms.budget);
        if incomes_total > budget {
            warn!(%id, %budget, %incomes_total, "budget reduction refused");
            return Err(CoreError::BudgetExceeded {
                budget,
                existing: incomes_total,
                candidate: Decimal::ZERO,
            });
        }

        project.budget = budget;
        project.company_rate = terms.company_rate;
        project.vat_rate = terms.vat_rate;
        project.has_withholding_tax = terms.withholding_tax_rate.is_some();
        project.withholding_tax_rate = terms.withholding_tax_rate;
        if !incomes.is_empty() {
            project.remaining_budget = Some(budget - incomes_total);
        }
        project.touch(ctx.now());
        let project = Self::save(ctx, project)?;
        info!(%id, budget = %project.budget, "project terms updated");
        Ok(project)
    }

    pub fn complete(ctx: &LedgerContext<'_>, id: Uuid) -> CoreResult<Project> {
        Self::close(ctx, id, ProjectStatus::Completed)
    }

    pub fn cancel(ctx: &LedgerContext<'_>, id: Uuid) -> CoreResult<Project> {
        Self::close(ctx, id, ProjectStatus::Cancelled)
    }

    pub fn list(ctx: &LedgerContext<'_>) -> CoreResult<Vec<Project>> {
        let mut projects = ctx.storage.projects()?;
        projects.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(projects)
    }

    fn close(ctx: &LedgerContext<'_>, id: Uuid, status: ProjectStatus) -> CoreResult<Project> {
        let mut project = Self::load_editable(ctx, id)?;
        project.status = status;
        project.touch(ctx.now());
        let project = Self::save(ctx, project)?;
        info!(%id, project = %project.display_label(), "project closed");
        Ok(project)
    }

    fn load_editable(ctx: &LedgerContext<'_>, id: Uuid) -> CoreResult<Project> {
        let project = ctx.load_project(id)?;
        if !project.is_editable() {
            return Err(CoreError::ProjectNotEditable {
                project_id: id,
                status: project.status,
            });
        }
        Ok(project)
    }

    fn save(ctx: &LedgerContext<'_>, project: Project) -> CoreResult<Project> {
        let id = project.id;
        let mut batch = WriteBatch::new();
        batch.update_project(project);
        ctx.storage.commit(batch)?;
        ctx.load_project(id)
    }

    fn validate_terms(terms: &ProjectTerms) -> CoreResult<()> {
        ensure_positive(round_money(terms.budget))?;
        ensure_rate(terms.company_rate)?;
        ensure_rate(terms.vat_rate)?;
        if let Some(rate) = terms.withholding_tax_rate {
            ensure_rate(rate)?;
        }
        Ok(())
    }
}
