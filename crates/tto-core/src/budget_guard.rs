//! Gate that decides whether a candidate income may be booked against a project.

use tracing::warn;

use tto_domain::{Money, Project, ProjectStatus};

use crate::error::{CoreError, CoreResult};

/// Stateless checks run before any income is persisted.
pub struct BudgetGuard;

impl BudgetGuard {
    /// Accepts or rejects a candidate income.
    ///
    /// Status and approval gates run before the money checks so the caller
    /// always sees the most actionable rejection first.
    pub fn can_accept_income(
        project: &Project,
        existing_incomes_total: Money,
        candidate_gross: Money,
        candidate_is_tto_income: bool,
    ) -> CoreResult<()> {
        let result = Self::evaluate(
            project,
            existing_incomes_total,
            candidate_gross,
            candidate_is_tto_income,
        );
        if let Err(err) = &result {
            warn!(project = %project.id, candidate = %candidate_gross, "income rejected: {err}");
        }
        result
    }

    fn evaluate(
        project: &Project,
        existing_incomes_total: Money,
        candidate_gross: Money,
        candidate_is_tto_income: bool,
    ) -> CoreResult<()> {
        if project.status != ProjectStatus::Active {
            return Err(CoreError::ProjectNotEditable {
                project_id: project.id,
                status: project.status,
            });
        }
        if !project.referee_approved {
            return Err(CoreError::RefereeApprovalRequired(project.id));
        }
        let incomes_after = existing_incomes_total.checked_add(candidate_gross);
        if incomes_after.map_or(true, |total| total > project.budget) {
            return Err(CoreError::BudgetExceeded {
                budget: project.budget,
                existing: existing_incomes_total,
                candidate: candidate_gross,
            });
        }
        if !candidate_is_tto_income {
            let remaining_after = project.effective_remaining_budget() - candidate_gross;
            let outstanding_commission = project.outstanding_commission();
            if remaining_after < outstanding_commission {
                return Err(CoreError::CommissionCoverageViolation {
                    remaining_after,
                    outstanding_commission,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn approved_project() -> Project {
        let mut project = Project::new("Catalyst", dec!(100000), dec!(10), dec!(18), Utc::now());
        project.referee_approved = true;
        project
    }

    #[test]
    fn accepts_income_within_budget() {
        let project = approved_project();
        assert!(BudgetGuard::can_accept_income(&project, dec!(50000), dec!(50000), true).is_ok());
    }

    #[test]
    fn rejects_income_over_budget_with_figures() {
        let project = approved_project();
        let err = BudgetGuard::can_accept_income(&project, dec!(90000), dec!(15000), true)
            .expect_err("budget must be enforced");
        match err {
            CoreError::BudgetExceeded {
                budget,
                existing,
                candidate,
            } => {
                assert_eq!(budget, dec!(100000));
                assert_eq!(existing, dec!(90000));
                assert_eq!(candidate, dec!(15000));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn overflowing_total_is_rejected_not_panicking() {
        let project = approved_project();
        let err = BudgetGuard::can_accept_income(&project, dec!(100), Decimal::MAX, true)
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::BudgetExceeded { existing, candidate, .. }
                if existing == dec!(100) && candidate == Decimal::MAX
        ));
    }

    #[test]
    fn status_gate_runs_before_money_checks() {
        let mut project = approved_project();
        project.status = ProjectStatus::Completed;
        project.referee_approved = false;
        let err = BudgetGuard::can_accept_income(&project, dec!(99999), dec!(50000), false)
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::ProjectNotEditable {
                status: ProjectStatus::Completed,
                ..
            }
        ));
    }

    #[test]
    fn approval_gate_runs_before_budget_check() {
        let mut project = approved_project();
        project.referee_approved = false;
        let err = BudgetGuard::can_accept_income(&project, dec!(99999), dec!(50000), true)
            .unwrap_err();
        assert!(matches!(err, CoreError::RefereeApprovalRequired(id) if id == project.id));
    }

    #[test]
    fn non_office_income_must_leave_room_for_commission() {
        let mut project = approved_project();
        project.remaining_budget = Some(dec!(20000));
        project.total_commission_due = dec!(8000);
        project.total_commission_collected = dec!(3000);

        // 20000 - 15000 = 5000 >= 5000 outstanding
        assert!(BudgetGuard::can_accept_income(&project, dec!(80000), dec!(15000), false).is_ok());

        let err = BudgetGuard::can_accept_income(&project, dec!(80000), dec!(15000.01), false)
            .unwrap_err();
        match err {
            CoreError::CommissionCoverageViolation {
                remaining_after,
                outstanding_commission,
            } => {
                assert_eq!(remaining_after, dec!(4999.99));
                assert_eq!(outstanding_commission, dec!(5000));
            }
            other => panic!("unexpected error: {other:?}"),
        }

        // Office incomes skip the coverage rule.
        assert!(
            BudgetGuard::can_accept_income(&project, dec!(80000), dec!(15000.01), true).is_ok()
        );
    }

    #[test]
    fn coverage_uses_full_budget_before_first_income() {
        let mut project = approved_project();
        project.total_commission_due = dec!(1000);
        assert!(BudgetGuard::can_accept_income(&project, dec!(0), dec!(99000), false).is_ok());
        assert!(BudgetGuard::can_accept_income(&project, dec!(0), dec!(99000.01), false).is_err());
    }
}
