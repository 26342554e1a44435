//! Payment instruction state machine.
//!
//! ```text
//! (create) --reserve--> pending --finalize--> completed
//!                        |   ^
//!                 release|   |reserve
//!                        v   |
//!                      rejected
//! ```
//!
//! Every transition commits the status change and its balance mutation in a
//! single conditional write batch.

use tracing::{info, warn};
use uuid::Uuid;

use tto_domain::{Balance, Displayable, Money, Payee, PaymentInstruction, PaymentStatus};

use crate::{
    balance_ledger::BalanceLedger,
    context::LedgerContext,
    error::{CoreError, CoreResult},
    money::{ensure_positive, round_money},
    storage::WriteBatch,
};

/// Balance mutation driven by a state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerEffect {
    Reserve,
    Finalize,
    Release,
}

impl LedgerEffect {
    pub fn apply(
        self,
        balance: &mut Balance,
        amount: Money,
        now: chrono::DateTime<chrono::Utc>,
    ) -> CoreResult<()> {
        match self {
            LedgerEffect::Reserve => BalanceLedger::reserve(balance, amount, now),
            LedgerEffect::Finalize => BalanceLedger::finalize(balance, amount, now),
            LedgerEffect::Release => BalanceLedger::release(balance, amount, now),
        }
    }
}

/// Looks up the legal transition table.
pub fn plan_transition(
    current: PaymentStatus,
    requested: PaymentStatus,
) -> CoreResult<LedgerEffect> {
    use PaymentStatus::*;
    if current.is_terminal() {
        return Err(CoreError::InvalidStatusTransition { current, requested });
    }
    match (current, requested) {
        (Pending, Completed) => Ok(LedgerEffect::Finalize),
        (Pending, Rejected) => Ok(LedgerEffect::Release),
        (Rejected, Pending) => Ok(LedgerEffect::Reserve),
        _ => Err(CoreError::InvalidStatusTransition { current, requested }),
    }
}

/// Balance mutation required before an instruction in `current` may be deleted.
/// Rejected instructions hold no funds, so deleting them touches no balance.
pub fn plan_deletion(instruction: &PaymentInstruction) -> CoreResult<Option<LedgerEffect>> {
    match instruction.status {
        PaymentStatus::Pending => Ok(Some(LedgerEffect::Release)),
        PaymentStatus::Rejected => Ok(None),
        PaymentStatus::Completed => Err(CoreError::CompletedInstructionImmutable(instruction.id)),
    }
}

/// Creates, transitions, and deletes payment instructions.
pub struct PaymentService;

impl PaymentService {
    /// Creates an instruction in `pending`, reserving its amount from the payee's balance.
    pub fn create(
        ctx: &LedgerContext<'_>,
        payee: Payee,
        total_amount: Money,
        notes: Option<String>,
    ) -> CoreResult<PaymentInstruction> {
        let total_amount = ensure_positive(round_money(total_amount))?;
        let now = ctx.now();
        let mut balance = ctx
            .storage
            .balance(&payee)?
            .ok_or(CoreError::InsufficientFunds {
                payee,
                available: Money::ZERO,
                requested: total_amount,
            })?;
        if let Err(err) = BalanceLedger::reserve(&mut balance, total_amount, now) {
            warn!(%payee, %total_amount, "payment instruction refused: {err}");
            return Err(err);
        }

        let mut instruction = PaymentInstruction::pending(payee, total_amount, now);
        if let Some(notes) = notes {
            instruction = instruction.with_notes(notes);
        }

        let mut batch = WriteBatch::new();
        batch
            .update_balance(balance)
            .insert_instruction(instruction.clone());
        ctx.storage.commit(batch)?;

        info!(id = %instruction.id, %payee, %total_amount, "payment instruction created");
        Ok(ctx.load_instruction(instruction.id)?)
    }

    /// Moves an instruction to `requested`, applying the matching balance effect.
    pub fn transition(
        ctx: &LedgerContext<'_>,
        id: Uuid,
        requested: PaymentStatus,
    ) -> CoreResult<PaymentInstruction> {
        let mut instruction = ctx.load_instruction(id)?;
        let effect = match plan_transition(instruction.status, requested) {
            Ok(effect) => effect,
            Err(err) => {
                warn!(%id, "payment transition refused: {err}");
                return Err(err);
            }
        };
        let now = ctx.now();
        let mut balance = ctx.load_balance(&instruction.payee)?;
        if let Err(err) = effect.apply(&mut balance, instruction.total_amount, now) {
            warn!(%id, ?effect, "payment transition refused: {err}");
            return Err(err);
        }

        let previous = instruction.status;
        instruction.status = requested;
        if requested == PaymentStatus::Completed {
            instruction.approved_at = Some(now);
        }

        let mut batch = WriteBatch::new();
        batch
            .update_balance(balance)
            .update_instruction(instruction);
        ctx.storage.commit(batch)?;

        info!(%id, from = %previous, to = %requested, ?effect, "payment instruction transitioned");
        ctx.load_instruction(id)
    }

    pub fn complete(ctx: &LedgerContext<'_>, id: Uuid) -> CoreResult<PaymentInstruction> {
        Self::transition(ctx, id, PaymentStatus::Completed)
    }

    pub fn reject(ctx: &LedgerContext<'_>, id: Uuid) -> CoreResult<PaymentInstruction> {
        Self::transition(ctx, id, PaymentStatus::Rejected)
    }

    pub fn reopen(ctx: &LedgerContext<'_>, id: Uuid) -> CoreResult<PaymentInstruction> {
        Self::transition(ctx, id, PaymentStatus::Pending)
    }

    /// Deletes an instruction, returning reserved funds first when it is still pending.
    pub fn delete(ctx: &LedgerContext<'_>, id: Uuid) -> CoreResult<PaymentInstruction> {
        let instruction = ctx.load_instruction(id)?;
        let effect = match plan_deletion(&instruction) {
            Ok(effect) => effect,
            Err(err) => {
                warn!(%id, "payment deletion refused: {err}");
                return Err(err);
            }
        };

        let mut batch = WriteBatch::new();
        if let Some(effect) = effect {
            let mut balance = ctx.load_balance(&instruction.payee)?;
            effect.apply(&mut balance, instruction.total_amount, ctx.now())?;
            batch.update_balance(balance);
        }
        batch.delete_instruction(&instruction);
        ctx.storage.commit(batch)?;

        info!(%id, instruction = %instruction.display_label(), "payment instruction deleted");
        Ok(instruction)
    }

    pub fn list_for_payee(
        ctx: &LedgerContext<'_>,
        payee: &Payee,
    ) -> CoreResult<Vec<PaymentInstruction>> {
        let mut instructions = ctx.storage.instructions_for_payee(payee)?;
        instructions.sort_by_key(|instruction| instruction.created_at);
        Ok(instructions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use PaymentStatus::*;

    #[test]
    fn terminal_status_refuses_every_transition() {
        let terminal: Vec<_> = PaymentStatus::ALL
            .into_iter()
            .filter(|status| status.is_terminal())
            .collect();
        assert_eq!(terminal, vec![Completed]);
        for requested in PaymentStatus::ALL {
            assert!(plan_transition(Completed, requested).is_err());
        }
    }

    #[test]
    fn transition_table_is_total() {
        let legal = [
            (Pending, Completed, LedgerEffect::Finalize),
            (Pending, Rejected, LedgerEffect::Release),
            (Rejected, Pending, LedgerEffect::Reserve),
        ];
        for current in PaymentStatus::ALL {
            for requested in PaymentStatus::ALL {
                let expected = legal
                    .iter()
                    .find(|(from, to, _)| *from == current && *to == requested)
                    .map(|(_, _, effect)| *effect);
                match (plan_transition(current, requested), expected) {
                    (Ok(effect), Some(want)) => assert_eq!(effect, want),
                    (
                        Err(CoreError::InvalidStatusTransition {
                            current: c,
                            requested: r,
                        }),
                        None,
                    ) => {
                        assert_eq!((c, r), (current, requested));
                    }
                    (other, _) => panic!("{current} -> {requested}: unexpected {other:?}"),
                }
            }
        }
    }

    #[test]
    fn deletion_rules() {
        let mut instruction = PaymentInstruction::pending(
            Payee::User(Uuid::new_v4()),
            Money::ONE,
            chrono::Utc::now(),
        );
        assert_eq!(
            plan_deletion(&instruction).unwrap(),
            Some(LedgerEffect::Release)
        );
        instruction.status = Rejected;
        assert_eq!(plan_deletion(&instruction).unwrap(), None);
        instruction.status = Completed;
        assert!(matches!(
            plan_deletion(&instruction),
            Err(CoreError::CompletedInstructionImmutable(id)) if id == instruction.id
        ));
    }
}
