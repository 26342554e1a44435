//! Entry points used by manual allocation: crediting payees and booking debt.

use tracing::info;

use tto_domain::{Balance, Displayable, Money, Payee};

use crate::{
    balance_ledger::BalanceLedger,
    context::LedgerContext,
    error::CoreResult,
    storage::WriteBatch,
};

pub struct AllocationService;

impl AllocationService {
    /// Credits `amount` to `payee`, paying down outstanding debt first.
    /// The balance is opened on first use.
    pub fn allocate(ctx: &LedgerContext<'_>, payee: Payee, amount: Money) -> CoreResult<Balance> {
        let now = ctx.now();
        let (mut balance, is_new) = Self::load_or_open(ctx, payee)?;
        let remainder = BalanceLedger::offset_debt(&mut balance, amount, now)?;
        BalanceLedger::credit(&mut balance, remainder, now)?;

        let mut batch = WriteBatch::new();
        batch.upsert_balance(balance, is_new);
        ctx.storage.commit(batch)?;
        info!(%payee, %amount, credited = %remainder, "allocation credited");
        ctx.load_balance(&payee)
    }

    /// Records money the payee owes back to the office.
    pub fn record_debt(ctx: &LedgerContext<'_>, payee: Payee, amount: Money) -> CoreResult<Balance> {
        let (mut balance, is_new) = Self::load_or_open(ctx, payee)?;
        BalanceLedger::record_debt(&mut balance, amount, ctx.now())?;

        let mut batch = WriteBatch::new();
        batch.upsert_balance(balance, is_new);
        ctx.storage.commit(batch)?;
        let balance = ctx.load_balance(&payee)?;
        info!(%amount, balance = %balance.display_label(), "debt recorded");
        Ok(balance)
    }

    fn load_or_open(ctx: &LedgerContext<'_>, payee: Payee) -> CoreResult<(Balance, bool)> {
        Ok(match ctx.storage.balance(&payee)? {
            Some(balance) => (balance, false),
            None => (Balance::open(payee, ctx.now()), true),
        })
    }
}
