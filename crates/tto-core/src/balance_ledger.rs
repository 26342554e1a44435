//! The four legal balance mutations plus debt bookkeeping.
//!
//! Each operation validates everything it needs before touching the balance,
//! so a failed call leaves the account exactly as it was.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::debug;

use tto_domain::{Balance, Money};

use crate::{
    error::{CoreError, CoreResult},
    money::{ensure_amount, round_money},
};

/// Stateless balance mutations applied to a loaded [`Balance`] row.
pub struct BalanceLedger;

impl BalanceLedger {
    /// `available += amount`.
    pub fn credit(balance: &mut Balance, amount: Money, now: DateTime<Utc>) -> CoreResult<()> {
        let amount = round_money(ensure_amount(amount)?);
        balance.available_amount += amount;
        balance.last_updated = now;
        debug!(payee = %balance.payee, %amount, "credited balance");
        Ok(())
    }

    /// Moves `amount` from available into reserved.
    pub fn reserve(balance: &mut Balance, amount: Money, now: DateTime<Utc>) -> CoreResult<()> {
        let amount = round_money(ensure_amount(amount)?);
        if balance.available_amount < amount {
            return Err(CoreError::InsufficientFunds {
                payee: balance.payee,
                available: balance.available_amount,
                requested: amount,
            });
        }
        balance.available_amount -= amount;
        balance.reserved_amount += amount;
        balance.last_updated = now;
        debug!(payee = %balance.payee, %amount, "reserved funds");
        Ok(())
    }

    /// Pays out reserved funds. Reserved is floored at zero to absorb earlier
    /// rounding drift.
    pub fn finalize(balance: &mut Balance, amount: Money, now: DateTime<Utc>) -> CoreResult<()> {
        let amount = round_money(ensure_amount(amount)?);
        balance.reserved_amount = (balance.reserved_amount - amount).max(Decimal::ZERO);
        balance.total_payment += amount;
        balance.last_updated = now;
        debug!(payee = %balance.payee, %amount, "finalized payment");
        Ok(())
    }

    /// Returns reserved funds to available.
    pub fn release(balance: &mut Balance, amount: Money, now: DateTime<Utc>) -> CoreResult<()> {
        let amount = round_money(ensure_amount(amount)?);
        balance.reserved_amount = (balance.reserved_amount - amount).max(Decimal::ZERO);
        balance.available_amount += amount;
        balance.last_updated = now;
        debug!(payee = %balance.payee, %amount, "released reservation");
        Ok(())
    }

    /// `debt += amount`.
    pub fn record_debt(balance: &mut Balance, amount: Money, now: DateTime<Utc>) -> CoreResult<()> {
        let amount = round_money(ensure_amount(amount)?);
        balance.debt_amount += amount;
        balance.last_updated = now;
        Ok(())
    }

    /// Pays down debt from an incoming amount and returns what is left over.
    pub fn offset_debt(
        balance: &mut Balance,
        amount: Money,
        now: DateTime<Utc>,
    ) -> CoreResult<Money> {
        let amount = round_money(ensure_amount(amount)?);
        let applied = amount.min(balance.debt_amount);
        if applied.is_zero() {
            return Ok(amount);
        }
        balance.debt_amount -= applied;
        balance.last_updated = now;
        debug!(payee = %balance.payee, %applied, "offset debt");
        Ok(amount - applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tto_domain::Payee;
    use uuid::Uuid;

    fn funded(available: Money) -> Balance {
        let mut balance = Balance::open(Payee::User(Uuid::new_v4()), Utc::now());
        balance.available_amount = available;
        balance
    }

    fn assert_non_negative(balance: &Balance) {
        assert!(balance.available_amount >= Decimal::ZERO);
        assert!(balance.reserved_amount >= Decimal::ZERO);
        assert!(balance.debt_amount >= Decimal::ZERO);
        assert!(balance.total_payment >= Decimal::ZERO);
    }

    #[test]
    fn reserve_then_finalize_conserves_held_funds() {
        let now = Utc::now();
        let mut balance = funded(dec!(1500));
        let before = balance.held_amount();

        BalanceLedger::reserve(&mut balance, dec!(600), now).unwrap();
        assert_eq!(balance.held_amount(), before);
        BalanceLedger::finalize(&mut balance, dec!(600), now).unwrap();

        assert_eq!(balance.available_amount, dec!(900));
        assert_eq!(balance.reserved_amount, dec!(0));
        assert_eq!(balance.total_payment, dec!(600));
    }

    #[test]
    fn reserve_then_release_conserves_available_plus_reserved() {
        let now = Utc::now();
        let mut balance = funded(dec!(1500));
        let before = balance.held_amount();

        BalanceLedger::reserve(&mut balance, dec!(600), now).unwrap();
        BalanceLedger::release(&mut balance, dec!(600), now).unwrap();

        assert_eq!(balance.held_amount(), before);
        assert_eq!(balance.available_amount, dec!(1500));
        assert_eq!(balance.reserved_amount, dec!(0));
    }

    #[test]
    fn failed_reserve_leaves_balance_untouched() {
        let mut balance = funded(dec!(5000));
        let snapshot = balance.clone();
        let err = BalanceLedger::reserve(&mut balance, dec!(10000), Utc::now()).unwrap_err();
        assert!(matches!(
            err,
            CoreError::InsufficientFunds { available, requested, .. }
                if available == dec!(5000) && requested == dec!(10000)
        ));
        assert_eq!(balance, snapshot);
    }

    #[test]
    fn finalize_and_release_floor_reserved_at_zero() {
        let now = Utc::now();
        let mut balance = funded(dec!(0));
        balance.reserved_amount = dec!(99.99);
        BalanceLedger::finalize(&mut balance, dec!(100), now).unwrap();
        assert_eq!(balance.reserved_amount, dec!(0));

        balance.reserved_amount = dec!(0.01);
        BalanceLedger::release(&mut balance, dec!(0.02), now).unwrap();
        assert_eq!(balance.reserved_amount, dec!(0));
        assert_non_negative(&balance);
    }

    #[test]
    fn negative_amounts_are_rejected_without_mutation() {
        let mut balance = funded(dec!(10));
        let snapshot = balance.clone();
        for result in [
            BalanceLedger::credit(&mut balance, dec!(-1), Utc::now()),
            BalanceLedger::reserve(&mut balance, dec!(-1), Utc::now()),
            BalanceLedger::finalize(&mut balance, dec!(-1), Utc::now()),
            BalanceLedger::release(&mut balance, dec!(-1), Utc::now()),
        ] {
            assert!(matches!(result, Err(CoreError::InvalidAmount(_))));
        }
        assert_eq!(balance, snapshot);
    }

    #[test]
    fn debt_is_offset_before_credit() {
        let now = Utc::now();
        let mut balance = funded(dec!(0));
        BalanceLedger::record_debt(&mut balance, dec!(300), now).unwrap();

        let rest = BalanceLedger::offset_debt(&mut balance, dec!(200), now).unwrap();
        assert_eq!(rest, dec!(0));
        assert_eq!(balance.debt_amount, dec!(100));

        let rest = BalanceLedger::offset_debt(&mut balance, dec!(250), now).unwrap();
        assert_eq!(rest, dec!(150));
        assert_eq!(balance.debt_amount, dec!(0));
        assert_non_negative(&balance);
    }

    #[test]
    fn mixed_sequences_never_go_negative() {
        let now = Utc::now();
        let mut balance = funded(dec!(0));
        let steps: [(u8, Money); 12] = [
            (0, dec!(100.10)),
            (1, dec!(40.05)),
            (2, dec!(40.05)),
            (1, dec!(60.05)),
            (3, dec!(60.05)),
            (1, dec!(200)),
            (0, dec!(0.01)),
            (1, dec!(60.06)),
            (3, dec!(70)),
            (2, dec!(1000)),
            (4, dec!(5)),
            (5, dec!(7)),
        ];
        for (op, amount) in steps {
            let _ = match op {
                0 => BalanceLedger::credit(&mut balance, amount, now),
                1 => BalanceLedger::reserve(&mut balance, amount, now),
                2 => BalanceLedger::finalize(&mut balance, amount, now),
                3 => BalanceLedger::release(&mut balance, amount, now),
                4 => BalanceLedger::record_debt(&mut balance, amount, now),
                _ => BalanceLedger::offset_debt(&mut balance, amount, now).map(|_| ()),
            };
            assert_non_negative(&balance);
        }
    }
}
