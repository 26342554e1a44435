//! Decimal money arithmetic: VAT extraction, commission, withholding, and shares.
//!
//! Every monetary result is rounded to two fractional digits with banker's
//! rounding. Inputs are validated up front so a bad amount or rate never
//! produces a partially computed breakdown.

use rust_decimal::{Decimal, RoundingStrategy};

use tto_domain::{Money, Rate};

use crate::error::{CoreError, CoreResult};

/// Fractional digits carried by every monetary value.
pub const MONEY_SCALE: u32 = 2;

/// Tolerance used when comparing share totals against 100%.
pub const SHARE_EPSILON: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Rounds to cents using round-half-to-even.
pub fn round_money(value: Decimal) -> Money {
    value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointNearestEven)
}

/// Rejects negative amounts.
pub fn ensure_amount(amount: Decimal) -> CoreResult<Money> {
    if amount < Decimal::ZERO {
        return Err(CoreError::InvalidAmount(format!(
            "{amount} is negative"
        )));
    }
    Ok(amount)
}

/// Rejects zero and negative amounts.
pub fn ensure_positive(amount: Decimal) -> CoreResult<Money> {
    if amount <= Decimal::ZERO {
        return Err(CoreError::InvalidAmount(format!(
            "{amount} must be greater than zero"
        )));
    }
    Ok(amount)
}

/// Rejects percentages outside `[0, 100]`.
pub fn ensure_rate(rate: Decimal) -> CoreResult<Rate> {
    if rate < Decimal::ZERO || rate > HUNDRED {
        return Err(CoreError::InvalidRate(rate));
    }
    Ok(rate)
}

/// Converts a float received at an outer boundary into money.
pub fn to_money(value: f64) -> CoreResult<Money> {
    if !value.is_finite() {
        return Err(CoreError::InvalidAmount(format!("{value} is not finite")));
    }
    let amount = Decimal::try_from(value)
        .map_err(|err| CoreError::InvalidAmount(format!("{value}: {err}")))?;
    ensure_amount(amount).map(round_money)
}

/// Converts a float percentage received at an outer boundary into a rate.
pub fn to_rate(value: f64) -> CoreResult<Rate> {
    if !value.is_finite() {
        return Err(CoreError::InvalidAmount(format!("{value} is not finite")));
    }
    let rate = Decimal::try_from(value)
        .map_err(|err| CoreError::InvalidAmount(format!("{value}: {err}")))?;
    ensure_rate(rate)
}

/// VAT contained in a VAT-inclusive gross amount: `gross × rate / (100 + rate)`.
pub fn vat_from_gross(gross: Money, vat_rate: Rate) -> CoreResult<Money> {
    ensure_amount(gross)?;
    ensure_rate(vat_rate)?;
    if vat_rate.is_zero() {
        return Ok(Decimal::ZERO);
    }
    let vat = mul(gross, vat_rate)?
        .checked_div(HUNDRED + vat_rate)
        .ok_or_else(overflow)?;
    Ok(round_money(vat))
}

/// Gross minus VAT.
pub fn net_after_vat(gross: Money, vat: Money) -> CoreResult<Money> {
    ensure_amount(gross)?;
    ensure_amount(vat)?;
    if vat > gross {
        return Err(CoreError::InvalidAmount(format!(
            "VAT {vat} exceeds gross amount {gross}"
        )));
    }
    Ok(round_money(gross - vat))
}

/// Office commission on a net amount.
pub fn commission(net: Money, commission_rate: Rate) -> CoreResult<Money> {
    ensure_amount(net)?;
    ensure_rate(commission_rate)?;
    let value = mul(net, commission_rate)?
        .checked_div(HUNDRED)
        .ok_or_else(overflow)?;
    Ok(round_money(value))
}

/// Net minus commission: the pool available to allocate to payees.
pub fn distributable(net: Money, commission: Money) -> CoreResult<Money> {
    ensure_amount(net)?;
    ensure_amount(commission)?;
    if commission > net {
        return Err(CoreError::InvalidAmount(format!(
            "commission {commission} exceeds net amount {net}"
        )));
    }
    Ok(round_money(net - commission))
}

/// Withholding tax levied on the VAT portion of a gross amount.
pub fn withholding(gross: Money, vat_rate: Rate, withholding_rate: Rate) -> CoreResult<Money> {
    ensure_rate(withholding_rate)?;
    let vat = vat_from_gross(gross, vat_rate)?;
    let value = mul(vat, withholding_rate)?
        .checked_div(HUNDRED)
        .ok_or_else(overflow)?;
    Ok(round_money(value))
}

/// Returns `true` when the shares are non-negative and add up to 100% (±0.01).
pub fn validate_shares(shares: &[Rate]) -> bool {
    if shares.iter().any(|share| *share < Decimal::ZERO) {
        return false;
    }
    let total = shares
        .iter()
        .try_fold(Decimal::ZERO, |acc, share| acc.checked_add(*share));
    match total {
        Some(total) => (total - HUNDRED).abs() <= SHARE_EPSILON,
        None => false,
    }
}

/// `amount × part / whole`, rounded; zero when `whole` is zero.
pub fn proportional(amount: Money, part: Money, whole: Money) -> CoreResult<Money> {
    if whole.is_zero() {
        return Ok(Decimal::ZERO);
    }
    let value = mul(amount, part)?.checked_div(whole).ok_or_else(overflow)?;
    Ok(round_money(value))
}

/// Complete derivation of an income's amounts from its gross and rates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IncomeBreakdown {
    pub gross: Money,
    pub vat: Money,
    pub net: Money,
    pub withholding: Option<Money>,
    pub commission: Money,
    pub distributable: Money,
}

impl IncomeBreakdown {
    /// Derives every amount of an income. `commission_rate` of `None` means the
    /// office takes no cut.
    pub fn compute(
        gross: Money,
        vat_rate: Rate,
        withholding_rate: Option<Rate>,
        commission_rate: Option<Rate>,
    ) -> CoreResult<Self> {
        let gross = ensure_positive(round_money(gross))?;
        let vat = vat_from_gross(gross, vat_rate)?;
        let net = net_after_vat(gross, vat)?;
        let withholding = withholding_rate
            .map(|rate| withholding(gross, vat_rate, rate))
            .transpose()?;
        let commission = match commission_rate {
            Some(rate) => commission(net, rate)?,
            None => Decimal::ZERO,
        };
        let distributable = distributable(net, commission)?;
        Ok(Self {
            gross,
            vat,
            net,
            withholding,
            commission,
            distributable,
        })
    }
}

fn mul(a: Decimal, b: Decimal) -> CoreResult<Decimal> {
    a.checked_mul(b).ok_or_else(overflow)
}

fn overflow() -> CoreError {
    CoreError::InvalidAmount("arithmetic overflow".into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn vat_is_extracted_from_inclusive_gross() {
        assert_eq!(vat_from_gross(dec!(50000), dec!(18)).unwrap(), dec!(7627.12));
        assert_eq!(vat_from_gross(dec!(118), dec!(18)).unwrap(), dec!(18.00));
        assert_eq!(vat_from_gross(dec!(1000), dec!(0)).unwrap(), dec!(0));
    }

    #[test]
    fn net_and_vat_add_back_to_gross() {
        let grosses = [dec!(0), dec!(0.01), dec!(99.99), dec!(1234.56), dec!(50000), dec!(987654.32)];
        let rates = [dec!(0), dec!(1), dec!(8), dec!(18), dec!(20), dec!(33.3), dec!(100)];
        for gross in grosses {
            for rate in rates {
                let vat = vat_from_gross(gross, rate).unwrap();
                let net = net_after_vat(gross, vat).unwrap();
                assert!(
                    (net + vat - gross).abs() <= dec!(0.01),
                    "gross {gross} rate {rate}: net {net} vat {vat}"
                );
            }
        }
    }

    #[test]
    fn commission_and_distributable() {
        let net = dec!(42372.88);
        let cut = commission(net, dec!(10)).unwrap();
        assert_eq!(cut, dec!(4237.29));
        assert_eq!(distributable(net, cut).unwrap(), dec!(38135.59));
    }

    #[test]
    fn withholding_applies_to_vat_portion() {
        // VAT of 1180 at 18% is 180; 50% of it is withheld.
        assert_eq!(withholding(dec!(1180), dec!(18), dec!(50)).unwrap(), dec!(90.00));
    }

    #[test]
    fn rounding_is_half_to_even() {
        assert_eq!(round_money(dec!(0.125)), dec!(0.12));
        assert_eq!(round_money(dec!(0.135)), dec!(0.14));
    }

    #[test]
    fn rejects_negative_amounts_and_out_of_range_rates() {
        assert!(matches!(
            vat_from_gross(dec!(-1), dec!(18)),
            Err(CoreError::InvalidAmount(_))
        ));
        assert!(matches!(
            vat_from_gross(dec!(100), dec!(101)),
            Err(CoreError::InvalidRate(_))
        ));
        assert!(matches!(
            commission(dec!(100), dec!(-0.5)),
            Err(CoreError::InvalidRate(_))
        ));
        assert!(matches!(to_money(f64::NAN), Err(CoreError::InvalidAmount(_))));
        assert!(matches!(
            to_money(f64::INFINITY),
            Err(CoreError::InvalidAmount(_))
        ));
        assert_eq!(to_money(10.005).unwrap(), dec!(10.00));
    }

    #[test]
    fn shares_must_total_one_hundred() {
        assert!(validate_shares(&[dec!(50), dec!(30), dec!(20)]));
        assert!(validate_shares(&[dec!(33.33), dec!(33.33), dec!(33.34)]));
        assert!(validate_shares(&[dec!(33.33), dec!(33.33), dec!(33.33)]));
        assert!(!validate_shares(&[dec!(50), dec!(49)]));
        assert!(!validate_shares(&[dec!(120), dec!(-20)]));
        assert!(!validate_shares(&[]));
    }

    #[test]
    fn sub_cent_gross_is_rejected_after_rounding() {
        assert!(matches!(
            IncomeBreakdown::compute(dec!(0.004), dec!(18), None, None),
            Err(CoreError::InvalidAmount(_))
        ));
    }

    #[test]
    fn breakdown_without_commission_distributes_full_net() {
        let breakdown = IncomeBreakdown::compute(dec!(50000), dec!(18), None, None).unwrap();
        assert_eq!(breakdown.vat, dec!(7627.12));
        assert_eq!(breakdown.net, dec!(42372.88));
        assert_eq!(breakdown.commission, dec!(0));
        assert_eq!(breakdown.distributable, dec!(42372.88));
        assert_eq!(breakdown.withholding, None);
    }
}
