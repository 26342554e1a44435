//! Locale-aware rendering of money and percentages.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tto_domain::{Money, Rate};

use crate::money::{round_money, MONEY_SCALE};

/// ISO 4217 currency representation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct CurrencyCode(pub String);

impl CurrencyCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CurrencyCode {
    fn default() -> Self {
        Self::new("TRY")
    }
}

/// Separators used when rendering numbers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LocaleConfig {
    pub language_tag: String,
    pub decimal_separator: char,
    pub grouping_separator: char,
}

impl Default for LocaleConfig {
    fn default() -> Self {
        Self {
            language_tag: "en-US".into(),
            decimal_separator: '.',
            grouping_separator: ',',
        }
    }
}

impl LocaleConfig {
    /// Picks separators for a BCP 47 language tag; unknown tags fall back to `en-US`.
    pub fn from_tag(tag: &str) -> Self {
        let language = tag
            .split(['-', '_'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        let (decimal_separator, grouping_separator) = match language.as_str() {
            "tr" | "de" | "es" | "it" | "nl" | "pt" | "id" => (',', '.'),
            "fr" | "ru" | "pl" | "cs" | "sv" | "fi" | "nb" => (',', ' '),
            _ => ('.', ','),
        };
        Self {
            language_tag: tag.to_string(),
            decimal_separator,
            grouping_separator,
        }
    }
}

pub fn symbol_for(code: &str) -> String {
    match code {
        "TRY" => "₺".into(),
        "USD" => "$".into(),
        "EUR" => "€".into(),
        "GBP" => "£".into(),
        _ => code.into(),
    }
}

/// Renders a number with grouping and `precision` fractional digits.
pub fn format_number(locale: &LocaleConfig, value: Decimal, precision: u32) -> String {
    let rounded = value.round_dp(precision);
    let mut body = format!("{:.*}", precision as usize, rounded.abs());
    let (int_part, frac_part) = match body.find('.') {
        Some(pos) => {
            let frac = body.split_off(pos + 1);
            body.pop();
            (body, Some(frac))
        }
        None => (body, None),
    };
    let mut rendered = group_digits(&int_part, locale.grouping_separator);
    if let Some(frac) = frac_part {
        rendered.push(locale.decimal_separator);
        rendered.push_str(&frac);
    }
    if rounded < Decimal::ZERO {
        rendered.insert(0, '-');
    }
    rendered
}

fn group_digits(digits: &str, separator: char) -> String {
    let mut grouped = String::new();
    for (count, ch) in digits.chars().rev().enumerate() {
        if count != 0 && count % 3 == 0 {
            grouped.insert(0, separator);
        }
        grouped.insert(0, ch);
    }
    grouped
}

/// Renders money with its currency symbol, e.g. `₺42,372.88`.
pub fn format_money(amount: Money, code: &CurrencyCode, locale: &LocaleConfig) -> String {
    let body = format_number(locale, round_money(amount).abs(), MONEY_SCALE);
    let symbol = symbol_for(code.as_str());
    let sign = if amount < Decimal::ZERO { "-" } else { "" };
    if symbol == code.as_str() {
        format!("{sign}{body} {symbol}")
    } else {
        format!("{sign}{symbol}{body}")
    }
}

/// Renders a percentage without trailing zeros, e.g. `18%` or `12.5%`.
pub fn format_percent(rate: Rate) -> String {
    format!("{}%", rate.normalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn money_uses_grouping_and_symbol() {
        let locale = LocaleConfig::default();
        let code = CurrencyCode::default();
        assert_eq!(format_money(dec!(42372.88), &code, &locale), "₺42,372.88");
        assert_eq!(format_money(dec!(-1000), &code, &locale), "-₺1,000.00");
        assert_eq!(format_money(dec!(0.5), &code, &locale), "₺0.50");
    }

    #[test]
    fn turkish_locale_swaps_separators() {
        let locale = LocaleConfig::from_tag("tr-TR");
        let code = CurrencyCode::new("chf");
        assert_eq!(format_money(dec!(1234567.891), &code, &locale), "1.234.567,89 CHF");
    }

    #[test]
    fn percentages_drop_trailing_zeros() {
        assert_eq!(format_percent(dec!(18.00)), "18%");
        assert_eq!(format_percent(dec!(12.50)), "12.5%");
    }
}
