use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::domain::quote::LineItem;

pub const MONEY_SCALE: u32 = 2;

/// Where the quotation total is rounded to two fraction digits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TotalRounding {
    /// Sum full-precision line totals, then round once.
    #[default]
    WholeSum,
    /// Round every line total before summing.
    PerLine,
}

impl std::str::FromStr for TotalRounding {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "whole_sum" => Ok(Self::WholeSum),
            "per_line" => Ok(Self::PerLine),
            other => Err(format!("unsupported rounding `{other}` (expected whole_sum|per_line)")),
        }
    }
}

pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Renders an amount with exactly two fraction digits.
pub fn format_money(amount: Decimal) -> String {
    let mut rounded = round_money(amount);
    rounded.rescale(MONEY_SCALE);
    rounded.to_string()
}

/// `None` when the product does not fit in a `Decimal`.
pub fn line_total(unit_price: Decimal, quantity: u32) -> Option<Decimal> {
    unit_price.checked_mul(Decimal::from(quantity))
}

/// `None` when the sum does not fit in a `Decimal`.
pub fn quotation_total(lines: &[LineItem], rounding: TotalRounding) -> Option<Decimal> {
    match rounding {
        TotalRounding::WholeSum => lines
            .iter()
            .try_fold(Decimal::ZERO, |sum, line| sum.checked_add(line.line_total))
            .map(round_money),
        TotalRounding::PerLine => lines
            .iter()
            .try_fold(Decimal::ZERO, |sum, line| sum.checked_add(round_money(line.line_total))),
    }
}
