use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::cost_estimate::NumberedRow;
use crate::div_or_zero;

/// A line of a percentage-based cost estimate.
///
/// Only `quantity`, `unit_price` and the percentage bounds are inputs; [`Self::recompute`]
/// derives the rest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PercentageCostRow {
    pub row_number: usize,
    pub work_item_no: String,
    pub description: String,
    pub unit: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub total: Decimal,
    pub percentage_low: Decimal,
    pub percentage_high: Decimal,
    pub effective_percentage: Decimal,
    pub estimated_cost: Decimal,
}

impl PercentageCostRow {
    pub fn new(
        quantity: Decimal,
        unit_price: Decimal,
        percentage_low: Decimal,
        percentage_high: Decimal,
    ) -> Self {
        let mut row = Self {
            quantity,
            unit_price,
            percentage_low,
            percentage_high,
            ..Self::default()
        };
        row.recompute();
        row
    }

    pub fn recompute(&mut self) {
        self.total = self.quantity.saturating_mul(self.unit_price);
        self.effective_percentage = effective_percentage(self.percentage_low, self.percentage_high);
        self.estimated_cost = estimated_cost(self.total, self.effective_percentage);
    }
}

impl NumberedRow for PercentageCostRow {
    fn set_row_number(&mut self, row_number: usize) {
        self.row_number = row_number;
    }
}

/// Midpoint of the bounds when both are positive, otherwise whichever one is, otherwise zero.
pub fn effective_percentage(low: Decimal, high: Decimal) -> Decimal {
    match (low > Decimal::ZERO, high > Decimal::ZERO) {
        (true, true) => div_or_zero(low.saturating_add(high), Decimal::TWO),
        (true, false) => low,
        (false, true) => high,
        (false, false) => Decimal::ZERO,
    }
}

/// `total / percentage * 100`; zero when the percentage is zero.
pub fn estimated_cost(total: Decimal, effective_percentage: Decimal) -> Decimal {
    div_or_zero(total, effective_percentage).saturating_mul(Decimal::ONE_HUNDRED)
}

/// Percentage-weighted average of the rows' estimated costs, skipping rows without a
/// percentage. Zero when no row qualifies.
pub fn weighted_average(rows: &[PercentageCostRow]) -> Decimal {
    let (sum_product, sum_percentage) = rows
        .iter()
        .map(|row| {
            (
                row.estimated_cost,
                effective_percentage(row.percentage_low, row.percentage_high),
            )
        })
        .filter(|(_, pct)| !pct.is_zero())
        .fold((Decimal::ZERO, Decimal::ZERO), |(product, total), (cost, pct)| {
            (
                product.saturating_add(cost.saturating_mul(pct)),
                total.saturating_add(pct),
            )
        });
    div_or_zero(sum_product, sum_percentage)
}
