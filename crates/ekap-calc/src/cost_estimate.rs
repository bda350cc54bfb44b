use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A line of a unit-price cost estimate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostRow {
    pub row_number: usize,
    pub work_item_no: String,
    pub description: String,
    pub unit: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub total: Decimal,
}

impl CostRow {
    pub fn new(quantity: Decimal, unit_price: Decimal) -> Self {
        let mut row = Self {
            quantity,
            unit_price,
            ..Self::default()
        };
        row.recompute();
        row
    }

    pub fn recompute(&mut self) {
        self.total = self.quantity.saturating_mul(self.unit_price);
    }
}

/// Rows of a cost table that carry a displayed 1-based row number.
pub trait NumberedRow {
    fn set_row_number(&mut self, row_number: usize);
}

impl NumberedRow for CostRow {
    fn set_row_number(&mut self, row_number: usize) {
        self.row_number = row_number;
    }
}

/// Renumber rows 1..=n in their current order, after inserts, deletes or sorting.
pub fn renumber_rows<R: NumberedRow>(rows: &mut [R]) {
    for (pos, row) in rows.iter_mut().enumerate() {
        row.set_row_number(pos + 1);
    }
}

pub fn grand_total(rows: &[CostRow]) -> Decimal {
    rows.iter()
        .fold(Decimal::ZERO, |acc, row| acc.saturating_add(row.total))
}
