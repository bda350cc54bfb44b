use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{div_or_zero, CalcError};

/// The fixed `B` multiplier of the price-difference formula.
pub const PRICE_DIFF_B: Decimal = Decimal::from_parts(90, 0, 0, false, 2);

/// Base (tender month) and current (payment month) values of one index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexPair {
    pub base: Decimal,
    pub current: Decimal,
}

impl IndexPair {
    pub fn new(base: Decimal, current: Decimal) -> Self {
        Self { base, current }
    }

    /// `current / base`, or `None` when the base index is zero.
    fn ratio(&self) -> Option<Decimal> {
        if self.base.is_zero() {
            None
        } else {
            Some(div_or_zero(self.current, self.base))
        }
    }
}

/// Weights of the index groups: labor `a`, materials `b1..b5`, machinery `c`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coefficients {
    pub a: Decimal,
    pub b: [Decimal; 5],
    pub c: Decimal,
}

impl Coefficients {
    pub fn sum(&self) -> Decimal {
        self.b
            .iter()
            .fold(self.a.saturating_add(self.c), |acc, v| acc.saturating_add(*v))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceIndices {
    pub labor: IndexPair,
    pub materials: [IndexPair; 5],
    pub machinery: IndexPair,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceDiffInput {
    /// Payment amount (An).
    pub amount: Decimal,
    pub coefficients: Coefficients,
    pub indices: PriceIndices,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceDiffResult {
    pub pn: Decimal,
    /// Positive: owed to the contractor. Negative: deducted from the contractor.
    pub f: Decimal,
    pub b: Decimal,
}

/// The coefficients must add up to exactly one.
pub fn validate_coefficients(coefficients: &Coefficients) -> Result<(), CalcError> {
    let sum = coefficients.sum();
    if sum == Decimal::ONE {
        Ok(())
    } else {
        Err(CalcError::CoefficientSum { sum })
    }
}

/// `F = An * B * (Pn - 1)` where `Pn` is the coefficient-weighted sum of index ratios.
///
/// Groups whose base index is zero contribute nothing to `Pn`.
pub fn calculate_price_diff(input: &PriceDiffInput) -> Result<PriceDiffResult, CalcError> {
    let PriceDiffInput {
        amount,
        coefficients,
        indices,
    } = input;
    validate_coefficients(coefficients)?;

    let weighted = std::iter::once((coefficients.a, indices.labor))
        .chain(coefficients.b.iter().copied().zip(indices.materials))
        .chain(std::iter::once((coefficients.c, indices.machinery)));

    let pn = weighted
        .filter_map(|(weight, pair)| pair.ratio().map(|ratio| weight.saturating_mul(ratio)))
        .fold(Decimal::ZERO, Decimal::saturating_add);

    let f = amount
        .saturating_mul(PRICE_DIFF_B)
        .saturating_mul(pn - Decimal::ONE);

    log::debug!("price difference: Pn={pn}, F={f}");
    Ok(PriceDiffResult {
        pn,
        f,
        b: PRICE_DIFF_B,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use rust_decimal_macros::dec;

    #[test]
    fn coefficient_sum_must_be_exact() {
        let mut coefficients = Coefficients {
            a: dec!(0.25),
            b: [dec!(0.15); 5],
            c: dec!(0.00),
        };
        assert_eq!(validate_coefficients(&coefficients), Ok(()));
        coefficients.c = dec!(0.001);
        assert_eq!(
            validate_coefficients(&coefficients),
            Err(CalcError::CoefficientSum { sum: dec!(1.001) })
        );
    }

    #[test]
    fn zero_base_contributes_nothing() {
        assert_eq!(IndexPair::new(dec!(0), dec!(5)).ratio(), None);
        assert_eq!(IndexPair::new(dec!(2), dec!(5)).ratio(), Some(dec!(2.5)));
    }
}
