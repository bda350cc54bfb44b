use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CalcError {
    #[error("price-index coefficients must sum to exactly 1 (got {sum})")]
    CoefficientSum { sum: Decimal },
    #[error("estimated cost must be greater than zero (got {0})")]
    NonPositiveEstimatedCost(Decimal),
}
