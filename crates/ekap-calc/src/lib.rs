//! Regulatory tender calculations on exact decimals.
//!
//! - [`calculate_threshold`]: the abnormally-low-bid threshold (sınır değer) and bid
//!   classification
//! - [`calculate_price_diff`]: the price-index payment adjustment (fiyat farkı)
//! - [`PercentageCostRow`] / [`weighted_average`]: cost estimation from completion percentages
//! - [`CostRow`] / [`grand_total`]: unit-price cost estimates
//!
//! Every function is pure. Divisions are zero-guarded and degrade to zero; the only hard
//! failures are the ones listed in [`CalcError`].

mod cost_estimate;
mod error;
mod percentage;
mod price_diff;
mod threshold;

pub use crate::cost_estimate::{grand_total, renumber_rows, CostRow, NumberedRow};
pub use crate::error::CalcError;
pub use crate::percentage::{
    effective_percentage, estimated_cost, weighted_average, PercentageCostRow,
};
pub use crate::price_diff::{
    calculate_price_diff, validate_coefficients, Coefficients, IndexPair, PriceDiffInput,
    PriceDiffResult, PriceIndices, PRICE_DIFF_B,
};
pub use crate::threshold::{
    calculate_threshold, calculate_threshold_with, Bid, BidResult, BidStatus, StdDevDivisor,
    ThresholdOptions, ThresholdResult, ThresholdSteps,
};

use rust_decimal::Decimal;

/// `numerator / denominator`, or zero when the divisor is zero or the quotient overflows.
pub(crate) fn div_or_zero(numerator: Decimal, denominator: Decimal) -> Decimal {
    numerator.checked_div(denominator).unwrap_or(Decimal::ZERO)
}
