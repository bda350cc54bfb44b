use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{div_or_zero, CalcError};

const LOWER_BOUND_RATIO: Decimal = Decimal::from_parts(40, 0, 0, false, 2);
const UPPER_BOUND_RATIO: Decimal = Decimal::from_parts(120, 0, 0, false, 2);
const K_LOW_BREAK: Decimal = Decimal::from_parts(60, 0, 0, false, 2);
const K_HIGH_BREAK: Decimal = Decimal::ONE;
const K_PLACES: u32 = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bid {
    pub name: String,
    pub amount: Decimal,
}

impl Bid {
    pub fn new(name: impl Into<String>, amount: Decimal) -> Self {
        Self {
            name: name.into(),
            amount,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BidStatus {
    /// Inside the valid range and at or above the threshold.
    Normal,
    /// Inside the valid range but below the threshold.
    Low,
    /// Outside `[40%, 120%]` of the estimated cost.
    Excluded,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BidResult {
    pub name: String,
    pub amount: Decimal,
    pub status: BidStatus,
    /// Discount against the estimated cost, in percent (tenzilat).
    pub discount: Decimal,
}

/// Intermediate values, in the order the calculation produces them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdSteps {
    pub lower_bound: Decimal,
    pub upper_bound: Decimal,
    pub valid_bids: Vec<Decimal>,
    pub tort1: Decimal,
    pub std_dev: Decimal,
    pub sigma_lower: Decimal,
    pub sigma_upper: Decimal,
    pub filtered_bids: Vec<Decimal>,
    pub tort2: Decimal,
    pub c: Decimal,
    /// Truncated to three decimal places.
    pub k: Decimal,
    pub n: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdResult {
    pub threshold_value: Decimal,
    pub bids: Vec<BidResult>,
    pub steps: ThresholdSteps,
    /// Name of the lowest normal bid. The first one wins a tie.
    pub winner: Option<String>,
}

/// Divisor of the standard deviation of the valid bids.
///
/// Published variants of the formula disagree; `Sample` (n - 1) is the default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StdDevDivisor {
    #[default]
    Sample,
    Population,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdOptions {
    pub std_dev_divisor: StdDevDivisor,
}

/// [`calculate_threshold_with`] using [`ThresholdOptions::default`].
pub fn calculate_threshold(
    estimated_cost: Decimal,
    n: Decimal,
    bids: &[Bid],
) -> Result<ThresholdResult, CalcError> {
    calculate_threshold_with(estimated_cost, n, bids, ThresholdOptions::default())
}

/// Compute the abnormally-low-bid threshold and classify `bids` against it.
///
/// 1. valid bids lie in `[0.40 * YM, 1.20 * YM]`
/// 2. `tort1` is their mean, `std_dev` their standard deviation about it
/// 3. `tort2` is the mean of the valid bids within `tort1 ± std_dev`
/// 4. `C = tort2 / YM`, and `K` follows from `C` piecewise, truncated to 3 places
/// 5. the threshold is `K * YM / N`
///
/// Empty sets and a zero `n` degrade to zero. `estimated_cost` must be positive.
pub fn calculate_threshold_with(
    estimated_cost: Decimal,
    n: Decimal,
    bids: &[Bid],
    options: ThresholdOptions,
) -> Result<ThresholdResult, CalcError> {
    if estimated_cost <= Decimal::ZERO {
        return Err(CalcError::NonPositiveEstimatedCost(estimated_cost));
    }

    let lower_bound = estimated_cost.saturating_mul(LOWER_BOUND_RATIO);
    let upper_bound = estimated_cost.saturating_mul(UPPER_BOUND_RATIO);
    let in_range = |amount: Decimal| amount >= lower_bound && amount <= upper_bound;

    let valid_bids: Vec<Decimal> = bids.iter().map(|b| b.amount).filter(|a| in_range(*a)).collect();
    let tort1 = mean(&valid_bids);
    let std_dev = std_dev(&valid_bids, tort1, options.std_dev_divisor);

    let sigma_lower = tort1.saturating_sub(std_dev);
    let sigma_upper = tort1.saturating_add(std_dev);
    let filtered_bids: Vec<Decimal> = valid_bids
        .iter()
        .copied()
        .filter(|a| *a >= sigma_lower && *a <= sigma_upper)
        .collect();
    let tort2 = mean(&filtered_bids);

    let c = div_or_zero(tort2, estimated_cost);
    let k = k_coefficient(c).round_dp_with_strategy(K_PLACES, RoundingStrategy::ToZero);
    let threshold_value = div_or_zero(k.saturating_mul(estimated_cost), n);

    let results: Vec<BidResult> = bids
        .iter()
        .map(|bid| {
            let status = if !in_range(bid.amount) {
                BidStatus::Excluded
            } else if bid.amount < threshold_value {
                BidStatus::Low
            } else {
                BidStatus::Normal
            };
            BidResult {
                name: bid.name.clone(),
                amount: bid.amount,
                status,
                discount: div_or_zero(estimated_cost.saturating_sub(bid.amount), estimated_cost)
                    .saturating_mul(Decimal::ONE_HUNDRED),
            }
        })
        .collect();

    let winner = results
        .iter()
        .filter(|b| b.status == BidStatus::Normal)
        .min_by(|a, b| a.amount.cmp(&b.amount))
        .map(|b| b.name.clone());

    log::debug!(
        "threshold: {} valid of {} bids, C={c}, K={k}, value={threshold_value}",
        valid_bids.len(),
        bids.len()
    );

    Ok(ThresholdResult {
        threshold_value,
        bids: results,
        winner,
        steps: ThresholdSteps {
            lower_bound,
            upper_bound,
            valid_bids,
            tort1,
            std_dev,
            sigma_lower,
            sigma_upper,
            filtered_bids,
            tort2,
            c,
            k,
            n,
        },
    })
}

fn mean(values: &[Decimal]) -> Decimal {
    let sum = values
        .iter()
        .fold(Decimal::ZERO, |acc, v| acc.saturating_add(*v));
    div_or_zero(sum, Decimal::from(values.len()))
}

fn std_dev(values: &[Decimal], mean: Decimal, divisor: StdDevDivisor) -> Decimal {
    let divisor = match divisor {
        StdDevDivisor::Sample if values.len() > 1 => values.len() - 1,
        StdDevDivisor::Population if !values.is_empty() => values.len(),
        _ => return Decimal::ZERO,
    };
    let sum_sq = values.iter().fold(Decimal::ZERO, |acc, v| {
        let d = v.saturating_sub(mean);
        acc.saturating_add(d.saturating_mul(d))
    });
    div_or_zero(sum_sq, Decimal::from(divisor))
        .sqrt()
        .unwrap_or(Decimal::ZERO)
}

fn k_coefficient(c: Decimal) -> Decimal {
    if c < K_LOW_BREAK {
        c
    } else if c <= K_HIGH_BREAK {
        // (3.2C - C^2 - 0.6) / (C + 1)
        let numerator = Decimal::new(32, 1) * c - c * c - Decimal::new(6, 1);
        div_or_zero(numerator, c + Decimal::ONE)
    } else {
        // (C^2 - 0.8C + 1.4) / (C + 1)
        let numerator = c * c - Decimal::new(8, 1) * c + Decimal::new(14, 1);
        div_or_zero(numerator, c + Decimal::ONE)
    }
}
