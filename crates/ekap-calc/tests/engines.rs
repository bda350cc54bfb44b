use ekap_calc::{
    calculate_price_diff, calculate_threshold, calculate_threshold_with, renumber_rows,
    weighted_average, Bid, BidStatus, CalcError, Coefficients, IndexPair, PercentageCostRow,
    PriceDiffInput, PriceIndices, StdDevDivisor, ThresholdOptions, PRICE_DIFF_B,
};
use pretty_assertions::{assert_eq, assert_ne};
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn sample_bids() -> Vec<Bid> {
    vec![
        Bid::new("Alfa İnşaat", dec!(900000)),
        Bid::new("Beta Yapı", dec!(950000)),
        Bid::new("Gama Ltd.", dec!(1100000)),
        Bid::new("Delta A.Ş.", dec!(1300000)),
        Bid::new("Epsilon", dec!(300000)),
    ]
}

#[test]
fn threshold_worked_example() {
    let result = calculate_threshold(dec!(1000000), dec!(1.00), &sample_bids()).unwrap();
    let steps = &result.steps;

    assert_eq!(steps.lower_bound, dec!(400000));
    assert_eq!(steps.upper_bound, dec!(1200000));
    assert_eq!(steps.valid_bids, vec![dec!(900000), dec!(950000), dec!(1100000)]);
    assert_eq!(steps.tort1.round_dp(2), dec!(983333.33));
    assert_eq!(steps.std_dev.round_dp(0), dec!(104083));
    assert_eq!(steps.filtered_bids, vec![dec!(900000), dec!(950000)]);
    assert_eq!(steps.tort2, dec!(925000));
    assert_eq!(steps.c, dec!(0.925));
    assert_eq!(steps.k, dec!(0.781));
    assert_eq!(result.threshold_value, dec!(781000));

    let statuses: Vec<_> = result.bids.iter().map(|b| b.status).collect();
    assert_eq!(
        statuses,
        vec![
            BidStatus::Normal,
            BidStatus::Normal,
            BidStatus::Normal,
            BidStatus::Excluded,
            BidStatus::Excluded,
        ]
    );
    assert_eq!(result.winner.as_deref(), Some("Alfa İnşaat"));
    assert_eq!(result.bids[0].discount, dec!(10));
    assert_eq!(result.bids[3].discount, dec!(-30));
}

#[test]
fn excluded_bids_never_move_the_means() {
    let base = calculate_threshold(dec!(1000000), dec!(1), &sample_bids()[..3]).unwrap();
    let mut bids = sample_bids();
    bids.push(Bid::new("Zeta", dec!(5)));
    bids.push(Bid::new("Eta", dec!(99999999)));
    let noisy = calculate_threshold(dec!(1000000), dec!(1), &bids).unwrap();

    assert_eq!(noisy.steps.tort1, base.steps.tort1);
    assert_eq!(noisy.steps.tort2, base.steps.tort2);
    assert_eq!(noisy.threshold_value, base.threshold_value);
}

#[test]
fn bids_below_threshold_are_low() {
    let bids = vec![
        Bid::new("a", dec!(450000)),
        Bid::new("b", dec!(1000000)),
        Bid::new("c", dec!(1050000)),
        Bid::new("d", dec!(1020000)),
    ];
    let result = calculate_threshold(dec!(1000000), dec!(1), &bids).unwrap();
    assert!(result.threshold_value > dec!(450000));
    assert_eq!(result.bids[0].status, BidStatus::Low);
    assert_eq!(result.winner.as_deref(), Some("b"));
}

#[test]
fn no_normal_bid_means_no_winner() {
    let bids = vec![Bid::new("a", dec!(100)), Bid::new("b", dec!(5000000))];
    let result = calculate_threshold(dec!(1000000), dec!(1), &bids).unwrap();
    assert_eq!(result.winner, None);
    assert_eq!(result.steps.tort1, dec!(0));
    assert_eq!(result.threshold_value, dec!(0));
}

#[test]
fn zero_n_degrades_to_zero_threshold() {
    let result = calculate_threshold(dec!(1000000), dec!(0), &sample_bids()).unwrap();
    assert_eq!(result.threshold_value, dec!(0));
}

#[test]
fn non_positive_estimated_cost_is_rejected() {
    assert_eq!(
        calculate_threshold(dec!(0), dec!(1), &sample_bids()).unwrap_err(),
        CalcError::NonPositiveEstimatedCost(dec!(0))
    );
}

#[test]
fn huge_bids_saturate_instead_of_overflowing() {
    let bids = [Bid::new("x", dec!(10000000000000000000000000))];
    let result = calculate_threshold(dec!(0.01), dec!(1), &bids).unwrap();
    assert_eq!(result.bids[0].status, BidStatus::Excluded);
    assert_eq!(result.bids[0].discount, Decimal::MIN);
    assert_eq!(result.threshold_value, dec!(0));
}

#[test]
fn k_is_truncated_not_rounded() {
    // C = 0.9994 gives K = 0.79988, which would round to 0.800.
    let bids = [Bid::new("a", dec!(999400))];
    let result = calculate_threshold(dec!(1000000), dec!(1), &bids).unwrap();
    assert_eq!(result.steps.c, dec!(0.9994));
    assert_eq!(result.steps.k, dec!(0.799));
    assert_eq!(result.threshold_value, dec!(799000));
}

#[test]
fn range_bounds_are_inclusive() {
    let bids = vec![
        Bid::new("lower", dec!(400000)),
        Bid::new("upper", dec!(1200000)),
        Bid::new("below", dec!(399999.99)),
        Bid::new("above", dec!(1200000.01)),
    ];
    let result = calculate_threshold(dec!(1000000), dec!(1), &bids).unwrap();
    assert_eq!(result.steps.valid_bids, vec![dec!(400000), dec!(1200000)]);
    assert_ne!(result.bids[0].status, BidStatus::Excluded);
    assert_ne!(result.bids[1].status, BidStatus::Excluded);
    assert_eq!(result.bids[2].status, BidStatus::Excluded);
    assert_eq!(result.bids[3].status, BidStatus::Excluded);
}

#[test]
fn population_divisor_is_selectable() {
    let options = ThresholdOptions {
        std_dev_divisor: StdDevDivisor::Population,
    };
    let sample = calculate_threshold(dec!(1000000), dec!(1), &sample_bids()).unwrap();
    let population =
        calculate_threshold_with(dec!(1000000), dec!(1), &sample_bids(), options).unwrap();
    assert!(population.steps.std_dev < sample.steps.std_dev);
    assert_eq!(population.steps.std_dev.round_dp(0), dec!(84984));
}

fn coefficients() -> Coefficients {
    Coefficients {
        a: dec!(0.30),
        b: [dec!(0.10); 5],
        c: dec!(0.20),
    }
}

fn flat_indices(value: Decimal) -> PriceIndices {
    PriceIndices {
        labor: IndexPair::new(value, value),
        materials: [IndexPair::new(value, value); 5],
        machinery: IndexPair::new(value, value),
    }
}

#[test]
fn unchanged_indices_give_no_adjustment() {
    let input = PriceDiffInput {
        amount: dec!(2500000),
        coefficients: coefficients(),
        indices: flat_indices(dec!(1234.56)),
    };
    let result = calculate_price_diff(&input).unwrap();
    assert_eq!(result.pn, dec!(1));
    assert_eq!(result.f, dec!(0));
    assert_eq!(result.b, PRICE_DIFF_B);
}

#[test]
fn rising_and_falling_indices() {
    let mut indices = flat_indices(dec!(100));
    indices.labor.current = dec!(120);
    let rising = calculate_price_diff(&PriceDiffInput {
        amount: dec!(1000000),
        coefficients: coefficients(),
        indices,
    })
    .unwrap();
    // Pn = 0.30 * 1.2 + 0.70 = 1.06
    assert_eq!(rising.pn, dec!(1.06));
    assert_eq!(rising.f, dec!(54000));

    indices.labor.current = dec!(80);
    let falling = calculate_price_diff(&PriceDiffInput {
        amount: dec!(1000000),
        coefficients: coefficients(),
        indices,
    })
    .unwrap();
    assert_eq!(falling.f, dec!(-54000));
}

#[test]
fn zero_base_index_contributes_nothing() {
    let mut indices = flat_indices(dec!(50));
    indices.machinery = IndexPair::new(dec!(0), dec!(75));
    let result = calculate_price_diff(&PriceDiffInput {
        amount: dec!(100),
        coefficients: coefficients(),
        indices,
    })
    .unwrap();
    assert_eq!(result.pn, dec!(0.80));
    assert_eq!(result.f, dec!(-18));
}

#[test]
fn bad_coefficients_block_the_calculation() {
    let mut coefficients = coefficients();
    coefficients.a = dec!(0.31);
    let err = calculate_price_diff(&PriceDiffInput {
        amount: dec!(100),
        coefficients,
        indices: flat_indices(dec!(1)),
    })
    .unwrap_err();
    assert_eq!(err, CalcError::CoefficientSum { sum: dec!(1.01) });
}

#[test]
fn percentage_worked_example() {
    let row = PercentageCostRow::new(dec!(10), dec!(100), dec!(20), dec!(0));
    assert_eq!(row.total, dec!(1000));
    assert_eq!(row.effective_percentage, dec!(20));
    assert_eq!(row.estimated_cost, dec!(5000));
    assert_eq!(weighted_average(&[row]), dec!(5000));
}

#[test]
fn percentage_rows_renumber() {
    let mut rows = vec![
        PercentageCostRow::new(dec!(1), dec!(1), dec!(1), dec!(0)),
        PercentageCostRow::new(dec!(2), dec!(2), dec!(2), dec!(0)),
    ];
    rows.reverse();
    renumber_rows(&mut rows);
    assert_eq!(rows[0].row_number, 1);
    assert_eq!(rows[0].quantity, dec!(2));
    assert_eq!(rows[1].row_number, 2);
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]

    #[test]
    fn threshold_invariants(amounts in prop::collection::vec(1i64..3_000_000, 0..20)) {
        let bids: Vec<Bid> = amounts
            .iter()
            .enumerate()
            .map(|(i, a)| Bid::new(format!("bid-{i}"), Decimal::from(*a)))
            .collect();
        let result = calculate_threshold(dec!(1000000), dec!(1), &bids).unwrap();

        prop_assert_eq!(result.bids.len(), bids.len());
        for bid in &result.bids {
            let in_range = bid.amount >= dec!(400000) && bid.amount <= dec!(1200000);
            prop_assert_eq!(bid.status == BidStatus::Excluded, !in_range);
        }
        if let Some(winner) = &result.winner {
            let winning = result.bids.iter().find(|b| &b.name == winner).unwrap();
            prop_assert_eq!(winning.status, BidStatus::Normal);
            for other in result.bids.iter().filter(|b| b.status == BidStatus::Normal) {
                prop_assert!(winning.amount <= other.amount);
            }
        }
        prop_assert!(result.steps.k.scale() <= 3);
    }
}
