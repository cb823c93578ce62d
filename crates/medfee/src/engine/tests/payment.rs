use crate::engine::payment::{calculate, round_amount};
use crate::engine::rules::{BandRate, CumulativeBand, PaymentModel, PercentageBand, ValueBand};

fn two_brackets() -> Vec<PercentageBand> {
    vec![
        PercentageBand {
            from: 0.0,
            to: Some(500_000.0),
            percentage: 10.0,
        },
        PercentageBand {
            from: 500_000.0,
            to: None,
            percentage: 20.0,
        },
    ]
}

#[test]
fn percentage_rounds_half_away_from_zero() {
    let model = PaymentModel::Percentage { percentage: 33.33 };
    assert_eq!(calculate(&model, 100_000.0, None).amount, 33_330.0);

    let half = PaymentModel::Percentage { percentage: 50.0 };
    assert_eq!(calculate(&half, 1.0, None).amount, 1.0);
    assert_eq!(round_amount(2.5), 3.0);
}

#[test]
fn fixed_factor_and_combined_models() {
    assert_eq!(
        calculate(&PaymentModel::Fixed { amount: 750.0 }, 10.0, None).amount,
        750.0
    );
    assert_eq!(
        calculate(&PaymentModel::Factor { factor: 1.5 }, 2_000.0, None).amount,
        3_000.0
    );
    let combined = PaymentModel::PercentagePlusFixed {
        percentage: 10.0,
        fixed: 200.0,
    };
    let calculation = calculate(&combined, 1_000.0, None);
    assert_eq!(calculation.amount, 300.0);
    assert_eq!(calculation.arithmetic, vec!["1000.00 × 10% + 200.00 = 300.00"]);
}

#[test]
fn tiered_by_amount_applies_one_band_to_whole_base() {
    let model = PaymentModel::TieredByAmount {
        bands: two_brackets(),
        fallback_percentage: 5.0,
    };
    assert_eq!(calculate(&model, 700_000.0, None).amount, 140_000.0);
    assert_eq!(calculate(&model, 400_000.0, None).amount, 40_000.0);
}

#[test]
fn tiered_by_amount_falls_back_when_no_band_matches() {
    let model = PaymentModel::TieredByAmount {
        bands: vec![PercentageBand {
            from: 1_000.0,
            to: Some(2_000.0),
            percentage: 12.0,
        }],
        fallback_percentage: 5.0,
    };
    let calculation = calculate(&model, 500.0, None);
    assert_eq!(calculation.amount, 25.0);
    assert!(calculation.warnings[0].contains("fallback 5%"));
}

#[test]
fn tiered_by_quantity_keys_on_count() {
    let model = PaymentModel::TieredByQuantity {
        bands: vec![
            PercentageBand {
                from: 0.0,
                to: Some(10.0),
                percentage: 5.0,
            },
            PercentageBand {
                from: 10.0,
                to: None,
                percentage: 8.0,
            },
        ],
        fallback_percentage: 0.0,
    };
    assert_eq!(calculate(&model, 1_000.0, Some(12)).amount, 80.0);

    let missing = calculate(&model, 1_000.0, None);
    assert_eq!(missing.amount, 50.0);
    assert_eq!(missing.warnings.len(), 1);
}

#[test]
fn cumulative_banding_is_progressive() {
    let model = PaymentModel::CumulativeBanded {
        bands: vec![
            CumulativeBand {
                from: 0.0,
                to: Some(500_000.0),
                rate: BandRate::Percentage(10.0),
            },
            CumulativeBand {
                from: 500_000.0,
                to: None,
                rate: BandRate::Percentage(20.0),
            },
        ],
    };
    let calculation = calculate(&model, 700_000.0, None);
    assert_eq!(calculation.amount, 90_000.0);
    assert!(calculation.warnings.is_empty());
    assert_eq!(
        calculation.arithmetic,
        vec![
            "500000.00 × 10% = 50000.00",
            "200000.00 × 20% = 40000.00",
            "total = 90000.00",
        ]
    );
}

#[test]
fn cumulative_fixed_band_adds_once_and_gaps_warn() {
    let with_fixed = PaymentModel::CumulativeBanded {
        bands: vec![
            CumulativeBand {
                from: 0.0,
                to: Some(1_000.0),
                rate: BandRate::Percentage(10.0),
            },
            CumulativeBand {
                from: 1_000.0,
                to: None,
                rate: BandRate::Fixed(50.0),
            },
        ],
    };
    assert_eq!(calculate(&with_fixed, 1_500.0, None).amount, 150.0);
    assert_eq!(calculate(&with_fixed, 1_000.0, None).amount, 100.0);

    let short = PaymentModel::CumulativeBanded {
        bands: vec![CumulativeBand {
            from: 0.0,
            to: Some(1_000.0),
            rate: BandRate::Percentage(10.0),
        }],
    };
    let calculation = calculate(&short, 1_500.0, None);
    assert_eq!(calculation.amount, 100.0);
    assert_eq!(calculation.warnings.len(), 1);
}

#[test]
fn direct_table_returns_band_value() {
    let model = PaymentModel::DirectTable {
        bands: vec![
            ValueBand {
                from: 0.0,
                to: Some(1_000.0),
                amount: 100.0,
            },
            ValueBand {
                from: 1_000.0,
                to: None,
                amount: 250.0,
            },
        ],
    };
    assert_eq!(calculate(&model, 999.99, None).amount, 100.0);
    assert_eq!(calculate(&model, 1_000.0, None).amount, 250.0);

    let gap = PaymentModel::DirectTable {
        bands: vec![ValueBand {
            from: 100.0,
            to: Some(200.0),
            amount: 40.0,
        }],
    };
    let calculation = calculate(&gap, 50.0, None);
    assert_eq!(calculation.amount, 0.0);
    assert_eq!(calculation.warnings.len(), 1);
}

#[test]
fn results_are_floored_at_zero() {
    assert_eq!(
        calculate(&PaymentModel::Fixed { amount: -100.0 }, 10.0, None).amount,
        0.0
    );
    assert_eq!(
        calculate(&PaymentModel::Factor { factor: -2.0 }, 10.0, None).amount,
        0.0
    );
}
