use serde::{Deserialize, Serialize};

use super::rules::{BandRate, Banded, PaymentModel, PercentageBand};

/// Result of applying a payment formula, with the literal arithmetic performed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Calculation {
    pub amount: f64,
    pub arithmetic: Vec<String>,
    pub warnings: Vec<String>,
}

/// Standard rounding to whole units, half away from zero.
pub fn round_amount(value: f64) -> f64 {
    value.round()
}

/// Stackable bonus granted on top of a convention's own formula.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedBonus {
    pub name: String,
    pub percentage: f64,
    pub amount: f64,
}

impl AppliedBonus {
    pub fn new(name: impl Into<String>, percentage: f64, base: f64) -> Self {
        Self {
            name: name.into(),
            percentage,
            amount: round_amount(base * percentage / 100.0),
        }
    }
}

pub fn money(value: f64) -> String {
    format!("{value:.2}")
}

/// Applies `model` to `base`; `quantity` feeds quantity-tiered tables only.
/// Every result is floored at zero.
pub fn calculate(model: &PaymentModel, base: f64, quantity: Option<u64>) -> Calculation {
    let mut calculation = Calculation::default();

    let raw = match model {
        PaymentModel::Fixed { amount } => {
            calculation
                .arithmetic
                .push(format!("fixed amount {}", money(*amount)));
            *amount
        }
        PaymentModel::Percentage { percentage } => {
            let amount = round_amount(base * percentage / 100.0);
            calculation.arithmetic.push(format!(
                "round({} × {percentage}%) = {}",
                money(base),
                money(amount)
            ));
            amount
        }
        PaymentModel::Factor { factor } => {
            let amount = base * factor;
            calculation.arithmetic.push(format!(
                "{} × {factor} = {}",
                money(base),
                money(amount)
            ));
            amount
        }
        PaymentModel::PercentagePlusFixed { percentage, fixed } => {
            let amount = base * percentage / 100.0 + fixed;
            calculation.arithmetic.push(format!(
                "{} × {percentage}% + {} = {}",
                money(base),
                money(*fixed),
                money(amount)
            ));
            amount
        }
        PaymentModel::TieredByAmount {
            bands,
            fallback_percentage,
        } => flat_band(&mut calculation, bands, *fallback_percentage, base, base, "amount"),
        PaymentModel::TieredByQuantity {
            bands,
            fallback_percentage,
        } => {
            let count = match quantity {
                Some(count) => count,
                None => {
                    calculation
                        .warnings
                        .push("no transaction count supplied; tiering on 0".to_string());
                    0
                }
            };
            flat_band(
                &mut calculation,
                bands,
                *fallback_percentage,
                count as f64,
                base,
                "quantity",
            )
        }
        PaymentModel::CumulativeBanded { bands } => {
            let mut total = 0.0;
            let mut allocated = 0.0;
            for band in bands {
                if base <= band.from {
                    break;
                }
                let upper = band.to.map(|to| to.min(base)).unwrap_or(base);
                let portion = upper - band.from;
                if portion <= 0.0 {
                    continue;
                }
                allocated += portion;
                let contribution = match band.rate {
                    BandRate::Percentage(rate) => {
                        let contribution = portion * rate / 100.0;
                        calculation.arithmetic.push(format!(
                            "{} × {rate}% = {}",
                            money(portion),
                            money(contribution)
                        ));
                        contribution
                    }
                    BandRate::Fixed(value) => {
                        calculation.arithmetic.push(format!(
                            "fixed {} for band from {}",
                            money(value),
                            money(band.from)
                        ));
                        value
                    }
                };
                total += contribution;
            }
            if allocated < base {
                calculation.warnings.push(format!(
                    "bands allocate {} of base amount {}",
                    money(allocated),
                    money(base)
                ));
            }
            calculation.arithmetic.push(format!("total = {}", money(total)));
            total
        }
        PaymentModel::DirectTable { bands } => {
            match bands.iter().find(|band| band.contains(base)) {
                Some(band) => {
                    calculation.arithmetic.push(format!(
                        "{} falls in [{}, {}) → {}",
                        money(base),
                        money(band.from),
                        band.to.map(money).unwrap_or_else(|| "∞".to_string()),
                        money(band.amount)
                    ));
                    band.amount
                }
                None => {
                    calculation.warnings.push(format!(
                        "no table band contains {}; paying 0",
                        money(base)
                    ));
                    0.0
                }
            }
        }
    };

    calculation.amount = floor_at_zero(raw);
    if calculation.amount != raw {
        calculation
            .arithmetic
            .push(format!("{} floored to 0.00", money(raw)));
    }
    calculation
}

/// Non-cumulative banding: the one band containing `key` sets the rate for the whole base.
fn flat_band(
    calculation: &mut Calculation,
    bands: &[PercentageBand],
    fallback_percentage: f64,
    key: f64,
    base: f64,
    keyed_on: &str,
) -> f64 {
    let percentage = match bands.iter().find(|band| band.contains(key)) {
        Some(band) => {
            calculation.arithmetic.push(format!(
                "{keyed_on} {key} falls in [{}, {}) at {}%",
                band.from,
                band.to
                    .map(|to| to.to_string())
                    .unwrap_or_else(|| "∞".to_string()),
                band.percentage
            ));
            band.percentage
        }
        None => {
            calculation.warnings.push(format!(
                "no band contains {keyed_on} {key}; using fallback {fallback_percentage}%"
            ));
            fallback_percentage
        }
    };
    let amount = round_amount(base * percentage / 100.0);
    calculation.arithmetic.push(format!(
        "round({} × {percentage}%) = {}",
        money(base),
        money(amount)
    ));
    amount
}

pub(crate) fn floor_at_zero(value: f64) -> f64 {
    if value > 0.0 {
        value
    } else {
        0.0
    }
}
