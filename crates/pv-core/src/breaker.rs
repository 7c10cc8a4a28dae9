//! Protective device sizing against standard frame ratings.

use serde::{Deserialize, Serialize};

use crate::units::Amperes;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BreakerKind {
    /// Miniature circuit breaker
    Mcb,
    /// Moulded-case circuit breaker
    Mccb,
    /// Air circuit breaker
    Acb,
    /// Vacuum circuit breaker
    Vcb,
}

const MCB_RATINGS: &[f64] = &[0.5, 1.0, 2.0, 4.0, 6.0, 10.0, 16.0, 20.0, 25.0, 32.0, 40.0, 50.0, 63.0];
const MCCB_RATINGS: &[f64] = &[
    10.0, 16.0, 20.0, 25.0, 32.0, 40.0, 50.0, 63.0, 80.0, 100.0, 125.0, 160.0, 200.0, 250.0,
    315.0, 400.0, 500.0, 630.0, 800.0, 1000.0, 1250.0, 1600.0, 2000.0, 3200.0,
];
const ACB_RATINGS: &[f64] = &[
    400.0, 630.0, 800.0, 1000.0, 1250.0, 1600.0, 2000.0, 2500.0, 3200.0, 4000.0, 5000.0, 6300.0,
];
const VCB_RATINGS: &[f64] = &[630.0, 800.0, 1250.0, 1600.0, 2000.0, 2500.0, 3150.0, 4000.0];

impl BreakerKind {
    /// Standard ratings in amperes, ascending
    pub fn ratings(&self) -> &'static [f64] {
        match self {
            BreakerKind::Mcb => MCB_RATINGS,
            BreakerKind::Mccb => MCCB_RATINGS,
            BreakerKind::Acb => ACB_RATINGS,
            BreakerKind::Vcb => VCB_RATINGS,
        }
    }
}

impl std::str::FromStr for BreakerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "MCB" => Ok(BreakerKind::Mcb),
            "MCCB" => Ok(BreakerKind::Mccb),
            "ACB" => Ok(BreakerKind::Acb),
            "VCB" => Ok(BreakerKind::Vcb),
            other => Err(format!("unknown breaker type '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BreakerSelection {
    pub kind: BreakerKind,
    pub load_current: Amperes,
    pub required_rating: Amperes,
    /// Smallest standard rating at or above the requirement
    pub rating: Option<Amperes>,
}

impl BreakerSelection {
    pub fn adequate(&self) -> bool {
        self.rating.is_some()
    }
}

/// Smallest standard rating of `kind` covering `current × safety_factor`.
pub fn select_breaker(kind: BreakerKind, current: Amperes, safety_factor: f64) -> BreakerSelection {
    let required = current * safety_factor;
    let rating = kind
        .ratings()
        .iter()
        .copied()
        .find(|r| *r >= required.value())
        .map(Amperes);
    BreakerSelection {
        kind,
        load_current: current,
        required_rating: required,
        rating,
    }
}
