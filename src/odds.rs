//! Elo win probability and decimal odds.
//!
//! Win probability uses the standard logistic Elo curve:
//!   P(a beats b) = 1 / (1 + 10^((b − a) / 400))
//!
//! Decimal odds are the zero-margin reciprocal 1 / p, so stake × odds is the
//! total return including the stake. Home advantage is not modelled here; fold
//! it into the input rating if wanted.

use serde::{Deserialize, Serialize};
use thiserror::Error;

const ELO_SCALE: f64 = 400.0;
const MIN_PROBABILITY: f64 = 0.01;
const MAX_PROBABILITY: f64 = 0.99;

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum OddsError {
    #[error("probability {0} has no finite odds")]
    NonPositiveProbability(f64),
    #[error("probability {0} is outside (0, 1]")]
    OutOfRange(f64),
}

pub fn win_probability(rating_a: f64, rating_b: f64) -> f64 {
    1.0 / (1.0 + 10f64.powf((rating_b - rating_a) / ELO_SCALE))
}

pub fn probability_to_odds(p: f64) -> Result<f64, OddsError> {
    if p.is_nan() || p > 1.0 {
        return Err(OddsError::OutOfRange(p));
    }
    if p <= 0.0 {
        return Err(OddsError::NonPositiveProbability(p));
    }
    Ok(1.0 / p)
}

/// Round to two decimals and keep the result inside (0, 1).
///
/// 0 maps to 0.01 and 1 maps to 0.99 so both sides of a game always have
/// finite odds.
pub fn clamp_probability(p: f64) -> f64 {
    if p.is_nan() {
        return 0.5;
    }
    let rounded = (p * 100.0).round() / 100.0;
    rounded.clamp(MIN_PROBABILITY, MAX_PROBABILITY)
}

/// Odds for both sides of one game.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GameOdds {
    /// Clamped probability the odds were derived from.
    pub home_win_probability: f64,
    pub home_odds: f64,
    pub away_odds: f64,
}

impl GameOdds {
    pub fn from_ratings(home_rating: f64, away_rating: f64) -> Self {
        GameOdds::from_probability(win_probability(home_rating, away_rating))
    }

    pub fn from_probability(home_win_probability: f64) -> Self {
        let p = clamp_probability(home_win_probability);
        GameOdds {
            home_win_probability: p,
            home_odds: 1.0 / p,
            away_odds: 1.0 / (1.0 - p),
        }
    }
}
