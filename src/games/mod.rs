//! Canonical game rows.
//!
//! Two upstream shapes feed into [`GameRecord`]: the live scoreboard
//! ([`live`]) and the league game finder table ([`historical`]). Both go
//! through [`GameParts::price`] so odds are always derived the same way.

pub mod historical;
pub mod live;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::odds::GameOdds;
use crate::ratings::TeamRatings;

pub use historical::normalize_historical;
pub use live::normalize_live;

/// Lifecycle of a game as reported upstream. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GameStatus {
    Scheduled,
    Live,
    Final,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Home,
    Away,
    Tie,
    /// Scores level and the game is not over.
    Undefined,
}

/// Decide the winner. Status only breaks the equal-score case.
pub fn outcome(home_score: u32, away_score: u32, status: GameStatus) -> Outcome {
    if home_score > away_score {
        Outcome::Home
    } else if away_score > home_score {
        Outcome::Away
    } else if status == GameStatus::Final {
        Outcome::Tie
    } else {
        Outcome::Undefined
    }
}

/// What to do with a game whose opponent row or score cannot be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum MissingOpponentPolicy {
    /// Skip the game. Incomplete rows are filtered as a data-quality rule.
    #[default]
    Drop,
    /// Reject the whole batch.
    Fail,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    #[error("game {game_id}: opponent could not be resolved")]
    MissingOpponent { game_id: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    pub game_id: String,
    pub date: NaiveDate,
    pub home_team_id: String,
    pub away_team_id: String,
    pub home_team_name: String,
    pub away_team_name: String,
    pub home_score: u32,
    pub away_score: u32,
    pub status: GameStatus,
    pub odds: GameOdds,
}

impl GameRecord {
    pub fn outcome(&self) -> Outcome {
        outcome(self.home_score, self.away_score, self.status)
    }

    /// Winning team's name, or `"Tie"` / `"Undefined"`.
    pub fn winning_team(&self) -> &str {
        match self.outcome() {
            Outcome::Home => &self.home_team_name,
            Outcome::Away => &self.away_team_name,
            Outcome::Tie => "Tie",
            Outcome::Undefined => "Undefined",
        }
    }

    pub fn home_odds(&self) -> f64 {
        self.odds.home_odds
    }

    pub fn away_odds(&self) -> f64 {
        self.odds.away_odds
    }
}

/// A normalized game before pricing.
#[derive(Debug, Clone, PartialEq)]
pub struct GameParts {
    pub game_id: String,
    pub date: NaiveDate,
    pub home_team_id: String,
    pub away_team_id: String,
    pub home_team_name: String,
    pub away_team_name: String,
    pub home_score: u32,
    pub away_score: u32,
    pub status: GameStatus,
}

impl GameParts {
    pub fn price(self, ratings: &TeamRatings) -> GameRecord {
        let odds = GameOdds::from_ratings(
            ratings.rating_of(&self.home_team_name),
            ratings.rating_of(&self.away_team_name),
        );
        GameRecord {
            game_id: self.game_id,
            date: self.date,
            home_team_id: self.home_team_id,
            away_team_id: self.away_team_id,
            home_team_name: self.home_team_name,
            away_team_name: self.away_team_name,
            home_score: self.home_score,
            away_score: self.away_score,
            status: self.status,
            odds,
        }
    }
}

/// Keep only games played on `date`.
pub fn on_date(games: Vec<GameRecord>, date: NaiveDate) -> Vec<GameRecord> {
    games.into_iter().filter(|g| g.date == date).collect()
}

pub fn by_id(games: Vec<GameRecord>, game_id: &str) -> Option<GameRecord> {
    games.into_iter().find(|g| g.game_id == game_id)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn parts(home: u32, away: u32, status: GameStatus) -> GameParts {
        GameParts {
            game_id: "0022400061".into(),
            date: NaiveDate::from_ymd_opt(2024, 10, 22).unwrap(),
            home_team_id: "1610612738".into(),
            away_team_id: "1610612752".into(),
            home_team_name: "Celtics".into(),
            away_team_name: "Knicks".into(),
            home_score: home,
            away_score: away,
            status,
        }
    }

    pub fn record(home: u32, away: u32, status: GameStatus) -> GameRecord {
        parts(home, away, status).price(&TeamRatings::default())
    }
}
