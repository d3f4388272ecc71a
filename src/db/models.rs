use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::Session;
use crate::games::{GameRecord, GameStatus};

/// Smallest stake accepted on a bet.
pub const MIN_STAKE: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
pub enum Pick {
    Home,
    Away,
}

/// A simulated bet as stored in the ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bet {
    pub id: i64,
    pub user_id: String,
    pub game_id: String,
    pub date: NaiveDate,
    pub home_team: String,
    pub away_team: String,
    pub chosen_team: String,
    /// Decimal odds locked in when the bet was placed
    pub odds: f64,
    pub stake: f64,
    /// stake × odds, stake included
    pub payout: f64,
    pub placed_at: DateTime<Utc>,
}

/// A bet about to be written
#[derive(Debug, Clone, PartialEq)]
pub struct NewBet {
    pub user_id: String,
    pub game_id: String,
    pub date: NaiveDate,
    pub home_team: String,
    pub away_team: String,
    pub chosen_team: String,
    pub odds: f64,
    pub stake: f64,
    pub payout: f64,
}

impl NewBet {
    /// Price a bet on `game` for the session's user at the game's current odds.
    pub fn for_game(session: &Session, game: &GameRecord, pick: Pick, stake: f64) -> Result<Self> {
        if !stake.is_finite() || stake < MIN_STAKE {
            anyhow::bail!("stake must be at least {:.2}, got {}", MIN_STAKE, stake);
        }
        if game.status == GameStatus::Final {
            anyhow::bail!("game {} is already final", game.game_id);
        }
        let (chosen_team, odds) = match pick {
            Pick::Home => (&game.home_team_name, game.home_odds()),
            Pick::Away => (&game.away_team_name, game.away_odds()),
        };
        Ok(NewBet {
            user_id: session.user_id().to_string(),
            game_id: game.game_id.clone(),
            date: game.date,
            home_team: game.home_team_name.clone(),
            away_team: game.away_team_name.clone(),
            chosen_team: chosen_team.clone(),
            odds,
            stake,
            payout: stake * odds,
        })
    }
}

/// Aggregate view of one user's betting history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BetSummary {
    pub bets: i64,
    pub total_staked: f64,
    pub potential_payout: f64,
}
