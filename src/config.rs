use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use crate::db::models::Pick;
use crate::feed::client::{DEFAULT_SCOREBOARD_URL, DEFAULT_STATS_URL};
use crate::fetch::{CachePolicy, RetryPolicy};
use crate::games::MissingOpponentPolicy;

/// Upper bound on the base backoff delay.
pub const MAX_BASE_DELAY_SECS: f64 = 3600.0;

/// NBA scores, Elo odds and a simulated bet ledger
#[derive(Parser, Debug, Clone)]
#[command(name = "basketboule", version, about)]
pub struct Config {
    /// Live scoreboard JSON URL
    #[arg(long, env = "NBA_SCOREBOARD_URL", default_value = DEFAULT_SCOREBOARD_URL)]
    pub scoreboard_url: String,

    /// Stats API base URL (endpoint name is appended)
    #[arg(long, env = "NBA_STATS_URL", default_value = DEFAULT_STATS_URL)]
    pub stats_url: String,

    /// Attempts per remote call before giving up
    #[arg(long, env = "FETCH_MAX_ATTEMPTS", default_value = "5")]
    pub max_attempts: u32,

    /// Base backoff delay in seconds, doubled after every failed attempt
    #[arg(long, env = "FETCH_BASE_DELAY_SECS", default_value = "3.0")]
    pub base_delay_secs: f64,

    /// Timeout of a single HTTP request in seconds
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value = "60")]
    pub request_timeout_secs: u64,

    /// Two-column `team,rating` file (every team rated 1500 when absent)
    #[arg(long, env = "TEAM_RATINGS_PATH")]
    pub ratings_path: Option<PathBuf>,

    /// Result cache TTL in seconds (0 disables caching)
    #[arg(long, env = "CACHE_TTL_SECS", default_value = "3600")]
    pub cache_ttl_secs: u64,

    /// SQLite database path for the bet ledger
    #[arg(long, env = "DATABASE_PATH", default_value = "basketboule.db")]
    pub database_path: String,

    /// Season used by the historical feed, e.g. 2024-25
    #[arg(long, env = "NBA_SEASON", default_value = "2024-25")]
    pub season: String,

    /// What to do with a game whose opponent cannot be resolved
    #[arg(long, env = "MISSING_OPPONENT_POLICY", value_enum, default_value = "drop")]
    pub missing_opponent: MissingOpponentPolicy,

    /// User id the ledger commands act for
    #[arg(long, env = "BASKETBOULE_USER")]
    pub user: Option<String>,

    /// Print JSON instead of text
    #[arg(long, default_value = "false")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Today's games from the live scoreboard
    Today,
    /// Games for one date (today from the live scoreboard) or the whole season
    Games {
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// One finished game by id
    Game { id: String },
    /// Team profile, latest season line and roster averages
    Team { team_id: String },
    /// Player profile and most recent game
    Player {
        player_id: String,
        #[arg(long)]
        season: Option<String>,
    },
    /// Place a simulated bet on one of today's games
    Bet {
        game_id: String,
        #[arg(value_enum)]
        pick: Pick,
        stake: f64,
    },
    /// List the user's bets
    Bets,
    /// Delete the user's betting history
    ResetBets,
}

impl Command {
    /// Ledger commands need `--user`.
    pub fn needs_user(&self) -> bool {
        matches!(self, Command::Bet { .. } | Command::Bets | Command::ResetBets)
    }
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.max_attempts == 0 {
            anyhow::bail!("max_attempts must be at least 1");
        }
        if Duration::try_from_secs_f64(self.base_delay_secs).is_err()
            || self.base_delay_secs > MAX_BASE_DELAY_SECS
        {
            anyhow::bail!(
                "base_delay_secs must be between 0 and {}, got {}",
                MAX_BASE_DELAY_SECS,
                self.base_delay_secs
            );
        }
        if self.request_timeout_secs == 0 {
            anyhow::bail!("request_timeout_secs must be positive");
        }
        if !is_season(&self.season) {
            anyhow::bail!("season must look like 2024-25, got '{}'", self.season);
        }
        if let Command::Player {
            season: Some(season),
            ..
        } = &self.command
        {
            if !is_season(season) {
                anyhow::bail!("season must look like 2024-25, got '{}'", season);
            }
        }
        if self.command.needs_user() && self.user.as_deref().map_or(true, |u| u.trim().is_empty()) {
            anyhow::bail!("--user (or BASKETBOULE_USER) is required for ledger commands");
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        let secs = if self.base_delay_secs.is_nan() {
            0.0
        } else {
            self.base_delay_secs.clamp(0.0, MAX_BASE_DELAY_SECS)
        };
        RetryPolicy::new(self.max_attempts, Duration::from_secs_f64(secs))
    }

    pub fn cache_policy(&self) -> CachePolicy {
        CachePolicy::from_secs(self.cache_ttl_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// `YYYY-YY`
fn is_season(s: &str) -> bool {
    let Some((start, end)) = s.split_once('-') else {
        return false;
    };
    start.len() == 4
        && end.len() == 2
        && start.chars().all(|c| c.is_ascii_digit())
        && end.chars().all(|c| c.is_ascii_digit())
}
