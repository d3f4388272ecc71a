//! Team and player views built from stats tables.

use serde::Serialize;
use tracing::debug;

use crate::error::FetchError;
use crate::feed::{StatsTable, TableRow};

/// Per-game averages for one rostered player.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerAverages {
    pub player_id: String,
    pub name: String,
    pub number: Option<String>,
    pub position: Option<String>,
    pub points: f64,
    pub assists: f64,
    pub rebounds: f64,
}

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

fn per_game(row: &TableRow<'_>, stat: &str, games_played: f64) -> f64 {
    if games_played > 0.0 {
        round1(row.number(stat).unwrap_or(0.0) / games_played)
    } else {
        0.0
    }
}

impl PlayerAverages {
    /// Averages from the most recent season row of a player's career table.
    /// `None` when the career table is empty.
    pub fn from_career(roster_row: &TableRow<'_>, career: &StatsTable) -> Result<Option<Self>, FetchError> {
        let Some(latest) = career.last() else {
            return Ok(None);
        };
        let gp = latest.number("GP").unwrap_or(0.0);
        Ok(Some(PlayerAverages {
            player_id: roster_row.require_text("PLAYER_ID")?,
            name: roster_row.require_text("PLAYER")?,
            number: roster_row.text("NUM"),
            position: roster_row.text("POSITION"),
            points: per_game(&latest, "PTS", gp),
            assists: per_game(&latest, "AST", gp),
            rebounds: per_game(&latest, "REB", gp),
        }))
    }
}

/// Averages for every player on `roster`. `career_of` is called with each
/// player id; players whose career is unavailable or empty are left out.
pub fn roster_averages<F>(roster: &StatsTable, mut career_of: F) -> Result<Vec<PlayerAverages>, FetchError>
where
    F: FnMut(&str) -> Result<Option<StatsTable>, FetchError>,
{
    roster.require_column("PLAYER_ID")?;
    let mut averages = Vec::with_capacity(roster.len());
    for row in roster.iter() {
        let player_id = row.require_text("PLAYER_ID")?;
        let Some(career) = career_of(&player_id)? else {
            debug!("No career stats for player {}, skipping", player_id);
            continue;
        };
        if let Some(avg) = PlayerAverages::from_career(&row, &career)? {
            averages.push(avg);
        }
    }
    Ok(averages)
}

/// Latest season line from a team's year-by-year table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamSeasonSummary {
    pub year: Option<String>,
    pub wins: Option<u32>,
    pub losses: Option<u32>,
    pub conference_rank: Option<u32>,
    pub win_pct: Option<f64>,
    pub points: Option<f64>,
    pub assists: Option<f64>,
    pub rebounds: Option<f64>,
    pub plus_minus: Option<f64>,
}

impl TeamSeasonSummary {
    pub fn from_table(table: &StatsTable) -> Option<Self> {
        let row = table.last()?;
        let count = |h: &str| row.number(h).filter(|v| *v >= 0.0).map(|v| v as u32);
        Some(TeamSeasonSummary {
            year: row.text("YEAR"),
            wins: count("WINS"),
            losses: count("LOSSES"),
            conference_rank: count("CONF_RANK"),
            win_pct: row.number("WIN_PCT"),
            points: row.number("PTS"),
            assists: row.number("AST"),
            rebounds: row.number("REB"),
            plus_minus: row.number("PLUS_MINUS"),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamProfile {
    pub year_founded: Option<String>,
    pub city: Option<String>,
    pub arena: Option<String>,
    pub owner: Option<String>,
    pub general_manager: Option<String>,
    pub head_coach: Option<String>,
    pub dleague_affiliation: Option<String>,
}

impl TeamProfile {
    pub fn from_table(table: &StatsTable) -> Option<Self> {
        let row = table.first()?;
        Some(TeamProfile {
            year_founded: row.text("YEARFOUNDED"),
            city: row.text("CITY"),
            arena: row.text("ARENA"),
            owner: row.text("OWNER"),
            general_manager: row.text("GENERALMANAGER"),
            head_coach: row.text("HEADCOACH"),
            dleague_affiliation: row.text("DLEAGUEAFFILIATION"),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerProfile {
    pub team_id: Option<String>,
    pub team_name: Option<String>,
    pub position: Option<String>,
    pub height: Option<String>,
    pub weight: Option<String>,
    pub country: Option<String>,
}

impl PlayerProfile {
    pub fn from_table(table: &StatsTable) -> Option<Self> {
        let row = table.first()?;
        Some(PlayerProfile {
            team_id: row.text("TEAM_ID"),
            team_name: row.text("TEAM_NAME"),
            position: row.text("POSITION"),
            height: row.text("HEIGHT"),
            weight: row.text("WEIGHT"),
            country: row.text("COUNTRY"),
        })
    }
}

/// Box score line of the most recent game in a player game log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LastGameLine {
    pub game_date: Option<String>,
    pub matchup: Option<String>,
    pub points: Option<f64>,
    pub rebounds: Option<f64>,
    pub assists: Option<f64>,
    pub steals: Option<f64>,
    pub blocks: Option<f64>,
    pub minutes: Option<f64>,
}

impl LastGameLine {
    /// Game logs are newest first.
    pub fn from_table(table: &StatsTable) -> Option<Self> {
        let row = table.first()?;
        Some(LastGameLine {
            game_date: row.text("GAME_DATE"),
            matchup: row.text("MATCHUP"),
            points: row.number("PTS"),
            rebounds: row.number("REB"),
            assists: row.number("AST"),
            steals: row.number("STL"),
            blocks: row.number("BLK"),
            minutes: row.number("MIN"),
        })
    }
}
