//! League game finder rows → canonical games.
//!
//! The stats feed lists every game twice, once per team. The row whose
//! `MATCHUP` reads `BOS vs. NYK` is the home side, `NYK @ BOS` the away side;
//! the two are joined on `GAME_ID`.

use std::collections::HashMap;

use chrono::NaiveDate;
use tracing::debug;

use super::{GameParts, GameRecord, GameStatus, MissingOpponentPolicy, NormalizeError};
use crate::error::FetchError;
use crate::feed::{StatsTable, TableRow};
use crate::ratings::TeamRatings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Home,
    Away,
}

/// `vs.` marks the home row, `@` the away row.
pub fn side_of(matchup: &str) -> Option<Side> {
    if matchup.contains("vs.") {
        Some(Side::Home)
    } else if matchup.contains('@') {
        Some(Side::Away)
    } else {
        None
    }
}

/// Trailing word of a full team name: `"Boston Celtics"` → `"Celtics"`.
///
/// The live feed only carries the nickname, so historical names are cut down
/// to match it before they are used as a ratings key.
pub fn team_nickname(full_name: &str) -> &str {
    full_name.split_whitespace().last().unwrap_or(full_name)
}

#[derive(Debug, Clone)]
struct TeamLine {
    team_id: String,
    team_name: String,
    points: Option<u32>,
}

#[derive(Debug, Default)]
struct Pairing {
    date: Option<NaiveDate>,
    home: Option<TeamLine>,
    away: Option<TeamLine>,
}

fn team_line(row: &TableRow<'_>) -> Result<TeamLine, FetchError> {
    let name = row.require_text("TEAM_NAME")?;
    Ok(TeamLine {
        team_id: row.require_text("TEAM_ID")?,
        team_name: team_nickname(&name).to_string(),
        points: row.number("PTS").filter(|p| *p >= 0.0).map(|p| p as u32),
    })
}

fn parse_date(raw: &str) -> Result<NaiveDate, FetchError> {
    let day = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .map_err(|e| FetchError::malformed(format!("bad GAME_DATE '{}': {}", raw, e)))
}

/// Join home and away rows into finished games, in order of first appearance.
pub fn normalize_historical(
    table: &StatsTable,
    ratings: &TeamRatings,
    policy: MissingOpponentPolicy,
) -> Result<Vec<GameRecord>, FetchError> {
    for header in ["GAME_ID", "GAME_DATE", "MATCHUP", "TEAM_ID", "TEAM_NAME", "PTS"] {
        table.require_column(header)?;
    }

    let mut order: Vec<String> = Vec::new();
    let mut pairs: HashMap<String, Pairing> = HashMap::new();

    for row in table.iter() {
        let game_id = row.require_text("GAME_ID")?;
        let matchup = row.text("MATCHUP").unwrap_or_default();
        let Some(side) = side_of(&matchup) else {
            debug!("Skipping row for {} with matchup '{}'", game_id, matchup);
            continue;
        };
        let date = parse_date(&row.require_text("GAME_DATE")?)?;
        let line = team_line(&row)?;

        let pairing = pairs.entry(game_id.clone()).or_insert_with(|| {
            order.push(game_id.clone());
            Pairing::default()
        });
        pairing.date.get_or_insert(date);
        match side {
            Side::Home => pairing.home = Some(line),
            Side::Away => pairing.away = Some(line),
        }
    }

    let mut out = Vec::with_capacity(order.len());
    for game_id in order {
        let Some(pairing) = pairs.remove(&game_id) else {
            continue;
        };
        let resolved = match (pairing.date, pairing.home, pairing.away) {
            (Some(date), Some(home), Some(away)) => match (home.points, away.points) {
                (Some(home_score), Some(away_score)) => Some(GameParts {
                    game_id: game_id.clone(),
                    date,
                    home_team_id: home.team_id,
                    away_team_id: away.team_id,
                    home_team_name: home.team_name,
                    away_team_name: away.team_name,
                    home_score,
                    away_score,
                    status: GameStatus::Final,
                }),
                _ => None,
            },
            _ => None,
        };

        match (resolved, policy) {
            (Some(parts), _) => out.push(parts.price(ratings)),
            (None, MissingOpponentPolicy::Drop) => {
                debug!("Dropping game {}: no matching opponent row", game_id);
            }
            (None, MissingOpponentPolicy::Fail) => {
                return Err(NormalizeError::MissingOpponent { game_id }.into());
            }
        }
    }
    Ok(out)
}
