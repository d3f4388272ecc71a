use chrono::{DateTime, NaiveDate};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::{GameParts, GameRecord, GameStatus, MissingOpponentPolicy, NormalizeError};
use crate::error::FetchError;
use crate::ratings::TeamRatings;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveTeam {
    pub team_id: Option<i64>,
    pub team_name: Option<String>,
    #[serde(default)]
    pub team_city: Option<String>,
    pub score: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveGame {
    pub game_id: String,
    /// 1 = scheduled, 2 = in progress, 3 = final.
    #[serde(default)]
    pub game_status: Option<u8>,
    #[serde(default)]
    pub game_status_text: String,
    /// Local tip-off time with offset, e.g. `2024-10-22T19:30:00-04:00`.
    pub game_et: String,
    pub home_team: Option<LiveTeam>,
    pub away_team: Option<LiveTeam>,
}

#[derive(Debug, Deserialize)]
struct ScoreboardBody {
    games: Vec<LiveGame>,
}

#[derive(Debug, Deserialize)]
struct ScoreboardResponse {
    scoreboard: ScoreboardBody,
}

/// Decode the `scoreboard.games` array of the live feed.
pub fn parse_scoreboard(raw: &Value) -> Result<Vec<LiveGame>, FetchError> {
    let resp = ScoreboardResponse::deserialize(raw)?;
    Ok(resp.scoreboard.games)
}

pub fn status_from_code(code: u8) -> Option<GameStatus> {
    match code {
        1 => Some(GameStatus::Scheduled),
        2 => Some(GameStatus::Live),
        3 => Some(GameStatus::Final),
        _ => None,
    }
}

/// Fallback when the numeric code is missing: `"Final"`, `"Final/OT"` are
/// final, tip-off times like `"7:30 pm ET"` are scheduled, anything else
/// (`"Q3 5:12"`, `"Half"`) is live.
pub fn status_from_text(text: &str) -> GameStatus {
    let t = text.trim().to_lowercase();
    if t.starts_with("final") {
        GameStatus::Final
    } else if t.is_empty() || t.ends_with(" et") || t == "ppd" || t == "postponed" {
        GameStatus::Scheduled
    } else {
        GameStatus::Live
    }
}

fn parse_game_date(game_et: &str) -> Result<NaiveDate, FetchError> {
    DateTime::parse_from_rfc3339(game_et)
        .map(|dt| dt.date_naive())
        .map_err(|e| FetchError::malformed(format!("bad gameEt '{}': {}", game_et, e)))
}

/// Map one scoreboard entry; `None` when either side is unresolvable.
fn to_parts(game: &LiveGame) -> Result<Option<GameParts>, FetchError> {
    let date = parse_game_date(&game.game_et)?;
    let status = game
        .game_status
        .and_then(status_from_code)
        .unwrap_or_else(|| status_from_text(&game.game_status_text));

    let (Some(home), Some(away)) = (&game.home_team, &game.away_team) else {
        return Ok(None);
    };
    let (Some(home_id), Some(home_name), Some(home_score)) =
        (home.team_id, home.team_name.as_ref(), home.score)
    else {
        return Ok(None);
    };
    let (Some(away_id), Some(away_name), Some(away_score)) =
        (away.team_id, away.team_name.as_ref(), away.score)
    else {
        return Ok(None);
    };

    Ok(Some(GameParts {
        game_id: game.game_id.clone(),
        date,
        home_team_id: home_id.to_string(),
        away_team_id: away_id.to_string(),
        home_team_name: home_name.clone(),
        away_team_name: away_name.clone(),
        home_score,
        away_score,
        status,
    }))
}

/// Normalize live scoreboard games in upstream order.
pub fn normalize_live(
    games: &[LiveGame],
    ratings: &TeamRatings,
    policy: MissingOpponentPolicy,
) -> Result<Vec<GameRecord>, FetchError> {
    let mut out = Vec::with_capacity(games.len());
    for game in games {
        match to_parts(game)? {
            Some(parts) => out.push(parts.price(ratings)),
            None => match policy {
                MissingOpponentPolicy::Drop => {
                    debug!("Dropping live game {}: opponent unresolved", game.game_id);
                }
                MissingOpponentPolicy::Fail => {
                    return Err(NormalizeError::MissingOpponent {
                        game_id: game.game_id.clone(),
                    }
                    .into());
                }
            },
        }
    }
    Ok(out)
}
