//! Read side of the crate: every query a caller can make, each one a
//! cached, retried call to the feed followed by normalization.

use anyhow::Result;
use chrono::{Local, NaiveDate};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::FetchError;
use crate::feed::{NbaClient, StatsFeed, StatsTable};
use crate::fetch::{CachePolicy, Fetched, ResultCache, RetryingFetcher};
use crate::games::{self, live, GameRecord, MissingOpponentPolicy};
use crate::ratings::TeamRatings;
use crate::stats::{
    roster_averages, LastGameLine, PlayerAverages, PlayerProfile, TeamProfile, TeamSeasonSummary,
};

pub const DEFAULT_SEASON: &str = "2024-25";
const LEAGUE_ID: &str = "00";
const SEASON_TYPE: &str = "Regular Season";

const SCOREBOARD_OP: &str = "scoreboard";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamOverview {
    pub profile: Option<TeamProfile>,
    pub season: Option<TeamSeasonSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerOverview {
    pub profile: Option<PlayerProfile>,
    /// `None` when the game log is empty or could not be fetched.
    pub last_game: Option<LastGameLine>,
}

pub struct GameService {
    feed: Box<dyn StatsFeed>,
    fetcher: RetryingFetcher,
    cache: ResultCache<Value>,
    ratings: TeamRatings,
    missing_opponent: MissingOpponentPolicy,
    season: String,
}

impl GameService {
    pub fn new(feed: Box<dyn StatsFeed>, fetcher: RetryingFetcher, ratings: TeamRatings) -> Self {
        GameService {
            feed,
            fetcher,
            cache: ResultCache::disabled(),
            ratings,
            missing_opponent: MissingOpponentPolicy::default(),
            season: DEFAULT_SEASON.to_string(),
        }
    }

    /// Wire the HTTP client, retry policy, cache and rating table from config.
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = NbaClient::new(
            &config.scoreboard_url,
            &config.stats_url,
            config.request_timeout(),
        )?;
        let ratings = match &config.ratings_path {
            Some(path) => TeamRatings::load(path)?,
            None => TeamRatings::default(),
        };
        let policy = config.retry_policy();
        info!(
            "Feed {} ready: {} attempts, worst case {:?} of backoff",
            client.name(),
            policy.max_attempts,
            policy.worst_case()
        );
        Ok(GameService::new(Box::new(client), RetryingFetcher::new(policy), ratings)
            .with_cache(config.cache_policy())
            .with_missing_opponent(config.missing_opponent)
            .with_season(&config.season))
    }

    pub fn with_cache(mut self, policy: CachePolicy) -> Self {
        self.cache = ResultCache::new(policy);
        self
    }

    pub fn with_missing_opponent(mut self, policy: MissingOpponentPolicy) -> Self {
        self.missing_opponent = policy;
        self
    }

    pub fn with_season(mut self, season: &str) -> Self {
        self.season = season.to_string();
        self
    }

    pub fn season(&self) -> &str {
        &self.season
    }

    pub fn ratings(&self) -> &TeamRatings {
        &self.ratings
    }

    /// Drop every cached response.
    pub fn refresh(&self) {
        self.cache.clear();
    }

    // ── Games ────────────────────────────────────────────────────────────────

    pub fn todays_games(&self) -> Result<Fetched<Vec<GameRecord>>, FetchError> {
        let raw = self.cache.get_or_fetch(SCOREBOARD_OP, "", || {
            self.fetcher.fetch(|| self.feed.scoreboard())
        })?;
        raw.and_then(|raw| {
            let games = live::parse_scoreboard(&raw)?;
            games::normalize_live(&games, &self.ratings, self.missing_opponent)
        })
    }

    /// Every finished game of the configured season.
    pub fn season_games(&self) -> Result<Fetched<Vec<GameRecord>>, FetchError> {
        let table = self.stats_table(
            "leaguegamefinder",
            &[("LeagueID", LEAGUE_ID.to_string()), ("Season", self.season.clone())],
        )?;
        table.and_then(|t| games::normalize_historical(&t, &self.ratings, self.missing_opponent))
    }

    /// Games on `date`. Today comes from the live scoreboard so scheduled
    /// and in-progress games show up; any other day from the season table.
    pub fn games_on(&self, date: NaiveDate) -> Result<Fetched<Vec<GameRecord>>, FetchError> {
        self.games_on_at(date, Local::now().date_naive())
    }

    pub fn games_on_at(
        &self,
        date: NaiveDate,
        today: NaiveDate,
    ) -> Result<Fetched<Vec<GameRecord>>, FetchError> {
        let fetched = if date == today {
            self.todays_games()?
        } else {
            self.season_games()?
        };
        Ok(fetched.map(|all| games::on_date(all, date)))
    }

    /// `Data(None)` when the season has no game with that id.
    pub fn game_by_id(&self, game_id: &str) -> Result<Fetched<Option<GameRecord>>, FetchError> {
        Ok(self.season_games()?.map(|all| games::by_id(all, game_id)))
    }

    // ── Teams & players ──────────────────────────────────────────────────────

    pub fn team_overview(&self, team_id: &str) -> Result<Fetched<TeamOverview>, FetchError> {
        let params = [("TeamID", team_id.to_string())];
        let Fetched::Data(details) = self.stats_table("teamdetails", &params)? else {
            return Ok(Fetched::Unavailable);
        };
        let Fetched::Data(history) = self.stats_table("teamyearbyyearstats", &params)? else {
            return Ok(Fetched::Unavailable);
        };
        Ok(Fetched::Data(TeamOverview {
            profile: TeamProfile::from_table(&details),
            season: TeamSeasonSummary::from_table(&history),
        }))
    }

    /// Per-game averages of the team's current roster. Players whose career
    /// stats stay unreachable are left out.
    pub fn roster_averages(&self, team_id: &str) -> Result<Fetched<Vec<PlayerAverages>>, FetchError> {
        let roster = self.stats_table(
            "commonteamroster",
            &[("TeamID", team_id.to_string()), ("Season", self.season.clone())],
        )?;
        roster.and_then(|roster| {
            roster_averages(&roster, |player_id| {
                let career = self.stats_table(
                    "playercareerstats",
                    &[("PlayerID", player_id.to_string()), ("PerMode", "Totals".to_string())],
                )?;
                if career.is_unavailable() {
                    warn!("Career stats for player {} unavailable", player_id);
                }
                Ok(career.into_option())
            })
        })
    }

    pub fn player_overview(
        &self,
        player_id: &str,
        season: Option<&str>,
    ) -> Result<Fetched<PlayerOverview>, FetchError> {
        let Fetched::Data(info) =
            self.stats_table("commonplayerinfo", &[("PlayerID", player_id.to_string())])?
        else {
            return Ok(Fetched::Unavailable);
        };
        let log = self.stats_table(
            "playergamelog",
            &[
                ("PlayerID", player_id.to_string()),
                ("Season", season.unwrap_or(&self.season).to_string()),
                ("SeasonType", SEASON_TYPE.to_string()),
            ],
        )?;
        Ok(Fetched::Data(PlayerOverview {
            profile: PlayerProfile::from_table(&info),
            last_game: log.into_option().as_ref().and_then(LastGameLine::from_table),
        }))
    }

    // ── Raw tables ───────────────────────────────────────────────────────────

    /// First result set of a stats endpoint, cached under `stats:<endpoint>`.
    pub fn stats_table(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<Fetched<StatsTable>, FetchError> {
        let operation = format!("stats:{}", endpoint);
        let raw = self.cache.get_or_fetch(&operation, &cache_args(params), || {
            self.fetcher.fetch(|| self.feed.stats(endpoint, params))
        })?;
        raw.and_then(|raw| StatsTable::from_response(&raw))
    }
}

fn cache_args(params: &[(&str, String)]) -> String {
    let mut pairs: Vec<String> = params.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
    pairs.sort();
    pairs.join("&")
}
