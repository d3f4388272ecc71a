use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::info;

use basketboule::auth::{Session, User};
use basketboule::config::{Command, Config};
use basketboule::db::models::NewBet;
use basketboule::db::Database;
use basketboule::fallback::fallback_lines;
use basketboule::games::GameRecord;
use basketboule::service::{PlayerOverview, TeamOverview};
use basketboule::stats::PlayerAverages;
use basketboule::{Fetched, GameService};

fn main() -> Result<()> {
    // Initialise tracing / logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::parse();
    config.validate()?;

    let service = GameService::from_config(&config)?;

    match &config.command {
        Command::Today => {
            if let Some(games) = available(service.todays_games()?) {
                print_games(&config, &games)?;
            }
        }
        Command::Games { date } => {
            let fetched = match date {
                Some(d) => service.games_on(*d)?,
                None => service.season_games()?,
            };
            if let Some(games) = available(fetched) {
                print_games(&config, &games)?;
            }
        }
        Command::Game { id } => {
            if let Some(game) = available(service.game_by_id(id)?) {
                match game {
                    Some(g) => print_games(&config, std::slice::from_ref(&g))?,
                    None => println!("No game {} in season {}", id, service.season()),
                }
            }
        }
        Command::Team { team_id } => {
            if let Some(overview) = available(service.team_overview(team_id)?) {
                let roster = service.roster_averages(team_id)?.into_option();
                if config.json {
                    print_json(&serde_json::json!({ "team": overview, "roster": roster }))?;
                } else {
                    print_team(&overview);
                    println!("\nRoster (per game)");
                    for line in roster_lines(roster.as_deref()) {
                        println!("{}", line);
                    }
                }
            }
        }
        Command::Player { player_id, season } => {
            if let Some(overview) = available(service.player_overview(player_id, season.as_deref())?) {
                if config.json {
                    print_json(&overview)?;
                } else {
                    print_player(&overview);
                }
            }
        }
        Command::Bet {
            game_id,
            pick,
            stake,
        } => {
            let session = session(&config)?;
            let db = open_db(&config)?;
            let Some(games) = available(service.todays_games()?) else {
                return Ok(());
            };
            let game = games
                .iter()
                .find(|g| &g.game_id == game_id)
                .with_context(|| format!("Game {} is not on today's slate", game_id))?;
            let new_bet = NewBet::for_game(&session, game, *pick, *stake)?;
            let bet = db.place_bet(&new_bet)?;
            info!(
                "Bet {} placed: {:.2} on {} at {:.2}",
                bet.id, bet.stake, bet.chosen_team, bet.odds
            );
            if config.json {
                print_json(&bet)?;
            } else {
                println!(
                    "Bet placed on {} @ {:.2}. Potential payout: {:.2}",
                    bet.chosen_team, bet.odds, bet.payout
                );
            }
        }
        Command::Bets => {
            let session = session(&config)?;
            let db = open_db(&config)?;
            let bets = db.bets_for_user(session.user_id())?;
            if config.json {
                print_json(&bets)?;
            } else if bets.is_empty() {
                println!("No bets yet.");
            } else {
                for b in &bets {
                    println!(
                        "{}  {} vs {}  {:<14} stake {:>8.2} @ {:>5.2} -> {:>8.2}",
                        b.date, b.home_team, b.away_team, b.chosen_team, b.stake, b.odds, b.payout
                    );
                }
                let summary = db.summary_for_user(session.user_id())?;
                println!(
                    "{} bet(s), {:.2} staked, {:.2} potential payout",
                    summary.bets, summary.total_staked, summary.potential_payout
                );
            }
        }
        Command::ResetBets => {
            let session = session(&config)?;
            let db = open_db(&config)?;
            let removed = db.reset_bets(session.user_id())?;
            println!("Betting history reset ({} bet(s) removed).", removed);
        }
    }

    Ok(())
}

/// Unwrap data, or print the fallback facts when the feed stayed down.
fn available<T>(fetched: Fetched<T>) -> Option<T> {
    match fetched {
        Fetched::Data(v) => Some(v),
        Fetched::Unavailable => {
            for line in fallback_lines() {
                println!("{}", line);
            }
            None
        }
    }
}

fn session(config: &Config) -> Result<Session> {
    let id = config
        .user
        .clone()
        .context("--user is required for ledger commands")?;
    Ok(Session::new(User {
        email: id.clone(),
        id,
    }))
}

fn open_db(config: &Config) -> Result<Database> {
    let db = Database::open(&config.database_path)
        .with_context(|| format!("Failed to open ledger {}", config.database_path))?;
    info!("Database opened: {}", config.database_path);
    Ok(db)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_games(config: &Config, games: &[GameRecord]) -> Result<()> {
    if config.json {
        return print_json(games);
    }
    if games.is_empty() {
        println!("No games.");
        return Ok(());
    }
    for g in games {
        println!(
            "{}  {}  {:>3} {:<14} {:>3} {:<14} {:?}  odds {:.2} / {:.2}  winner: {}",
            g.game_id,
            g.date,
            g.home_score,
            g.home_team_name,
            g.away_score,
            g.away_team_name,
            g.status,
            g.home_odds(),
            g.away_odds(),
            g.winning_team()
        );
    }
    Ok(())
}

fn print_team(overview: &TeamOverview) {
    if let Some(p) = &overview.profile {
        println!(
            "{} (founded {}), arena {}",
            p.city.as_deref().unwrap_or("?"),
            p.year_founded.as_deref().unwrap_or("?"),
            p.arena.as_deref().unwrap_or("?")
        );
        println!(
            "Owner {} | GM {} | Coach {} | G League {}",
            p.owner.as_deref().unwrap_or("-"),
            p.general_manager.as_deref().unwrap_or("-"),
            p.head_coach.as_deref().unwrap_or("-"),
            p.dleague_affiliation.as_deref().unwrap_or("-")
        );
    }
    if let Some(s) = &overview.season {
        println!(
            "{}: {}-{}, conference rank {}, win% {:.3}",
            s.year.as_deref().unwrap_or("?"),
            s.wins.unwrap_or(0),
            s.losses.unwrap_or(0),
            s.conference_rank.map_or("-".to_string(), |r| r.to_string()),
            s.win_pct.unwrap_or(0.0)
        );
    }
}

/// `None` means the roster itself could not be fetched.
fn roster_lines(roster: Option<&[PlayerAverages]>) -> Vec<String> {
    match roster {
        None => vec!["  Roster data not available.".to_string()],
        Some([]) => vec!["  No players found.".to_string()],
        Some(players) => players
            .iter()
            .map(|p| {
                format!(
                    "  #{:<3} {:<24} {:<5} {:>5.1} pts {:>4.1} ast {:>4.1} reb",
                    p.number.as_deref().unwrap_or("-"),
                    p.name,
                    p.position.as_deref().unwrap_or("-"),
                    p.points,
                    p.assists,
                    p.rebounds
                )
            })
            .collect(),
    }
}

fn print_player(overview: &PlayerOverview) {
    if let Some(p) = &overview.profile {
        println!(
            "{} | {} | {} | {} lbs | {}",
            p.team_name.as_deref().unwrap_or("Free agent"),
            p.position.as_deref().unwrap_or("-"),
            p.height.as_deref().unwrap_or("-"),
            p.weight.as_deref().unwrap_or("-"),
            p.country.as_deref().unwrap_or("-")
        );
    }
    match &overview.last_game {
        Some(g) => println!(
            "Last game {} {}: {} pts, {} reb, {} ast, {} stl, {} blk in {} min",
            g.game_date.as_deref().unwrap_or("?"),
            g.matchup.as_deref().unwrap_or("?"),
            g.points.unwrap_or(0.0),
            g.rebounds.unwrap_or(0.0),
            g.assists.unwrap_or(0.0),
            g.steals.unwrap_or(0.0),
            g.blocks.unwrap_or(0.0),
            g.minutes.unwrap_or(0.0)
        ),
        None => println!("No recent game found."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_roster_is_reported() {
        assert_eq!(roster_lines(None), vec!["  Roster data not available."]);
        assert_eq!(roster_lines(Some(&[][..])), vec!["  No players found."]);

        let tatum = PlayerAverages {
            player_id: "1628369".into(),
            name: "Jayson Tatum".into(),
            number: Some("0".into()),
            position: Some("F-G".into()),
            points: 26.9,
            assists: 4.9,
            rebounds: 8.1,
        };
        let lines = roster_lines(Some(std::slice::from_ref(&tatum)));
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("Jayson Tatum"));
        assert!(lines[0].contains("26.9 pts"));
    }
}
