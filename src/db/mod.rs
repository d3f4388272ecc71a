use anyhow::{anyhow, Result};
use chrono::Utc;
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex, MutexGuard};

pub mod models;
use models::*;

/// Simulated bet ledger (single SQLite connection behind a mutex)
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the SQLite database at the given path
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Database::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Database::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        let db = Database {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Run schema migrations (idempotent)
    fn run_migrations(&self) -> Result<()> {
        self.conn()?.execute_batch(SCHEMA_SQL)?;
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("database connection lock poisoned"))
    }

    // ── Bets ─────────────────────────────────────────────────────────────────

    /// Insert a new bet, returning the stored row
    pub fn place_bet(&self, bet: &NewBet) -> Result<Bet> {
        let conn = self.conn()?;
        let placed_at = Utc::now();
        conn.execute(
            "INSERT INTO bets (
                user_id, game_id, date, home_team, away_team,
                chosen_team, odds, stake, payout, placed_at
             ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10)",
            params![
                bet.user_id,
                bet.game_id,
                bet.date,
                bet.home_team,
                bet.away_team,
                bet.chosen_team,
                bet.odds,
                bet.stake,
                bet.payout,
                placed_at,
            ],
        )?;
        Ok(Bet {
            id: conn.last_insert_rowid(),
            user_id: bet.user_id.clone(),
            game_id: bet.game_id.clone(),
            date: bet.date,
            home_team: bet.home_team.clone(),
            away_team: bet.away_team.clone(),
            chosen_team: bet.chosen_team.clone(),
            odds: bet.odds,
            stake: bet.stake,
            payout: bet.payout,
            placed_at,
        })
    }

    /// One user's bets, newest first
    pub fn bets_for_user(&self, user_id: &str) -> Result<Vec<Bet>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, game_id, date, home_team, away_team,
                    chosen_team, odds, stake, payout, placed_at
             FROM bets WHERE user_id = ?1 ORDER BY placed_at DESC, id DESC",
        )?;
        let bets = stmt
            .query_map(params![user_id], map_bet)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(bets)
    }

    /// Delete one user's betting history, returning how many rows went away
    pub fn reset_bets(&self, user_id: &str) -> Result<usize> {
        let conn = self.conn()?;
        let removed = conn.execute("DELETE FROM bets WHERE user_id = ?1", params![user_id])?;
        Ok(removed)
    }

    pub fn summary_for_user(&self, user_id: &str) -> Result<BetSummary> {
        let conn = self.conn()?;
        let summary = conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(stake), 0), COALESCE(SUM(payout), 0)
             FROM bets WHERE user_id = ?1",
            params![user_id],
            |r| {
                Ok(BetSummary {
                    bets: r.get(0)?,
                    total_staked: r.get(1)?,
                    potential_payout: r.get(2)?,
                })
            },
        )?;
        Ok(summary)
    }
}

// ── SQL helpers ────────────────────────────────────────────────────────────────

fn map_bet(row: &rusqlite::Row) -> rusqlite::Result<Bet> {
    Ok(Bet {
        id: row.get(0)?,
        user_id: row.get(1)?,
        game_id: row.get(2)?,
        date: row.get(3)?,
        home_team: row.get(4)?,
        away_team: row.get(5)?,
        chosen_team: row.get(6)?,
        odds: row.get(7)?,
        stake: row.get(8)?,
        payout: row.get(9)?,
        placed_at: row.get(10)?,
    })
}

/// SQLite schema (idempotent CREATE IF NOT EXISTS)
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS bets (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id     TEXT    NOT NULL,
    game_id     TEXT    NOT NULL,
    date        TEXT    NOT NULL,
    home_team   TEXT    NOT NULL,
    away_team   TEXT    NOT NULL,
    chosen_team TEXT    NOT NULL,
    odds        REAL    NOT NULL,
    stake       REAL    NOT NULL,
    payout      REAL    NOT NULL,
    placed_at   TEXT    NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_bets_user ON bets(user_id);
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Session, User};
    use crate::games::fixtures::record;
    use crate::games::GameStatus;
    use approx::assert_relative_eq;

    fn session(id: &str) -> Session {
        Session::new(User {
            id: id.into(),
            email: format!("{}@example.com", id),
        })
    }

    #[test]
    fn test_place_and_list_scoped_to_user() {
        let db = Database::open_in_memory().unwrap();
        let game = record(0, 0, GameStatus::Scheduled);

        let a = NewBet::for_game(&session("alice"), &game, Pick::Home, 10.0).unwrap();
        let b = NewBet::for_game(&session("bob"), &game, Pick::Away, 5.0).unwrap();
        let stored = db.place_bet(&a).unwrap();
        db.place_bet(&b).unwrap();

        let alice = db.bets_for_user("alice").unwrap();
        assert_eq!(alice.len(), 1);
        assert_eq!(alice[0].id, stored.id);
        assert_eq!(alice[0].game_id, "0022400061");
        assert_eq!(alice[0].chosen_team, "Celtics");
        assert_eq!(alice[0].date, game.date);
        assert_relative_eq!(alice[0].payout, 20.0);
    }

    #[test]
    fn test_newest_first() {
        let db = Database::open_in_memory().unwrap();
        let game = record(0, 0, GameStatus::Live);
        for stake in [1.0, 2.0, 3.0] {
            let bet = NewBet::for_game(&session("alice"), &game, Pick::Home, stake).unwrap();
            db.place_bet(&bet).unwrap();
        }
        let stakes: Vec<f64> = db
            .bets_for_user("alice")
            .unwrap()
            .iter()
            .map(|b| b.stake)
            .collect();
        assert_eq!(stakes, vec![3.0, 2.0, 1.0]);
    }

    #[test]
    fn test_reset_only_touches_one_user() {
        let db = Database::open_in_memory().unwrap();
        let game = record(0, 0, GameStatus::Scheduled);
        for who in ["alice", "alice", "bob"] {
            let bet = NewBet::for_game(&session(who), &game, Pick::Home, 4.0).unwrap();
            db.place_bet(&bet).unwrap();
        }

        assert_eq!(db.reset_bets("alice").unwrap(), 2);
        assert!(db.bets_for_user("alice").unwrap().is_empty());
        assert_eq!(db.bets_for_user("bob").unwrap().len(), 1);
    }

    #[test]
    fn test_summary() {
        let db = Database::open_in_memory().unwrap();
        let empty = db.summary_for_user("carol").unwrap();
        assert_eq!(empty.bets, 0);
        assert_relative_eq!(empty.total_staked, 0.0);

        let game = record(0, 0, GameStatus::Scheduled);
        for stake in [10.0, 15.0] {
            let bet = NewBet::for_game(&session("carol"), &game, Pick::Away, stake).unwrap();
            db.place_bet(&bet).unwrap();
        }
        let s = db.summary_for_user("carol").unwrap();
        assert_eq!(s.bets, 2);
        assert_relative_eq!(s.total_staked, 25.0);
        assert_relative_eq!(s.potential_payout, 50.0);
    }
}
