//! SQLite persistence for tracked live matches and the bets placed on them.
//!
//! One connection behind a mutex; every method takes the lock for the
//! duration of a single statement, so nothing holds it across an await.

use std::path::Path;
use std::sync::Mutex;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

/// Which side of a match a bet or a settlement refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeamSide {
    Team1,
    Team2,
}

impl TeamSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            TeamSide::Team1 => "team1",
            TeamSide::Team2 => "team2",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "team1" => Some(TeamSide::Team1),
            "team2" => Some(TeamSide::Team2),
            _ => None,
        }
    }

    /// Settlement contracts number the sides 1 and 2.
    pub fn player_id(&self) -> u8 {
        match self {
            TeamSide::Team1 => 1,
            TeamSide::Team2 => 2,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveMatchRecord {
    #[serde(rename = "matchID")]
    pub match_id: String,
    pub is_live: bool,
    pub team_won: Option<TeamSide>,
    pub created_at: String,
    pub settled_at: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BetRecord {
    pub id: i64,
    #[serde(rename = "matchID")]
    pub match_id: String,
    pub team: TeamSide,
    pub odds: Option<f64>,
    pub amount: Option<f64>,
    pub transaction_hash: Option<String>,
    pub wallet_address: Option<String>,
    pub placed_at: String,
}

/// Bet fields as they arrive from the API, before the store assigns id/time.
#[derive(Debug, Clone)]
pub struct NewBet {
    pub match_id: String,
    pub team: TeamSide,
    pub odds: Option<f64>,
    pub amount: Option<f64>,
    pub transaction_hash: Option<String>,
    pub wallet_address: Option<String>,
}

pub struct MatchStore {
    conn: Mutex<Connection>,
}

impl MatchStore {
    pub fn open(path: &str) -> rusqlite::Result<Self> {
        let db_path = Path::new(path);
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let conn = Connection::open(db_path)?;
        conn.pragma_update(None, "journal_mode", "WAL").ok();
        conn.pragma_update(None, "synchronous", "NORMAL").ok();
        init_schema(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> rusqlite::Result<Self> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    pub fn find_live_match(&self, match_id: &str) -> rusqlite::Result<Option<LiveMatchRecord>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT match_id, is_live, team_won, created_at, settled_at
             FROM live_matches WHERE match_id = ?1",
            params![match_id],
            row_to_match,
        )
        .optional()
    }

    /// Insert a fresh tracking stub. Returns false when the match is already
    /// tracked; INSERT OR IGNORE keeps concurrent inserts harmless.
    pub fn insert_live_match(&self, match_id: &str) -> rusqlite::Result<bool> {
        let conn = self.conn.lock().unwrap();
        let rows = conn.execute(
            "INSERT OR IGNORE INTO live_matches(match_id, is_live, created_at) VALUES (?1, 1, ?2)",
            params![match_id, Utc::now().to_rfc3339()],
        )?;
        Ok(rows > 0)
    }

    pub fn find_or_create_live_match(&self, match_id: &str) -> rusqlite::Result<LiveMatchRecord> {
        if let Some(record) = self.find_live_match(match_id)? {
            return Ok(record);
        }
        self.insert_live_match(match_id)?;
        // A concurrent insert may have beaten ours; either way the row exists now.
        self.find_live_match(match_id)?
            .ok_or(rusqlite::Error::QueryReturnedNoRows)
    }

    pub fn live_match_ids(&self) -> rusqlite::Result<Vec<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare("SELECT match_id FROM live_matches WHERE is_live = 1 ORDER BY created_at")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(ids)
    }

    /// Flip a still-live match to settled. The `is_live = 1` guard makes the
    /// transition one-way: a settled match never reverts or re-settles.
    pub fn mark_settled(&self, match_id: &str, winner: TeamSide) -> rusqlite::Result<bool> {
        let conn = self.conn.lock().unwrap();
        let rows = conn.execute(
            "UPDATE live_matches SET is_live = 0, team_won = ?1, settled_at = ?2
             WHERE match_id = ?3 AND is_live = 1",
            params![winner.as_str(), Utc::now().to_rfc3339(), match_id],
        )?;
        Ok(rows > 0)
    }

    pub fn insert_bet(&self, bet: NewBet) -> rusqlite::Result<BetRecord> {
        let placed_at = Utc::now().to_rfc3339();
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO match_bets(match_id, team, odds, amount, transaction_hash, wallet_address, placed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                bet.match_id,
                bet.team.as_str(),
                bet.odds,
                bet.amount,
                bet.transaction_hash,
                bet.wallet_address,
                placed_at,
            ],
        )?;
        Ok(BetRecord {
            id: conn.last_insert_rowid(),
            match_id: bet.match_id,
            team: bet.team,
            odds: bet.odds,
            amount: bet.amount,
            transaction_hash: bet.transaction_hash,
            wallet_address: bet.wallet_address,
            placed_at,
        })
    }

    pub fn count_bets_for_match(&self, match_id: &str) -> rusqlite::Result<i64> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT COUNT(*) FROM match_bets WHERE match_id = ?1",
            params![match_id],
            |row| row.get(0),
        )
    }
}

fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS live_matches (
            match_id   TEXT PRIMARY KEY,
            is_live    INTEGER NOT NULL DEFAULT 1,
            team_won   TEXT,
            created_at TEXT NOT NULL,
            settled_at TEXT
        );

        CREATE TABLE IF NOT EXISTS match_bets (
            id               INTEGER PRIMARY KEY AUTOINCREMENT,
            match_id         TEXT NOT NULL,
            team             TEXT NOT NULL,
            odds             REAL,
            amount           REAL,
            transaction_hash TEXT,
            wallet_address   TEXT,
            placed_at        TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_bets_match ON match_bets(match_id);
        "#,
    )
}

fn row_to_match(row: &rusqlite::Row) -> rusqlite::Result<LiveMatchRecord> {
    let team_won: Option<String> = row.get(2)?;
    Ok(LiveMatchRecord {
        match_id: row.get(0)?,
        is_live: row.get::<_, i64>(1)? == 1,
        team_won: team_won.as_deref().and_then(TeamSide::parse),
        created_at: row.get(3)?,
        settled_at: row.get(4)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_is_idempotent_per_match() {
        let store = MatchStore::open_in_memory().unwrap();
        assert!(store.insert_live_match("/510602/fnatic-vs-sentinels").unwrap());
        assert!(!store.insert_live_match("/510602/fnatic-vs-sentinels").unwrap());

        let record = store
            .find_live_match("/510602/fnatic-vs-sentinels")
            .unwrap()
            .unwrap();
        assert!(record.is_live);
        assert_eq!(record.team_won, None);
        assert_eq!(record.settled_at, None);
    }

    #[test]
    fn find_or_create_returns_the_existing_row() {
        let store = MatchStore::open_in_memory().unwrap();
        let first = store.find_or_create_live_match("/510603/a-vs-b").unwrap();
        let second = store.find_or_create_live_match("/510603/a-vs-b").unwrap();
        assert_eq!(first.created_at, second.created_at);
    }

    #[test]
    fn settling_is_one_way() {
        let store = MatchStore::open_in_memory().unwrap();
        store.insert_live_match("/510604/c-vs-d").unwrap();

        assert!(store.mark_settled("/510604/c-vs-d", TeamSide::Team2).unwrap());
        let record = store.find_live_match("/510604/c-vs-d").unwrap().unwrap();
        assert!(!record.is_live);
        assert_eq!(record.team_won, Some(TeamSide::Team2));
        assert!(record.settled_at.is_some());

        // A second settle finds no live row to update.
        assert!(!store.mark_settled("/510604/c-vs-d", TeamSide::Team1).unwrap());
        let record = store.find_live_match("/510604/c-vs-d").unwrap().unwrap();
        assert_eq!(record.team_won, Some(TeamSide::Team2));
    }

    #[test]
    fn live_ids_exclude_settled_matches() {
        let store = MatchStore::open_in_memory().unwrap();
        store.insert_live_match("/1/a").unwrap();
        store.insert_live_match("/2/b").unwrap();
        store.mark_settled("/1/a", TeamSide::Team1).unwrap();

        assert_eq!(store.live_match_ids().unwrap(), vec!["/2/b".to_string()]);
    }

    #[test]
    fn bets_round_trip_with_assigned_ids() {
        let store = MatchStore::open_in_memory().unwrap();
        store.insert_live_match("/3/c").unwrap();

        let bet = store
            .insert_bet(NewBet {
                match_id: "/3/c".into(),
                team: TeamSide::Team1,
                odds: Some(1.85),
                amount: Some(25.0),
                transaction_hash: Some("0xabc".into()),
                wallet_address: None,
            })
            .unwrap();
        assert!(bet.id > 0);
        assert_eq!(bet.team, TeamSide::Team1);

        let again = store
            .insert_bet(NewBet {
                match_id: "/3/c".into(),
                team: TeamSide::Team2,
                odds: None,
                amount: None,
                transaction_hash: None,
                wallet_address: None,
            })
            .unwrap();
        assert!(again.id > bet.id);
        assert_eq!(store.count_bets_for_match("/3/c").unwrap(), 2);
        assert_eq!(store.count_bets_for_match("/unknown").unwrap(), 0);
    }

    #[test]
    fn bet_wire_shape_uses_the_frontend_names() {
        let record = BetRecord {
            id: 7,
            match_id: "/3/c".into(),
            team: TeamSide::Team2,
            odds: Some(2.1),
            amount: Some(10.0),
            transaction_hash: None,
            wallet_address: Some("0xwallet".into()),
            placed_at: "2026-08-25T17:00:00Z".into(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["matchID"], "/3/c");
        assert_eq!(json["team"], "team2");
        assert_eq!(json["transactionHash"], serde_json::Value::Null);
        assert_eq!(json["walletAddress"], "0xwallet");
        assert_eq!(json["placedAt"], "2026-08-25T17:00:00Z");
    }
}
