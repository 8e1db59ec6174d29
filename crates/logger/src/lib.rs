/// VlrBet — Logger
/// JSONL event stream for match tracking, settlement and bet audit

use anyhow::Result;
use chrono::Utc;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

pub struct EventLogger {
    log_dir: PathBuf,
}

impl EventLogger {
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        let dir = log_dir.into();
        fs::create_dir_all(&dir).ok();
        Self { log_dir: dir }
    }

    pub fn log<T: Serialize>(&self, event: &T) -> Result<()> {
        let date  = Utc::now().format("%Y-%m-%d").to_string();
        let path  = self.log_dir.join(format!("{date}.jsonl"));
        let line  = serde_json::to_string(event)?;
        let mut f = OpenOptions::new().create(true).append(true).open(&path)?;
        writeln!(f, "{line}")?;
        Ok(())
    }
}

pub fn now_iso() -> String {
    Utc::now().to_rfc3339()
}

// ── Event types ───────────────────────────────────────────────────────────────

#[derive(Serialize, Debug)]
pub struct MatchTrackedEvent {
    pub ts:         String,
    pub event:      &'static str,    // "MATCH_TRACKED"
    pub match_id:   String,
    pub team1:      Option<String>,
    pub team2:      Option<String>,
    pub event_name: Option<String>,
}

#[derive(Serialize, Debug)]
pub struct MatchSettledEvent {
    pub ts:       String,
    pub event:    &'static str,      // "MATCH_SETTLED"
    pub match_id: String,
    pub winner:   String,            // "team1" | "team2"
    pub score1:   Option<u32>,
    pub score2:   Option<u32>,
}

#[derive(Serialize, Debug)]
pub struct SettlementCallEvent {
    pub ts:           String,
    pub event:        &'static str,  // "SETTLEMENT_CALL"
    pub match_id:     String,
    pub challenge_id: u64,
    pub player_id:    u8,            // 1 = team1, 2 = team2
    pub success:      bool,
    pub tx_hash:      Option<String>,
    pub error:        Option<String>,
}

#[derive(Serialize, Debug)]
pub struct BetPlacedEvent {
    pub ts:             String,
    pub event:          &'static str,  // "BET_PLACED"
    pub match_id:       String,
    pub team:           String,
    pub odds:           Option<f64>,
    pub amount:         Option<f64>,
    pub wallet_address: Option<String>,
}

#[derive(Serialize, Debug)]
pub struct ScrapeStatusEvent {
    pub ts:     String,
    pub event:  &'static str,        // "SCRAPE_STATUS"
    pub scope:  String,              // "populate" | "settle"
    pub ok:     bool,
    pub detail: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_append_as_one_json_line_each() {
        let dir = std::env::temp_dir().join(format!("vlrbet-logger-{}", std::process::id()));
        let logger = EventLogger::new(&dir);

        logger
            .log(&MatchTrackedEvent {
                ts: now_iso(),
                event: "MATCH_TRACKED",
                match_id: "/510602/fnatic-vs-sentinels".into(),
                team1: Some("Fnatic".into()),
                team2: Some("Sentinels".into()),
                event_name: None,
            })
            .unwrap();
        logger
            .log(&ScrapeStatusEvent {
                ts: now_iso(),
                event: "SCRAPE_STATUS",
                scope: "populate".into(),
                ok: true,
                detail: "2 live, 1 inserted".into(),
            })
            .unwrap();

        let date = Utc::now().format("%Y-%m-%d").to_string();
        let written = fs::read_to_string(dir.join(format!("{date}.jsonl"))).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("\"MATCH_TRACKED\""));
        assert!(lines[1].contains("\"SCRAPE_STATUS\""));

        fs::remove_dir_all(&dir).ok();
    }
}
