/// FaceitWatch — Logger
/// JSONL event stream (one file per UTC day)

use anyhow::Result;
use chrono::Utc;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

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

    pub fn dir(&self) -> &Path {
        &self.log_dir
    }
}

pub fn now_iso() -> String {
    Utc::now().to_rfc3339()
}

// ── Event typy ────────────────────────────────────────────────────────────────

#[derive(Serialize, Debug)]
pub struct ApiStatusEvent {
    pub ts:           String,
    pub event:        &'static str,   // "API_STATUS"
    pub source:       String,         // "faceit"
    pub scope:        String,         // endpoint, e.g. "history"
    pub ok:           bool,
    pub status_code:  Option<u16>,
    pub message:      String,
}

#[derive(Serialize, Debug)]
pub struct MatchNotifiedEvent {
    pub ts:           String,
    pub event:        &'static str,   // "MATCH_NOTIFIED"
    pub community:    String,
    pub match_id:     String,
    pub kind:         String,         // "individual" | "group"
    pub participants: Vec<String>,
    pub outcome:      String,
    pub destinations: usize,
    pub delivered:    usize,
}

#[derive(Serialize, Debug)]
pub struct EloChangeEvent {
    pub ts:           String,
    pub event:        &'static str,   // "ELO_CHANGE"
    pub player_id:    String,
    pub previous:     Option<i64>,    // None = first observation
    pub current:      i64,
    pub change:       i64,
}

#[derive(Serialize, Debug)]
pub struct PassHeartbeatEvent {
    pub ts:                 String,
    pub event:              &'static str,   // "PASS_HEARTBEAT"
    pub communities:        usize,
    pub clusters:           usize,
    pub notified_matches:   usize,
    pub notifications:      usize,
    pub skipped_seen:       usize,
    pub skipped_unfinished: usize,
    pub source_errors:      usize,
}

#[derive(Serialize, Debug)]
pub struct NotificationEvent {
    pub ts:           String,
    pub event:        &'static str,   // "NOTIFICATION"
    pub destination:  String,
    pub match_id:     String,
    pub title:        String,
    pub text:         String,
}
