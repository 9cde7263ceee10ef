//! FaceitWatch — match tracking core
//!
//! Tracking Store + ELO Ledger (JSON, write-through), reconciliation engine
//! with match deduplication and group-match correlation, payload shaping,
//! delivery and the chat-style command surface.

pub mod commands;
pub mod config;
pub mod elo;
pub mod engine;
pub mod notification;
pub mod notify;
pub mod score;
pub mod store;

use std::path::PathBuf;

use crate::elo::EloLedger;
use crate::store::TrackingStore;

pub use commands::{execute, parse_line, Command, Reply};
pub use config::WatchConfig;
pub use engine::{EngineSettings, MatchCluster, PassReport, Reconciler, GROUP_THRESHOLD};
pub use notification::{MatchNotification, NotificationKind, Outcome, PlayerRow};
pub use notify::{AnyNotifier, DiscordNotifier, LogNotifier, Notifier};

/// All mutable state of the process. Built once at startup and handed by
/// `&mut` to the engine and command handlers; nothing else owns a copy.
pub struct AppState {
    pub tracking: TrackingStore,
    pub elo:      EloLedger,
}

impl AppState {
    pub fn load(
        tracked_players_file: impl Into<PathBuf>,
        elo_history_file:     impl Into<PathBuf>,
        seen_list_cap:        usize,
    ) -> Self {
        Self {
            tracking: TrackingStore::load(tracked_players_file, seen_list_cap),
            elo:      EloLedger::load(elo_history_file),
        }
    }

    pub fn from_config(cfg: &WatchConfig) -> Self {
        Self::load(cfg.tracked_players_file.clone(), cfg.elo_history_file.clone(), cfg.seen_list_cap)
    }
}
