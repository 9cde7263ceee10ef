#![allow(dead_code)]

use anyhow::{anyhow, bail, Result};
use faceit_client::{
    GameInfo, MatchDetails, MatchResults, MatchSource, MatchStats, MatchSummary, PlayerInfo,
};
use match_tracker::{AppState, EngineSettings, MatchNotification, Notifier, Reconciler};
use serde_json::json;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use tempfile::TempDir;

// ── Fake data source ─────────────────────────────────────────────────────────

#[derive(Default)]
pub struct FakeSource {
    pub players:         RefCell<HashMap<String, PlayerInfo>>,
    pub history:         RefCell<HashMap<String, Vec<MatchSummary>>>,
    pub details:         RefCell<HashMap<String, MatchDetails>>,
    pub stats:           RefCell<HashMap<String, MatchStats>>,
    pub failing_history: RefCell<HashSet<String>>,
    pub calls:           RefCell<Vec<String>>,
}

impl FakeSource {
    pub fn set_player(&self, nickname: &str, player_id: &str, elo: Option<i64>) {
        let mut games = HashMap::new();
        games.insert("cs2".to_string(), GameInfo { faceit_elo: elo, skill_level: None });
        self.players.borrow_mut().insert(
            player_id.to_string(),
            PlayerInfo { player_id: player_id.into(), nickname: nickname.into(), games },
        );
    }

    pub fn remove_player(&self, player_id: &str) {
        self.players.borrow_mut().remove(player_id);
    }

    pub fn set_history(&self, player_id: &str, match_ids: &[&str]) {
        let items = match_ids
            .iter()
            .enumerate()
            .map(|(i, m)| MatchSummary {
                match_id:    m.to_string(),
                finished_at: Some(1_700_000_000 + i as i64),
                status:      Some("FINISHED".into()),
            })
            .collect();
        self.history.borrow_mut().insert(player_id.to_string(), items);
    }

    pub fn set_match(&self, match_id: &str, status: &str, winner: &str) {
        self.details.borrow_mut().insert(
            match_id.to_string(),
            MatchDetails {
                match_id:    match_id.into(),
                status:      status.into(),
                game:        Some("cs2".into()),
                faceit_url:  Some(format!("https://www.faceit.com/{{lang}}/cs2/room/{match_id}")),
                finished_at: Some(1_700_000_000),
                results:     Some(MatchResults { winner: Some(winner.into()) }),
            },
        );
    }

    /// Rosters by nickname; every player gets the same stat line apart from ADR.
    pub fn set_stats(&self, match_id: &str, team1: &[&str], team2: &[&str]) {
        let roster = |names: &[&str]| {
            names
                .iter()
                .enumerate()
                .map(|(i, n)| json!({
                    "player_id": format!("roster-{n}"),
                    "nickname": n,
                    "player_stats": {
                        "Kills": "18", "Deaths": "12", "Assists": "5",
                        "K/D Ratio": "1.5", "ADR": format!("{}", 70 + i * 10),
                        "Triple Kills": "1", "Utility Damage": "40"
                    }
                }))
                .collect::<Vec<_>>()
        };
        let stats = serde_json::from_value(json!({
            "rounds": [{
                "round_stats": { "Score": "13 / 9", "Map": "de_nuke" },
                "teams": [ { "players": roster(team1) }, { "players": roster(team2) } ]
            }]
        }))
        .unwrap();
        self.stats.borrow_mut().insert(match_id.to_string(), stats);
    }

    pub fn calls_matching(&self, prefix: &str) -> usize {
        self.calls.borrow().iter().filter(|c| c.starts_with(prefix)).count()
    }
}

impl MatchSource for FakeSource {
    async fn fetch_player(&self, nickname_or_id: &str) -> Result<Option<PlayerInfo>> {
        self.calls.borrow_mut().push(format!("player:{nickname_or_id}"));
        let players = self.players.borrow();
        Ok(players
            .get(nickname_or_id)
            .or_else(|| {
                players
                    .values()
                    .find(|p| p.nickname.eq_ignore_ascii_case(nickname_or_id))
            })
            .cloned())
    }

    async fn fetch_player_history(
        &self,
        player_id: &str,
        _game: &str,
        limit: u32,
    ) -> Result<Vec<MatchSummary>> {
        self.calls.borrow_mut().push(format!("history:{player_id}"));
        if self.failing_history.borrow().contains(player_id) {
            bail!("history unavailable");
        }
        let mut items = self.history.borrow().get(player_id).cloned().unwrap_or_default();
        items.truncate(limit as usize);
        Ok(items)
    }

    async fn fetch_match_details(&self, match_id: &str) -> Result<MatchDetails> {
        self.calls.borrow_mut().push(format!("details:{match_id}"));
        self.details
            .borrow()
            .get(match_id)
            .cloned()
            .ok_or_else(|| anyhow!("no match {match_id}"))
    }

    async fn fetch_match_stats(&self, match_id: &str) -> Result<MatchStats> {
        self.calls.borrow_mut().push(format!("stats:{match_id}"));
        self.stats
            .borrow()
            .get(match_id)
            .cloned()
            .ok_or_else(|| anyhow!("no stats {match_id}"))
    }
}

// ── Recording emitter ────────────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingNotifier {
    pub sent:     RefCell<Vec<(String, MatchNotification)>>,
    pub attempts: Cell<usize>,
    pub fail:     Cell<bool>,
}

impl RecordingNotifier {
    pub fn take(&self) -> Vec<(String, MatchNotification)> {
        std::mem::take(&mut *self.sent.borrow_mut())
    }
}

impl Notifier for RecordingNotifier {
    async fn deliver(&self, destination: &str, notification: &MatchNotification) -> Result<()> {
        self.attempts.set(self.attempts.get() + 1);
        if self.fail.get() {
            bail!("channel unavailable");
        }
        self.sent
            .borrow_mut()
            .push((destination.to_string(), notification.clone()));
        Ok(())
    }
}

// ── Fixture ──────────────────────────────────────────────────────────────────

pub struct Fixture {
    pub dir:        TempDir,
    pub state:      AppState,
    pub reconciler: Reconciler<FakeSource, RecordingNotifier>,
}

impl Fixture {
    /// Community "G1" tracking alice(A1), bob(B1), carol(C1), one destination.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut state = load_state(&dir);
        for (name, id) in [("alice", "A1"), ("bob", "B1"), ("carol", "C1")] {
            state.tracking.add_player("G1", name, id);
        }
        state.tracking.add_destination("G1", "chan-1");

        let source = FakeSource::default();
        source.set_player("alice", "A1", Some(2000));
        source.set_player("bob", "B1", Some(1800));
        source.set_player("carol", "C1", Some(1600));

        let reconciler = Reconciler::new(
            source,
            RecordingNotifier::default(),
            EngineSettings::default(),
            dir.path().join("logs"),
        );
        Self { dir, state, reconciler }
    }

    pub fn source(&self) -> &FakeSource {
        self.reconciler.source()
    }

    pub fn notifier(&self) -> &RecordingNotifier {
        self.reconciler.notifier()
    }

    pub fn reload_state(&self) -> AppState {
        load_state(&self.dir)
    }
}

pub fn load_state(dir: &TempDir) -> AppState {
    AppState::load(
        dir.path().join("tracked_players.json"),
        dir.path().join("player_elo_history.json"),
        50,
    )
}
