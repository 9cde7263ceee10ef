// ── FACEIT Data API v4 structs ───────────────────────────────────────────────

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct PlayerInfo {
    pub player_id: String,
    #[serde(default)]
    pub nickname:  String,
    #[serde(default)]
    pub games:     HashMap<String, GameInfo>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct GameInfo {
    pub faceit_elo:  Option<i64>,
    pub skill_level: Option<u32>,
}

impl PlayerInfo {
    /// First present `faceit_elo` wins: primary game, then the legacy key.
    pub fn rating(&self, primary: &str, legacy: &str) -> Option<i64> {
        [primary, legacy]
            .iter()
            .filter_map(|g| self.games.get(*g))
            .find_map(|g| g.faceit_elo)
    }
}

#[derive(Deserialize, Debug, Default)]
pub struct HistoryResponse {
    #[serde(default)]
    pub items: Vec<MatchSummary>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct MatchSummary {
    #[serde(default)]
    pub match_id:    String,
    pub finished_at: Option<i64>,   // unix seconds
    pub status:      Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct MatchDetails {
    pub match_id:    String,
    #[serde(default)]
    pub status:      String,        // "FINISHED" | "ONGOING" | "CANCELLED" ...
    pub game:        Option<String>,
    pub faceit_url:  Option<String>,
    pub finished_at: Option<i64>,
    pub results:     Option<MatchResults>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct MatchResults {
    pub winner: Option<String>,     // "faction1" | "faction2" (sometimes "team1")
}

impl MatchDetails {
    pub fn is_finished(&self) -> bool {
        self.status == "FINISHED"
    }

    pub fn winner(&self) -> Option<&str> {
        self.results.as_ref().and_then(|r| r.winner.as_deref())
    }

    /// Public match page, `{lang}` placeholder resolved.
    pub fn url(&self) -> Option<String> {
        self.faceit_url
            .as_ref()
            .filter(|u| !u.is_empty())
            .map(|u| u.replace("{lang}", "en"))
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct MatchStats {
    #[serde(default)]
    pub rounds: Vec<RoundStats>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct RoundStats {
    /// "Score", "Map", "Winner", "Rounds" ...
    #[serde(default)]
    pub round_stats: HashMap<String, Value>,
    #[serde(default)]
    pub teams:       Vec<TeamStats>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct TeamStats {
    pub team_id: Option<String>,
    #[serde(default)]
    pub players: Vec<PlayerStats>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct PlayerStats {
    #[serde(default)]
    pub player_id:    String,
    #[serde(default)]
    pub nickname:     String,
    /// "Kills", "Deaths", "K/D Ratio", "ADR" ... values are usually strings
    #[serde(default)]
    pub player_stats: HashMap<String, Value>,
}

impl RoundStats {
    pub fn text(&self, key: &str) -> Option<String> {
        value_text(self.round_stats.get(key)?)
    }
}

impl PlayerStats {
    pub fn number(&self, key: &str) -> Option<f64> {
        value_number(self.player_stats.get(key)?)
    }
}

fn value_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn value_number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
