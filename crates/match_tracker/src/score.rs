//! Round score, team and stat-bag helpers for match stats payloads.

use faceit_client::{PlayerStats, RoundStats};
use regex::Regex;
use std::sync::OnceLock;

fn int_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+").expect("static regex"))
}

/// First two integers of a score string: "13:7", "13 / 7", "13 7" → (13, 7).
pub fn parse_rounds(score: &str) -> Option<(u32, u32)> {
    let mut nums = int_re().find_iter(score).map(|m| m.as_str().parse::<u32>());
    match (nums.next(), nums.next()) {
        (Some(Ok(a)), Some(Ok(b))) => Some((a, b)),
        _ => None,
    }
}

/// Total rounds played, 0 when the score cannot be read.
pub fn rounds_played(score: &str) -> u32 {
    parse_rounds(score).map(|(a, b)| a + b).unwrap_or(0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Team {
    Team1,
    Team2,
}

impl Team {
    /// Accepts both vocabularies: "team1"/"faction1", "team2"/"faction2".
    pub fn from_label(label: &str) -> Option<Team> {
        match normalize_winner(label).as_str() {
            "team1" => Some(Team::Team1),
            "team2" => Some(Team::Team2),
            _ => None,
        }
    }

    pub fn from_index(idx: usize) -> Option<Team> {
        match idx {
            0 => Some(Team::Team1),
            1 => Some(Team::Team2),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Team::Team1 => "team1",
            Team::Team2 => "team2",
        }
    }
}

/// "faction1" → "team1"
pub fn normalize_winner(label: &str) -> String {
    label.trim().to_ascii_lowercase().replace("faction", "team")
}

/// Team whose roster contains the nickname (case-insensitive).
pub fn team_of(round: &RoundStats, nickname: &str) -> Option<Team> {
    round
        .teams
        .iter()
        .position(|t| t.players.iter().any(|p| p.nickname.eq_ignore_ascii_case(nickname)))
        .and_then(Team::from_index)
}

pub fn find_player<'a>(round: &'a RoundStats, nickname: &str) -> Option<(Team, &'a PlayerStats)> {
    round.teams.iter().enumerate().find_map(|(idx, team)| {
        let team_id = Team::from_index(idx)?;
        team.players
            .iter()
            .find(|p| p.nickname.eq_ignore_ascii_case(nickname))
            .map(|p| (team_id, p))
    })
}

/// "de_inferno" → "Inferno"
pub fn format_map_name(raw: &str) -> String {
    let name = raw.strip_prefix("de_").unwrap_or(raw);
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(|c| c.to_lowercase())).collect(),
        None => "Unknown Map".to_string(),
    }
}

pub fn stat_u32(stats: &PlayerStats, key: &str) -> Option<u32> {
    stats.number(key).filter(|v| *v >= 0.0).map(|v| v.round() as u32)
}

pub fn multi_kills(stats: &PlayerStats) -> u32 {
    ["Double Kills", "Triple Kills", "Quadro Kills", "Penta Kills"]
        .iter()
        .filter_map(|k| stat_u32(stats, k))
        .sum()
}

/// kills / deaths; zero deaths counts as kills.
pub fn kd_ratio(kills: Option<u32>, deaths: Option<u32>) -> Option<f64> {
    let (k, d) = (kills? as f64, deaths? as f64);
    let kd = if d > 0.0 { k / d } else { k };
    Some(round2(kd))
}

/// kills per round, `None` when no rounds could be derived.
pub fn kr_ratio(kills: Option<u32>, rounds: u32) -> Option<f64> {
    if rounds == 0 {
        return None;
    }
    Some(round2(kills? as f64 / rounds as f64))
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
