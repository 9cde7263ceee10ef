//! Notification payload shaping. Pure: all network and ledger work happens
//! before these builders run.

use chrono::{DateTime, TimeZone, Utc};
use faceit_client::{format_time, MatchDetails, MatchStats, PlayerStats, RoundStats};
use std::collections::HashMap;
use std::fmt::Write as _;

use crate::elo::display_change;
use crate::score::{
    find_player, format_map_name, kd_ratio, kr_ratio, multi_kills, rounds_played, stat_u32, Team,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Win,
    Loss,
    Unknown,
}

impl Outcome {
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Win => "WIN",
            Outcome::Loss => "LOSS",
            Outcome::Unknown => "UNKNOWN",
        }
    }

    fn for_team(team: Option<Team>, winner: Option<Team>) -> Outcome {
        match (team, winner) {
            (Some(t), Some(w)) if t == w => Outcome::Win,
            (Some(_), Some(_)) => Outcome::Loss,
            _ => Outcome::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NotificationKind {
    Individual { player: String },
    Group { participants: Vec<String> },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerRow {
    pub name:           String,
    pub team:           Option<Team>,
    pub kills:          Option<u32>,
    pub deaths:         Option<u32>,
    pub assists:        Option<u32>,
    pub kd:             Option<f64>,
    pub kr:             Option<f64>,
    pub adr:            Option<f64>,
    pub multi_kills:    u32,
    pub utility_damage: Option<u32>,
    pub elo:            Option<i64>,
    pub elo_delta:      Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchNotification {
    pub kind:          NotificationKind,
    pub title:         String,
    pub match_id:      String,
    pub url:           Option<String>,
    pub outcome:       Outcome,
    pub finished_at:   Option<DateTime<Utc>>,
    pub round_score:   String,
    pub rounds_played: u32,
    pub map_name:      String,
    pub rows:          Vec<PlayerRow>,
}

/// Ledger view of one player at notification time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EloSnapshot {
    pub current:     Option<i64>,
    pub last_change: Option<i64>,
}

pub type EloSnapshots = HashMap<String, EloSnapshot>;

/// Players tracked by a community that took part in one match.
pub type Participants = [(String, String)];

impl MatchNotification {
    pub fn is_group(&self) -> bool {
        matches!(self.kind, NotificationKind::Group { .. })
    }

    /// First line of the message.
    pub fn headline(&self) -> String {
        match &self.kind {
            NotificationKind::Individual { player } => format!("New Match Result for {player}:"),
            NotificationKind::Group { participants } => {
                format!("Group Match Found with {} Players!", participants.len())
            }
        }
    }

    pub fn finished_label(&self) -> String {
        format_time(self.finished_at.map(|t| t.timestamp()))
    }

    /// Plain-text rendering (observe-only log, console).
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}", self.headline());
        let _ = writeln!(
            out,
            "{} [{}] {} | {} | {}",
            self.title,
            self.outcome.label(),
            self.map_name,
            self.round_score,
            self.finished_label()
        );
        for row in &self.rows {
            let _ = writeln!(out, "  {}", row.render());
        }
        if let Some(url) = &self.url {
            let _ = writeln!(out, "  {url}");
        }
        out.trim_end().to_string()
    }
}

impl PlayerRow {
    pub fn render(&self) -> String {
        let mut line = format!(
            "{}: {}/{}/{} K/D {} ADR {}",
            self.name,
            opt(self.kills),
            opt(self.deaths),
            opt(self.assists),
            opt(self.kd),
            self.adr.map(|a| format!("{a:.1}")).unwrap_or_else(|| "N/A".into()),
        );
        if let Some(kr) = self.kr {
            let _ = write!(line, " K/R {kr}");
        }
        if self.multi_kills > 0 {
            let _ = write!(line, " MK {}", self.multi_kills);
        }
        if let Some(ud) = self.utility_damage {
            let _ = write!(line, " UD {ud}");
        }
        if let Some(elo) = self.elo {
            let _ = write!(line, " ELO {elo}");
            if let Some(d) = self.elo_delta {
                let _ = write!(line, " ({})", signed(d));
            }
        }
        line
    }
}

pub fn signed(v: i64) -> String {
    if v > 0 { format!("+{v}") } else { v.to_string() }
}

fn opt<T: std::fmt::Display>(v: Option<T>) -> String {
    v.map(|v| v.to_string()).unwrap_or_else(|| "N/A".to_string())
}

// ── Builders ─────────────────────────────────────────────────────────────────

struct MatchFacts<'a> {
    round:       Option<&'a RoundStats>,
    winner:      Option<Team>,
    round_score: String,
    rounds:      u32,
    map_name:    String,
    finished_at: Option<DateTime<Utc>>,
}

fn facts<'a>(details: &MatchDetails, stats: Option<&'a MatchStats>) -> MatchFacts<'a> {
    let round = stats.and_then(|s| s.rounds.first());
    let round_score = round
        .and_then(|r| r.text("Score"))
        .unwrap_or_else(|| "N/A".to_string());
    let map_name = round
        .and_then(|r| r.text("Map"))
        .map(|m| format_map_name(&m))
        .unwrap_or_else(|| "Unknown Map".to_string());

    MatchFacts {
        round,
        winner: details.winner().and_then(Team::from_label),
        rounds: rounds_played(&round_score),
        round_score,
        map_name,
        finished_at: details.finished_at.and_then(|ts| Utc.timestamp_opt(ts, 0).single()),
    }
}

fn stat_row(
    name: &str,
    team: Option<Team>,
    stats: Option<&PlayerStats>,
    rounds: u32,
    outcome: Outcome,
    elo: EloSnapshot,
) -> PlayerRow {
    let kills = stats.and_then(|s| stat_u32(s, "Kills"));
    let deaths = stats.and_then(|s| stat_u32(s, "Deaths"));
    PlayerRow {
        name: name.to_string(),
        team,
        kills,
        deaths,
        assists: stats.and_then(|s| stat_u32(s, "Assists")),
        kd: stats
            .and_then(|s| s.number("K/D Ratio"))
            .or_else(|| kd_ratio(kills, deaths)),
        kr: kr_ratio(kills, rounds),
        adr: stats.and_then(|s| s.number("ADR")),
        multi_kills: stats.map(multi_kills).unwrap_or(0),
        utility_damage: stats.and_then(|s| stat_u32(s, "Utility Damage")),
        elo: elo.current,
        elo_delta: elo.last_change.map(|c| display_change(c, outcome)),
    }
}

/// One player's view of a match.
pub fn build_individual(
    details: &MatchDetails,
    stats: Option<&MatchStats>,
    name: &str,
    player_id: &str,
    elo: &EloSnapshots,
) -> MatchNotification {
    let f = facts(details, stats);
    let found = stats
        .into_iter()
        .flat_map(|s| s.rounds.iter())
        .find_map(|r| find_player(r, name));
    let team = found.map(|(t, _)| t);
    let outcome = Outcome::for_team(team, f.winner);
    let snapshot = elo.get(player_id).copied().unwrap_or_default();

    MatchNotification {
        kind: NotificationKind::Individual { player: name.to_string() },
        title: match outcome {
            Outcome::Win => "Victory".to_string(),
            Outcome::Loss => "Defeat".to_string(),
            Outcome::Unknown => "Match Result".to_string(),
        },
        match_id: details.match_id.clone(),
        url: details.url(),
        outcome,
        finished_at: f.finished_at,
        rows: vec![stat_row(name, team, found.map(|(_, s)| s), f.rounds, outcome, snapshot)],
        round_score: f.round_score,
        rounds_played: f.rounds,
        map_name: f.map_name,
    }
}

/// Combined view for a cluster of 3+ tracked players.
///
/// The side holding a strict majority of tracked participants decides the
/// headline outcome; an even split is reported as `Unknown`.
pub fn build_group(
    details: &MatchDetails,
    stats: Option<&MatchStats>,
    participants: &Participants,
    elo: &EloSnapshots,
) -> MatchNotification {
    let f = facts(details, stats);
    let mut rows = Vec::with_capacity(participants.len());
    let (mut team1, mut team2) = (0usize, 0usize);

    for (name, player_id) in participants {
        let found = f.round.and_then(|r| find_player(r, name));
        let team = found.map(|(t, _)| t);
        match team {
            Some(Team::Team1) => team1 += 1,
            Some(Team::Team2) => team2 += 1,
            None => {}
        }
        let player_outcome = Outcome::for_team(team, f.winner);
        let snapshot = elo.get(player_id).copied().unwrap_or_default();
        let display_name = found
            .map(|(_, s)| s.nickname.clone())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| name.clone());
        rows.push(stat_row(
            &display_name,
            team,
            found.map(|(_, s)| s),
            f.rounds,
            player_outcome,
            snapshot,
        ));
    }

    rows.sort_by(|a, b| {
        b.adr
            .unwrap_or(f64::MIN)
            .partial_cmp(&a.adr.unwrap_or(f64::MIN))
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let majority = match team1.cmp(&team2) {
        std::cmp::Ordering::Greater => Some(Team::Team1),
        std::cmp::Ordering::Less => Some(Team::Team2),
        std::cmp::Ordering::Equal => None,
    };
    let outcome = Outcome::for_team(majority, f.winner);

    MatchNotification {
        kind: NotificationKind::Group {
            participants: participants.iter().map(|(n, _)| n.clone()).collect(),
        },
        title: "Group Match".to_string(),
        match_id: details.match_id.clone(),
        url: details.url(),
        outcome,
        finished_at: f.finished_at,
        round_score: f.round_score,
        rounds_played: f.rounds,
        map_name: f.map_name,
        rows,
    }
}
