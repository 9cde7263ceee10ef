//! Chat-style command surface: thin reads/writes over `AppState`.
//!
//! Line syntax: `<community> !<command> [args]`, e.g. `G1 !track s1mple`.
//! On-demand lookups never touch seen-lists.

use anyhow::{anyhow, bail, Result};
use faceit_client::MatchSource;
use tracing::warn;

use crate::engine::Reconciler;
use crate::notification::{build_group, build_individual, signed, EloSnapshot, EloSnapshots, MatchNotification};
use crate::notify::Notifier;
use crate::AppState;

const MAX_LOOKUP: u32 = 10;
const GROUP_HISTORY_DEPTH: u32 = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Track(String),
    Untrack(String),
    List,
    AddChannel(String),
    RemoveChannel(String),
    ListChannels,
    Recent { nickname: String, count: u32 },
    GroupHistory { count: u32 },
    Elo(Option<String>),
    UpdateElo,
    Help,
}

#[derive(Debug, Default)]
pub struct Reply {
    pub text:          String,
    pub notifications: Vec<MatchNotification>,
}

impl Reply {
    fn text(text: impl Into<String>) -> Self {
        Self { text: text.into(), notifications: Vec::new() }
    }
}

impl Command {
    pub fn parse(input: &str) -> Result<Command> {
        let mut parts = input.split_whitespace();
        let Some(head) = parts.next() else {
            bail!("empty command");
        };
        let name = head.strip_prefix('!').unwrap_or(head).to_ascii_lowercase();
        let arg = parts.next().map(str::to_string);
        let count = |v: Option<&str>, default: u32| -> Result<u32> {
            match v {
                None => Ok(default),
                Some(v) => v.parse().map_err(|_| anyhow!("count must be a number, got {v}")),
            }
        };
        let need = |what: &str| arg.clone().ok_or_else(|| anyhow!("usage: !{name} <{what}>"));

        Ok(match name.as_str() {
            "track" => Command::Track(need("nickname")?),
            "untrack" => Command::Untrack(need("nickname")?),
            "list" => Command::List,
            "addchannel" => Command::AddChannel(need("channel")?),
            "removechannel" => Command::RemoveChannel(need("channel")?),
            "listchannels" => Command::ListChannels,
            "recent" => Command::Recent {
                nickname: need("nickname")?,
                count: count(parts.next(), 3)?,
            },
            "grouphistory" => Command::GroupHistory { count: count(arg.as_deref(), 5)? },
            "elo" => Command::Elo(arg),
            "updateelo" => Command::UpdateElo,
            "help" => Command::Help,
            other => bail!("unknown command !{other}"),
        })
    }
}

/// `"G1 !track alice"` → `("G1", Track("alice"))`
pub fn parse_line(line: &str) -> Result<(String, Command)> {
    let line = line.trim();
    let (community, rest) = line
        .split_once(char::is_whitespace)
        .ok_or_else(|| anyhow!("expected `<community> !<command> [args]`"))?;
    Ok((community.to_string(), Command::parse(rest)?))
}

pub async fn execute<S: MatchSource, N: Notifier>(
    reconciler: &Reconciler<S, N>,
    state: &mut AppState,
    community: &str,
    command: Command,
) -> Reply {
    match command {
        Command::Track(nickname) => track(reconciler, state, community, &nickname).await,
        Command::Untrack(nickname) => match state.tracking.remove_player(community, &nickname) {
            Some(_) => Reply::text(format!("Stopped tracking player {nickname}.")),
            None => Reply::text(format!("Player {nickname} is not being tracked.")),
        },
        Command::List => {
            let players = state.tracking.players(community);
            if players.is_empty() {
                return Reply::text("No players are being tracked in this community.");
            }
            let names: Vec<_> = players.into_iter().map(|(n, _)| n).collect();
            Reply::text(format!("Tracked FACEIT players:\n{}", names.join("\n")))
        }
        Command::AddChannel(channel) => {
            if state.tracking.add_destination(community, &channel) {
                Reply::text(format!("{channel} will now receive match notifications!"))
            } else {
                Reply::text(format!("{channel} is already receiving match notifications!"))
            }
        }
        Command::RemoveChannel(channel) => {
            if state.tracking.remove_destination(community, &channel) {
                Reply::text(format!("{channel} will no longer receive match notifications!"))
            } else {
                Reply::text(format!("{channel} is not receiving match notifications!"))
            }
        }
        Command::ListChannels => {
            let channels = state.tracking.destinations(community);
            if channels.is_empty() {
                Reply::text("No channels are currently receiving match notifications!")
            } else {
                Reply::text(format!("Channels receiving match notifications:\n{}", channels.join("\n")))
            }
        }
        Command::Recent { nickname, count } => recent(reconciler, state, &nickname, count).await,
        Command::GroupHistory { count } => group_history(reconciler, state, community, count).await,
        Command::Elo(name) => show_elo(state, community, name.as_deref()),
        Command::UpdateElo => {
            let updated = reconciler.refresh_all_elo(state).await;
            if updated > 0 {
                Reply::text(format!("Updated ELO for {updated} players."))
            } else {
                Reply::text("No players found to update or there was an error.")
            }
        }
        Command::Help => Reply::text(
            "!track <nick> | !untrack <nick> | !list | !addchannel <id> | !removechannel <id> | \
             !listchannels | !recent <nick> [n] | !grouphistory [n] | !elo [nick] | !updateelo",
        ),
    }
}

async fn track<S: MatchSource, N: Notifier>(
    reconciler: &Reconciler<S, N>,
    state: &mut AppState,
    community: &str,
    nickname: &str,
) -> Reply {
    if state.tracking.player_id_by_name(community, nickname).is_some() {
        return Reply::text(format!("Player {nickname} is already being tracked!"));
    }
    let player = match reconciler.source().fetch_player(nickname).await {
        Ok(Some(p)) if !p.player_id.is_empty() => p,
        Ok(_) => return Reply::text(format!("Could not find player with name {nickname}")),
        Err(e) => {
            warn!("lookup of {} failed: {:#}", nickname, e);
            return Reply::text(format!("Could not look up {nickname} right now, try again later."));
        }
    };

    state.tracking.add_player(community, nickname, &player.player_id);
    let settings = reconciler.settings();
    if let Some(rating) = player.rating(&settings.game, &settings.legacy_game) {
        reconciler.observe_rating(state, &player.player_id, rating);
    }
    Reply::text(format!("Now tracking FACEIT player: {nickname} (ID: {})", player.player_id))
}

fn ledger_snapshot(state: &AppState, player_id: &str) -> EloSnapshots {
    let mut snapshots = EloSnapshots::new();
    snapshots.insert(
        player_id.to_string(),
        EloSnapshot {
            current:     state.elo.current(player_id),
            last_change: state.elo.last_change(player_id),
        },
    );
    snapshots
}

async fn recent<S: MatchSource, N: Notifier>(
    reconciler: &Reconciler<S, N>,
    state: &AppState,
    nickname: &str,
    count: u32,
) -> Reply {
    let count = count.clamp(1, MAX_LOOKUP);
    let source = reconciler.source();
    let player = match source.fetch_player(nickname).await {
        Ok(Some(p)) => p,
        Ok(None) => return Reply::text(format!("Could not find player with name {nickname}")),
        Err(e) => {
            warn!("lookup of {} failed: {:#}", nickname, e);
            return Reply::text(format!("Could not find player with name {nickname}"));
        }
    };
    let history = match source
        .fetch_player_history(&player.player_id, &reconciler.settings().game, count)
        .await
    {
        Ok(h) => h,
        Err(e) => {
            warn!("history for {} failed: {:#}", nickname, e);
            return Reply::text(format!("Could not fetch match history for player {nickname}"));
        }
    };
    if history.is_empty() {
        return Reply::text(format!("No recent matches found for player {nickname}"));
    }

    let elo = ledger_snapshot(state, &player.player_id);
    let mut reply = Reply::default();
    let mut missing = Vec::new();
    for summary in history {
        match source.fetch_match_details(&summary.match_id).await {
            Ok(details) => {
                let stats = reconciler.fetch_stats(&summary.match_id).await;
                reply.notifications.push(build_individual(
                    &details,
                    stats.as_ref(),
                    nickname,
                    &player.player_id,
                    &elo,
                ));
            }
            Err(e) => {
                warn!("details for {} failed: {:#}", summary.match_id, e);
                missing.push(summary.match_id);
            }
        }
    }
    reply.text = format!("{} recent matches for {nickname}", reply.notifications.len());
    if !missing.is_empty() {
        reply.text.push_str(&format!(" (could not fetch: {})", missing.join(", ")));
    }
    reply
}

async fn group_history<S: MatchSource, N: Notifier>(
    reconciler: &Reconciler<S, N>,
    state: &AppState,
    community: &str,
    count: u32,
) -> Reply {
    let count = count.clamp(1, MAX_LOOKUP) as usize;
    let players = state.tracking.players(community);
    if players.is_empty() {
        return Reply::text("No players are being tracked in this community.");
    }

    let (clusters, _) = reconciler.collect_clusters(&players, GROUP_HISTORY_DEPTH).await;
    let mut groups: Vec<_> = clusters.into_iter().filter(|c| c.is_group()).collect();
    groups.sort_by(|a, b| b.finished_at.unwrap_or(0).cmp(&a.finished_at.unwrap_or(0)));
    groups.truncate(count);
    if groups.is_empty() {
        return Reply::text("No group matches found with 3 or more tracked players.");
    }

    let mut reply = Reply::default();
    for cluster in groups {
        let details = match reconciler.source().fetch_match_details(&cluster.match_id).await {
            Ok(d) => d,
            Err(e) => {
                warn!("details for {} failed: {:#}", cluster.match_id, e);
                continue;
            }
        };
        let stats = reconciler.fetch_stats(&cluster.match_id).await;
        let mut elo = EloSnapshots::new();
        for (_, pid) in &cluster.participants {
            elo.extend(ledger_snapshot(state, pid));
        }
        reply.notifications.push(build_group(&details, stats.as_ref(), &cluster.participants, &elo));
    }
    reply.text = format!("{} group matches", reply.notifications.len());
    reply
}

fn show_elo(state: &AppState, community: &str, name: Option<&str>) -> Reply {
    let players = state.tracking.players(community);
    if players.is_empty() {
        return Reply::text("No players are being tracked in this community.");
    }
    let change = |pid: &str| {
        state
            .elo
            .last_change(pid)
            .map(|c| format!(" ({})", signed(c)))
            .unwrap_or_default()
    };

    if let Some(name) = name {
        let Some(pid) = state.tracking.player_id_by_name(community, name) else {
            return Reply::text(format!("Player {name} is not being tracked."));
        };
        return match state.elo.current(&pid) {
            Some(elo) => Reply::text(format!("{name} current ELO: {elo}{}", change(&pid))),
            None => Reply::text(format!("No ELO data available for {name}. Try !updateelo first.")),
        };
    }

    let mut rows: Vec<(String, i64, String)> = players
        .iter()
        .filter_map(|(n, pid)| state.elo.current(pid).map(|e| (n.clone(), e, change(pid))))
        .collect();
    if rows.is_empty() {
        return Reply::text("No ELO data available for any tracked players. Try !updateelo first.");
    }
    rows.sort_by(|a, b| b.1.cmp(&a.1));
    let lines: Vec<_> = rows.iter().map(|(n, e, c)| format!("{n}: {e}{c}")).collect();
    Reply::text(format!("Current ELO for tracked players:\n{}", lines.join("\n")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands() {
        assert_eq!(Command::parse("!track Alice").unwrap(), Command::Track("Alice".into()));
        assert_eq!(Command::parse("!LIST").unwrap(), Command::List);
        assert_eq!(
            Command::parse("!recent bob 7").unwrap(),
            Command::Recent { nickname: "bob".into(), count: 7 }
        );
        assert_eq!(
            Command::parse("!recent bob").unwrap(),
            Command::Recent { nickname: "bob".into(), count: 3 }
        );
        assert_eq!(Command::parse("!grouphistory").unwrap(), Command::GroupHistory { count: 5 });
        assert_eq!(Command::parse("!elo").unwrap(), Command::Elo(None));
        assert_eq!(Command::parse("!elo carol").unwrap(), Command::Elo(Some("carol".into())));
    }

    #[test]
    fn rejects_bad_input() {
        assert!(Command::parse("").is_err());
        assert!(Command::parse("!track").is_err());
        assert!(Command::parse("!recent bob many").is_err());
        assert!(Command::parse("!dance").is_err());
        assert!(parse_line("G1").is_err());
    }

    #[test]
    fn parse_line_splits_community() {
        let (community, cmd) = parse_line("  G1 !addchannel 1234 ").unwrap();
        assert_eq!(community, "G1");
        assert_eq!(cmd, Command::AddChannel("1234".into()));
    }
}
