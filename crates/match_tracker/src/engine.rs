//! Reconciliation Engine
//!
//! One pass per interval:
//!   1. pro každou community s destinací a hráči stáhne posledních N zápasů
//!   2. seskupí hráče podle match_id (cluster)
//!   3. cluster už viděný kýmkoliv → skip
//!   4. jen FINISHED zápasy → ELO reconciliation → payload → delivery
//!   5. match_id do seen-listu všem účastníkům, persist jednou za community
//!
//! Chyby jednoho hráče / zápasu / destinace nikdy neukončí pass.

use chrono::Utc;
use faceit_client::{MatchDetails, MatchSource, MatchStats};
use logger::{EloChangeEvent, EventLogger, MatchNotifiedEvent, PassHeartbeatEvent, now_iso};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::elo::EloObservation;
use crate::notification::{
    build_group, build_individual, EloSnapshot, EloSnapshots, MatchNotification, Participants,
};
use crate::notify::Notifier;
use crate::AppState;

/// Clusters with at least this many tracked players get one combined notification.
pub const GROUP_THRESHOLD: usize = 3;

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub game:          String,
    pub legacy_game:   String,
    pub history_limit: u32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            game:          "cs2".to_string(),
            legacy_game:   "csgo".to_string(),
            history_limit: 3,
        }
    }
}

/// Tracked players of one community that appear in the same match.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchCluster {
    pub match_id:     String,
    pub participants: Vec<(String, String)>,
    pub finished_at:  Option<i64>,
}

impl MatchCluster {
    pub fn is_group(&self) -> bool {
        self.participants.len() >= GROUP_THRESHOLD
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    pub communities:        usize,
    pub clusters:           usize,
    pub notified_matches:   usize,
    pub notifications:      usize,
    pub skipped_seen:       usize,
    pub skipped_unfinished: usize,
    pub source_errors:      usize,
}

pub struct Reconciler<S, N> {
    source:   S,
    notifier: N,
    settings: EngineSettings,
    logger:   EventLogger,
}

impl<S: MatchSource, N: Notifier> Reconciler<S, N> {
    pub fn new(source: S, notifier: N, settings: EngineSettings, log_dir: impl Into<PathBuf>) -> Self {
        Self { source, notifier, settings, logger: EventLogger::new(log_dir) }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub async fn run_pass(&self, state: &mut AppState) -> PassReport {
        let mut report = PassReport::default();

        for community in state.tracking.community_ids() {
            let destinations = state.tracking.destinations(&community);
            let players = state.tracking.players(&community);
            if destinations.is_empty() || players.is_empty() {
                continue;
            }
            report.communities += 1;
            self.reconcile_community(state, &community, &players, &destinations, &mut report)
                .await;
        }

        info!(
            communities = report.communities,
            clusters = report.clusters,
            notified = report.notified_matches,
            sent = report.notifications,
            errors = report.source_errors,
            "Reconciliation pass done"
        );
        let _ = self.logger.log(&PassHeartbeatEvent {
            ts: now_iso(),
            event: "PASS_HEARTBEAT",
            communities: report.communities,
            clusters: report.clusters,
            notified_matches: report.notified_matches,
            notifications: report.notifications,
            skipped_seen: report.skipped_seen,
            skipped_unfinished: report.skipped_unfinished,
            source_errors: report.source_errors,
        });
        report
    }

    async fn reconcile_community(
        &self,
        state: &mut AppState,
        community: &str,
        players: &[(String, String)],
        destinations: &[String],
        report: &mut PassReport,
    ) {
        let (clusters, errors) = self.collect_clusters(players, self.settings.history_limit).await;
        report.source_errors += errors;
        report.clusters += clusters.len();
        let mut dirty = false;

        for cluster in clusters {
            let already_seen = cluster
                .participants
                .iter()
                .any(|(_, pid)| state.tracking.has_seen(community, pid, &cluster.match_id));
            if already_seen {
                report.skipped_seen += 1;
                continue;
            }

            let details = match self.source.fetch_match_details(&cluster.match_id).await {
                Ok(d) => d,
                Err(e) => {
                    warn!("[{}] match {} details failed: {:#}", community, cluster.match_id, e);
                    report.source_errors += 1;
                    continue;
                }
            };
            if !details.is_finished() {
                debug!("[{}] match {} is {}, retry later", community, cluster.match_id, details.status);
                report.skipped_unfinished += 1;
                continue;
            }

            let notifications = self.build_for_cluster(state, &cluster, &details).await;

            let mut delivered = 0usize;
            for notification in &notifications {
                for dest in destinations {
                    match self.notifier.deliver(dest, notification).await {
                        Ok(()) => delivered += 1,
                        Err(e) => warn!("[{}] delivery of {} to {} failed: {:#}", community, cluster.match_id, dest, e),
                    }
                }
            }
            report.notifications += delivered;
            report.notified_matches += 1;

            // delivery failures still count as notified
            for (_, pid) in &cluster.participants {
                state.tracking.mark_seen(community, pid, &cluster.match_id);
            }
            dirty = true;

            let _ = self.logger.log(&MatchNotifiedEvent {
                ts: now_iso(),
                event: "MATCH_NOTIFIED",
                community: community.to_string(),
                match_id: cluster.match_id.clone(),
                kind: if cluster.is_group() { "group" } else { "individual" }.to_string(),
                participants: cluster.participants.iter().map(|(n, _)| n.clone()).collect(),
                outcome: notifications
                    .first()
                    .map(|n| n.outcome.label())
                    .unwrap_or("UNKNOWN")
                    .to_string(),
                destinations: destinations.len(),
                delivered,
            });
        }

        if dirty {
            state.tracking.persist();
        }
    }

    /// Unions recent history of every player into clusters keyed by match_id,
    /// in discovery order. Returns the clusters and the number of failed fetches.
    pub async fn collect_clusters(
        &self,
        players: &[(String, String)],
        limit: u32,
    ) -> (Vec<MatchCluster>, usize) {
        let mut clusters: Vec<MatchCluster> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut errors = 0;

        for (name, player_id) in players {
            let history = match self
                .source
                .fetch_player_history(player_id, &self.settings.game, limit)
                .await
            {
                Ok(h) => h,
                Err(e) => {
                    warn!("history for {} failed: {:#}", name, e);
                    errors += 1;
                    continue;
                }
            };

            for summary in history {
                if summary.match_id.is_empty() {
                    continue;
                }
                let idx = *index.entry(summary.match_id.clone()).or_insert_with(|| {
                    clusters.push(MatchCluster {
                        match_id:     summary.match_id.clone(),
                        participants: Vec::new(),
                        finished_at:  summary.finished_at,
                    });
                    clusters.len() - 1
                });
                let cluster = &mut clusters[idx];
                if !cluster.participants.iter().any(|(_, pid)| pid == player_id) {
                    cluster.participants.push((name.clone(), player_id.clone()));
                }
                if cluster.finished_at.is_none() {
                    cluster.finished_at = summary.finished_at;
                }
            }
        }

        (clusters, errors)
    }

    /// Group threshold reached → one combined payload, otherwise one per player.
    pub async fn build_for_cluster(
        &self,
        state: &mut AppState,
        cluster: &MatchCluster,
        details: &MatchDetails,
    ) -> Vec<MatchNotification> {
        let stats = self.fetch_stats(&cluster.match_id).await;
        let elo = self.reconcile_participants(state, &cluster.participants).await;

        if cluster.is_group() {
            vec![build_group(details, stats.as_ref(), &cluster.participants, &elo)]
        } else {
            cluster
                .participants
                .iter()
                .map(|(name, pid)| build_individual(details, stats.as_ref(), name, pid, &elo))
                .collect()
        }
    }

    pub(crate) async fn fetch_stats(&self, match_id: &str) -> Option<MatchStats> {
        match self.source.fetch_match_stats(match_id).await {
            Ok(s) => Some(s),
            Err(e) => {
                warn!("stats for match {} unavailable: {:#}", match_id, e);
                None
            }
        }
    }

    async fn reconcile_participants(
        &self,
        state: &mut AppState,
        participants: &Participants,
    ) -> EloSnapshots {
        let mut snapshots = EloSnapshots::new();
        for (name, pid) in participants {
            if let Err(e) = self.reconcile_elo(state, pid).await {
                warn!("ELO refresh for {} failed: {:#}", name, e);
            }
            snapshots.insert(
                pid.clone(),
                EloSnapshot {
                    current:     state.elo.current(pid),
                    last_change: state.elo.last_change(pid),
                },
            );
        }
        snapshots
    }

    /// Fetches the current rating and folds it into the ledger.
    pub async fn reconcile_elo(&self, state: &mut AppState, player_id: &str) -> anyhow::Result<EloObservation> {
        let player = self
            .source
            .fetch_player(player_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("player {player_id} not found"))?;
        let rating = player
            .rating(&self.settings.game, &self.settings.legacy_game)
            .ok_or_else(|| anyhow::anyhow!("no rating for {player_id}"))?;
        Ok(self.observe_rating(state, player_id, rating))
    }

    pub(crate) fn observe_rating(&self, state: &mut AppState, player_id: &str, rating: i64) -> EloObservation {
        let observation = state.elo.observe(player_id, rating, Utc::now());
        let previous = match observation {
            EloObservation::Unchanged => return observation,
            EloObservation::Created => None,
            EloObservation::Changed { previous, .. } => Some(previous),
        };
        let _ = self.logger.log(&EloChangeEvent {
            ts: now_iso(),
            event: "ELO_CHANGE",
            player_id: player_id.to_string(),
            previous,
            current: rating,
            change: previous.map(|p| rating - p).unwrap_or(0),
        });
        observation
    }

    /// Refreshes every tracked player once (deduplicated across communities).
    /// Returns how many ratings were read.
    pub async fn refresh_all_elo(&self, state: &mut AppState) -> usize {
        let mut done: HashSet<String> = HashSet::new();
        let mut updated = 0;
        let all: Vec<(String, String)> = state
            .tracking
            .communities()
            .flat_map(|(_, r)| r.players.iter().map(|(n, id)| (n.clone(), id.clone())))
            .collect();

        for (name, pid) in all {
            if !done.insert(pid.clone()) {
                continue;
            }
            match self.reconcile_elo(state, &pid).await {
                Ok(obs) => {
                    updated += 1;
                    debug!("ELO for {}: {:?}", name, obs);
                }
                Err(e) => warn!("ELO refresh for {} failed: {:#}", name, e),
            }
        }
        info!("ELO refresh: {} of {} players updated", updated, done.len());
        updated
    }
}
