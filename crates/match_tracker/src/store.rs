//! Tracking Store: community → tracked players, destinations, seen-lists.
//!
//! Whole document lives in memory and is rewritten on every mutation
//! (`persist`), except `mark_seen`, which the engine batches per community.

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

// ── JSON document on disk ────────────────────────────────────────────────────

/// File-backed JSON document: load whole, save whole.
pub struct JsonDocument {
    path: PathBuf,
}

impl JsonDocument {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing file → default. Corrupted file is moved aside to
    /// `<file>.corrupt-<timestamp>` and replaced by the default.
    pub fn load<T: DeserializeOwned + Default>(&self) -> T {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("{} not found, starting empty", self.path.display());
                return T::default();
            }
            Err(e) => {
                warn!("{} unreadable: {}", self.path.display(), e);
                self.backup_corrupt();
                return T::default();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(v) => v,
            Err(e) => {
                warn!("{} is corrupted: {}", self.path.display(), e);
                self.backup_corrupt();
                T::default()
            }
        }
    }

    pub fn save<T: Serialize>(&self, value: &T) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).ok();
            }
        }
        let json = serde_json::to_string_pretty(value).context("serialize document")?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).with_context(|| format!("write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path).with_context(|| format!("replace {}", self.path.display()))?;
        Ok(())
    }

    fn backup_corrupt(&self) {
        let stamp = Utc::now().format("%Y%m%d%H%M%S");
        let mut name = self.path.as_os_str().to_os_string();
        name.push(format!(".corrupt-{stamp}"));
        let backup = PathBuf::from(name);
        match fs::rename(&self.path, &backup) {
            Ok(()) => warn!("backed up corrupted document to {}", backup.display()),
            Err(e) => warn!("could not back up {}: {}", self.path.display(), e),
        }
    }
}

// ── Community record ─────────────────────────────────────────────────────────

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct CommunityRecord {
    #[serde(default, alias = "notification_channels")]
    pub notification_destinations: Vec<String>,
    /// display name → player_id
    #[serde(default)]
    pub players: BTreeMap<String, String>,
    /// player_id → match IDs already notified on, oldest first
    #[serde(default, alias = "last_matches")]
    pub last_seen_matches: BTreeMap<String, Vec<String>>,
}

impl CommunityRecord {
    /// Case-insensitive name lookup; returns the stored (case-preserved) name.
    pub fn find_player(&self, name: &str) -> Option<(&str, &str)> {
        self.players
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(n, id)| (n.as_str(), id.as_str()))
    }

    pub fn has_seen(&self, player_id: &str, match_id: &str) -> bool {
        self.last_seen_matches
            .get(player_id)
            .is_some_and(|seen| seen.iter().any(|m| m == match_id))
    }
}

pub type TrackingDocument = BTreeMap<String, CommunityRecord>;

// ── TrackingStore ────────────────────────────────────────────────────────────

pub struct TrackingStore {
    doc:           JsonDocument,
    communities:   TrackingDocument,
    seen_list_cap: usize,
}

impl TrackingStore {
    pub fn load(path: impl Into<PathBuf>, seen_list_cap: usize) -> Self {
        let doc = JsonDocument::new(path);
        let mut communities: TrackingDocument = doc.load();
        for record in communities.values_mut() {
            for id in record.players.values() {
                record.last_seen_matches.entry(id.clone()).or_default();
            }
        }
        Self { doc, communities, seen_list_cap: seen_list_cap.max(1) }
    }

    /// Write-through; failures are logged, in-memory state stays authoritative.
    pub fn persist(&self) {
        if let Err(e) = self.doc.save(&self.communities) {
            warn!("saving tracked players failed: {e:#}");
        }
    }

    pub fn communities(&self) -> impl Iterator<Item = (&String, &CommunityRecord)> {
        self.communities.iter()
    }

    pub fn community_ids(&self) -> Vec<String> {
        self.communities.keys().cloned().collect()
    }

    pub fn get(&self, community: &str) -> Option<&CommunityRecord> {
        self.communities.get(community)
    }

    fn community_mut(&mut self, community: &str) -> &mut CommunityRecord {
        self.communities.entry(community.to_string()).or_default()
    }

    /// Returns `false` if the name is already tracked (case-insensitive).
    pub fn add_player(&mut self, community: &str, name: &str, player_id: &str) -> bool {
        let record = self.community_mut(community);
        if record.find_player(name).is_some() {
            return false;
        }
        record.players.insert(name.to_string(), player_id.to_string());
        record.last_seen_matches.insert(player_id.to_string(), Vec::new());
        self.persist();
        true
    }

    /// Removes the player and their seen-list. Returns the removed player_id.
    pub fn remove_player(&mut self, community: &str, name: &str) -> Option<String> {
        let record = self.communities.get_mut(community)?;
        let stored = record.find_player(name)?.0.to_string();
        let player_id = record.players.remove(&stored)?;
        // the same account may be tracked under a second name
        if !record.players.values().any(|id| *id == player_id) {
            record.last_seen_matches.remove(&player_id);
        }
        self.persist();
        Some(player_id)
    }

    pub fn player_id_by_name(&self, community: &str, name: &str) -> Option<String> {
        self.get(community)?.find_player(name).map(|(_, id)| id.to_string())
    }

    /// (name, player_id) pairs in stable name order.
    pub fn players(&self, community: &str) -> Vec<(String, String)> {
        self.get(community)
            .map(|r| r.players.iter().map(|(n, id)| (n.clone(), id.clone())).collect())
            .unwrap_or_default()
    }

    pub fn destinations(&self, community: &str) -> Vec<String> {
        self.get(community)
            .map(|r| r.notification_destinations.clone())
            .unwrap_or_default()
    }

    pub fn add_destination(&mut self, community: &str, destination: &str) -> bool {
        let record = self.community_mut(community);
        if record.notification_destinations.iter().any(|d| d == destination) {
            return false;
        }
        record.notification_destinations.push(destination.to_string());
        self.persist();
        true
    }

    pub fn remove_destination(&mut self, community: &str, destination: &str) -> bool {
        let Some(record) = self.communities.get_mut(community) else {
            return false;
        };
        let before = record.notification_destinations.len();
        record.notification_destinations.retain(|d| d != destination);
        if record.notification_destinations.len() == before {
            return false;
        }
        self.persist();
        true
    }

    pub fn has_seen(&self, community: &str, player_id: &str, match_id: &str) -> bool {
        self.get(community).is_some_and(|r| r.has_seen(player_id, match_id))
    }

    /// Appends to the seen-list without persisting; keeps the newest
    /// `seen_list_cap` entries.
    pub fn mark_seen(&mut self, community: &str, player_id: &str, match_id: &str) {
        let cap = self.seen_list_cap;
        let seen = self
            .community_mut(community)
            .last_seen_matches
            .entry(player_id.to_string())
            .or_default();
        if seen.iter().any(|m| m == match_id) {
            return;
        }
        seen.push(match_id.to_string());
        if seen.len() > cap {
            let overflow = seen.len() - cap;
            seen.drain(..overflow);
        }
    }
}
