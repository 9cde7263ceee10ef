//! ELO ledger: player_id → current rating + append-only change log.

use chrono::{DateTime, TimeZone, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{debug, warn};

use crate::notification::Outcome;
use crate::store::JsonDocument;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct EloChange {
    pub previous:  i64,
    pub current:   i64,
    pub change:    i64,
    #[serde(deserialize_with = "rfc3339_or_epoch")]
    pub timestamp: DateTime<Utc>,
}

/// Older ledgers stored epoch seconds as a float; written back as RFC 3339.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredTimestamp {
    Rfc3339(DateTime<Utc>),
    Epoch(f64),
}

fn rfc3339_or_epoch<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
    match StoredTimestamp::deserialize(deserializer)? {
        StoredTimestamp::Rfc3339(ts) => Ok(ts),
        StoredTimestamp::Epoch(secs) => {
            let whole = secs.floor();
            // source precision is microseconds
            let micros = ((secs - whole) * 1e6).round().min(999_999.0) as u32;
            Utc.timestamp_opt(whole as i64, micros * 1_000)
                .single()
                .ok_or_else(|| de::Error::custom(format!("timestamp {secs} out of range")))
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct EloRecord {
    pub current: Option<i64>,
    #[serde(default)]
    pub history: Vec<EloChange>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EloObservation {
    Created,
    Changed { previous: i64, change: i64 },
    Unchanged,
}

pub struct EloLedger {
    doc:     JsonDocument,
    records: BTreeMap<String, EloRecord>,
}

impl EloLedger {
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let doc = JsonDocument::new(path);
        let records = doc.load();
        Self { doc, records }
    }

    pub fn persist(&self) {
        if let Err(e) = self.doc.save(&self.records) {
            warn!("saving ELO history failed: {e:#}");
        }
    }

    /// Folds a freshly fetched rating into the ledger. Writes only when
    /// something changed.
    pub fn observe(&mut self, player_id: &str, rating: i64, at: DateTime<Utc>) -> EloObservation {
        let outcome = match self.records.get_mut(player_id) {
            None => {
                self.records.insert(
                    player_id.to_string(),
                    EloRecord { current: Some(rating), history: Vec::new() },
                );
                EloObservation::Created
            }
            Some(record) => match record.current {
                None => {
                    record.current = Some(rating);
                    EloObservation::Created
                }
                Some(previous) if previous == rating => EloObservation::Unchanged,
                Some(previous) => {
                    let change = rating - previous;
                    record.history.push(EloChange {
                        previous,
                        current: rating,
                        change,
                        timestamp: at,
                    });
                    record.current = Some(rating);
                    EloObservation::Changed { previous, change }
                }
            },
        };

        if outcome != EloObservation::Unchanged {
            debug!(player_id, rating, ?outcome, "ELO observed");
            self.persist();
        }
        outcome
    }

    pub fn record(&self, player_id: &str) -> Option<&EloRecord> {
        self.records.get(player_id)
    }

    pub fn current(&self, player_id: &str) -> Option<i64> {
        self.records.get(player_id)?.current
    }

    pub fn last_change(&self, player_id: &str) -> Option<i64> {
        self.records.get(player_id)?.history.last().map(|h| h.change)
    }
}

/// Re-signs the latest ledger delta by this match's result. Best effort:
/// the delta may span several matches played between two observations.
pub fn display_change(raw: i64, outcome: Outcome) -> i64 {
    match outcome {
        Outcome::Win => raw.abs(),
        Outcome::Loss => -raw.abs(),
        Outcome::Unknown => raw,
    }
}
