//! Runtime configuration from environment (`.env` is loaded by the binary).

use anyhow::{bail, Result};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct WatchConfig {
    pub api_key:              String,
    pub api_url:              String,
    pub game:                 String,
    pub legacy_game:          String,
    pub check_interval:       Duration,
    pub elo_refresh_interval: Duration,
    pub history_limit:        u32,
    pub seen_list_cap:        usize,
    pub min_request_gap:      Duration,
    pub http_timeout:         Duration,
    pub tracked_players_file: PathBuf,
    pub elo_history_file:     PathBuf,
    pub discord_token:        Option<String>,
    pub log_dir:              PathBuf,
}

impl WatchConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; `FACEIT_API_KEY` is required.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let non_empty = |key: &str| get(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let parsed = |key: &str, default: u64| -> u64 { non_empty(key).and_then(|v| parse(&v)).unwrap_or(default) };

        let Some(api_key) = non_empty("FACEIT_API_KEY") else {
            bail!("missing required environment variable FACEIT_API_KEY");
        };

        Ok(Self {
            api_key,
            api_url: non_empty("FACEIT_API_URL")
                .unwrap_or_else(|| faceit_client::DEFAULT_API_URL.to_string()),
            game: non_empty("FACEIT_GAME").unwrap_or_else(|| "cs2".to_string()),
            legacy_game: non_empty("FACEIT_LEGACY_GAME").unwrap_or_else(|| "csgo".to_string()),
            check_interval: Duration::from_secs(parsed("MATCH_CHECK_INTERVAL_SECS", 300).max(1)),
            elo_refresh_interval: Duration::from_secs(parsed("ELO_REFRESH_INTERVAL_SECS", 21_600).max(1)),
            history_limit: parsed("HISTORY_LIMIT", 3).clamp(1, 100) as u32,
            seen_list_cap: parsed("SEEN_LIST_CAP", 50).max(1) as usize,
            min_request_gap: Duration::from_millis(parsed("FACEIT_MIN_REQUEST_INTERVAL_MS", 250)),
            http_timeout: Duration::from_secs(parsed("HTTP_TIMEOUT_SECS", 15).max(1)),
            tracked_players_file: non_empty("TRACKED_PLAYERS_FILE")
                .unwrap_or_else(|| "data/tracked_players.json".to_string())
                .into(),
            elo_history_file: non_empty("PLAYER_ELO_HISTORY_FILE")
                .unwrap_or_else(|| "data/player_elo_history.json".to_string())
                .into(),
            discord_token: non_empty("DISCORD_TOKEN"),
            log_dir: non_empty("LOG_DIR").unwrap_or_else(|| "logs".to_string()).into(),
        })
    }
}

fn parse<T: FromStr>(v: &str) -> Option<T> {
    v.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn api_key_is_required() {
        assert!(WatchConfig::from_lookup(lookup(&[])).is_err());
        assert!(WatchConfig::from_lookup(lookup(&[("FACEIT_API_KEY", "  ")])).is_err());
    }

    #[test]
    fn defaults_apply() {
        let cfg = WatchConfig::from_lookup(lookup(&[("FACEIT_API_KEY", "k")])).unwrap();
        assert_eq!(cfg.game, "cs2");
        assert_eq!(cfg.legacy_game, "csgo");
        assert_eq!(cfg.history_limit, 3);
        assert_eq!(cfg.seen_list_cap, 50);
        assert_eq!(cfg.check_interval, Duration::from_secs(300));
        assert!(cfg.discord_token.is_none());
        assert_eq!(cfg.tracked_players_file, PathBuf::from("data/tracked_players.json"));
    }

    #[test]
    fn bad_numbers_fall_back() {
        let cfg = WatchConfig::from_lookup(lookup(&[
            ("FACEIT_API_KEY", "k"),
            ("HISTORY_LIMIT", "lots"),
            ("MATCH_CHECK_INTERVAL_SECS", "60"),
            ("DISCORD_TOKEN", "t"),
        ]))
        .unwrap();
        assert_eq!(cfg.history_limit, 3);
        assert_eq!(cfg.check_interval, Duration::from_secs(60));
        assert_eq!(cfg.discord_token.as_deref(), Some("t"));
    }
}
