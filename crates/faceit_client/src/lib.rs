/// FaceitWatch — FACEIT Data API client
///
/// Match data source pro reconciliation loop:
///   - player lookup (nickname nebo player_id)
///   - player match history
///   - match details (status, winner, url)
///   - match stats (round score, rosters, per-player stat bag)
///
/// Každý request čeká na rate limiter a loguje API_STATUS přes Logger.

use anyhow::{bail, Context, Result};
use chrono::{TimeZone, Utc};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use logger::{ApiStatusEvent, EventLogger, now_iso};
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

mod types;

pub use types::{
    GameInfo, HistoryResponse, MatchDetails, MatchResults, MatchStats, MatchSummary,
    PlayerInfo, PlayerStats, RoundStats, TeamStats,
};

pub const DEFAULT_API_URL: &str = "https://open.faceit.com/data/v4";

/// Read-only view of the matchmaking platform.
///
/// `fetch_player` distinguishes "not found" (`Ok(None)`) from transport
/// failures; the other calls fail with `Err` on anything but a usable body.
#[allow(async_fn_in_trait)]
pub trait MatchSource {
    async fn fetch_player(&self, nickname_or_id: &str) -> Result<Option<PlayerInfo>>;

    async fn fetch_player_history(
        &self,
        player_id: &str,
        game: &str,
        limit: u32,
    ) -> Result<Vec<MatchSummary>>;

    async fn fetch_match_details(&self, match_id: &str) -> Result<MatchDetails>;

    async fn fetch_match_stats(&self, match_id: &str) -> Result<MatchStats>;
}

/// Long identifiers with a hyphen are player IDs (UUIDs), anything else is a nickname.
pub fn is_player_id(s: &str) -> bool {
    s.len() >= 32 && s.contains('-')
}

pub fn format_time(timestamp: Option<i64>) -> String {
    match timestamp.and_then(|ts| Utc.timestamp_opt(ts, 0).single()) {
        Some(dt) => dt.format("%d.%m, %H:%M").to_string(),
        None => "Unknown Time".to_string(),
    }
}

// ── FaceitClient ─────────────────────────────────────────────────────────────

pub struct FaceitClient {
    client:   reqwest::Client,
    base_url: String,
    api_key:  String,
    limiter:  DefaultDirectRateLimiter,
    logger:   EventLogger,
}

impl FaceitClient {
    pub fn new(
        base_url:            impl Into<String>,
        api_key:             impl Into<String>,
        timeout:             Duration,
        min_request_gap:     Duration,
        log_dir:             impl Into<std::path::PathBuf>,
    ) -> Self {
        let quota = Quota::with_period(min_request_gap.max(Duration::from_millis(1)))
            .unwrap_or_else(|| Quota::per_second(std::num::NonZeroU32::MIN));

        Self {
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key:  api_key.into(),
            limiter:  RateLimiter::direct(quota),
            logger:   EventLogger::new(log_dir),
        }
    }

    /// GET + JSON decode. 404 → `Ok(None)`, jiný non-2xx → `Err`.
    async fn get_json<T: DeserializeOwned>(&self, scope: &str, request: RequestBuilder) -> Result<Option<T>> {
        self.limiter.until_ready().await;

        let resp = match request.bearer_auth(&self.api_key).send().await {
            Ok(r) => r,
            Err(e) => {
                self.log_api(scope, false, None, &e.to_string());
                return Err(e).with_context(|| format!("FACEIT {scope} request failed"));
            }
        };

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            self.log_api(scope, true, Some(status.as_u16()), "not found");
            return Ok(None);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(200).collect();
            warn!("FACEIT {scope} status {status}: {snippet}");
            self.log_api(scope, false, Some(status.as_u16()), &snippet);
            bail!("FACEIT {scope} HTTP {status}");
        }

        let raw = resp.text().await.context("FACEIT body read failed")?;
        debug!("FACEIT {scope} raw (first 300): {}", raw.chars().take(300).collect::<String>());

        match serde_json::from_str::<T>(&raw) {
            Ok(v) => {
                self.log_api(scope, true, Some(status.as_u16()), "ok");
                Ok(Some(v))
            }
            Err(e) => {
                self.log_api(scope, false, Some(status.as_u16()), &format!("json: {e}"));
                Err(e).with_context(|| format!("FACEIT {scope} JSON parse failed"))
            }
        }
    }

    /// Player IDs go into the path, nicknames into an encoded query.
    fn player_request(&self, nickname_or_id: &str) -> RequestBuilder {
        if is_player_id(nickname_or_id) {
            self.client.get(format!("{}/players/{}", self.base_url, nickname_or_id))
        } else {
            self.client
                .get(format!("{}/players", self.base_url))
                .query(&[("nickname", nickname_or_id)])
        }
    }

    fn log_api(&self, scope: &str, ok: bool, status_code: Option<u16>, msg: &str) {
        let _ = self.logger.log(&ApiStatusEvent {
            ts: now_iso(),
            event: "API_STATUS",
            source: "faceit".to_string(),
            scope: scope.to_string(),
            ok,
            status_code,
            message: msg.to_string(),
        });
    }
}

impl MatchSource for FaceitClient {
    async fn fetch_player(&self, nickname_or_id: &str) -> Result<Option<PlayerInfo>> {
        self.get_json("player", self.player_request(nickname_or_id)).await
    }

    async fn fetch_player_history(
        &self,
        player_id: &str,
        game: &str,
        limit: u32,
    ) -> Result<Vec<MatchSummary>> {
        let request = self
            .client
            .get(format!("{}/players/{}/history", self.base_url, player_id))
            .query(&[("game", game.to_string()), ("limit", limit.to_string())]);
        let history: Option<HistoryResponse> = self.get_json("history", request).await?;
        match history {
            Some(h) => Ok(h.items),
            None => bail!("history for {player_id} not found"),
        }
    }

    async fn fetch_match_details(&self, match_id: &str) -> Result<MatchDetails> {
        let url = format!("{}/matches/{}", self.base_url, match_id);
        self.get_json("match", self.client.get(url))
            .await?
            .with_context(|| format!("match {match_id} not found"))
    }

    async fn fetch_match_stats(&self, match_id: &str) -> Result<MatchStats> {
        let url = format!("{}/matches/{}/stats", self.base_url, match_id);
        self.get_json("stats", self.client.get(url))
            .await?
            .with_context(|| format!("stats for {match_id} not found"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn player_id_detection() {
        assert!(is_player_id("ad8034c1-6324-4080-b28e-dbf64b86f3d4"));
        assert!(!is_player_id("s1mple"));
        // long nickname without hyphen is still a nickname
        assert!(!is_player_id("averyveryverylongnicknamewithoutdash"));
        assert!(!is_player_id("short-id"));
    }

    #[test]
    fn format_time_handles_missing() {
        assert_eq!(format_time(None), "Unknown Time");
        assert_eq!(format_time(Some(0)), "01.01, 00:00");
    }

    #[test]
    fn nickname_is_query_encoded() {
        let client = FaceitClient::new(
            "https://open.faceit.com/data/v4/",
            "key",
            Duration::from_secs(1),
            Duration::from_millis(1),
            std::env::temp_dir().join("faceit_client_test_logs"),
        );

        let by_name = client.player_request("a b&c=d").build().unwrap();
        assert_eq!(by_name.url().path(), "/data/v4/players");
        assert_eq!(by_name.url().query(), Some("nickname=a+b%26c%3Dd"));

        let by_id = client
            .player_request("ad8034c1-6324-4080-b28e-dbf64b86f3d4")
            .build()
            .unwrap();
        assert_eq!(by_id.url().path(), "/data/v4/players/ad8034c1-6324-4080-b28e-dbf64b86f3d4");
        assert_eq!(by_id.url().query(), None);
    }

    #[tokio::test]
    async fn unreachable_host_is_an_error() {
        let dir = std::env::temp_dir().join("faceit_client_test_logs");
        let client = FaceitClient::new(
            "http://127.0.0.1:9",
            "key",
            Duration::from_millis(500),
            Duration::from_millis(1),
            dir,
        );
        assert!(client.fetch_match_details("m1").await.is_err());
    }
}
