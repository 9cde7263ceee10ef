//! Notification emitter: delivers a shaped payload to one destination.

use anyhow::{bail, Result};
use logger::{EventLogger, NotificationEvent, now_iso};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{info, warn};

use crate::notification::{signed, MatchNotification, Outcome};

#[allow(async_fn_in_trait)]
pub trait Notifier {
    async fn deliver(&self, destination: &str, notification: &MatchNotification) -> Result<()>;
}

// ── Discord ──────────────────────────────────────────────────────────────────

const DISCORD_API: &str = "https://discord.com/api/v10";

const COLOR_WIN: u32 = 0x2ecc71;
const COLOR_LOSS: u32 = 0xe74c3c;
const COLOR_UNKNOWN: u32 = 0x3498db;

pub struct DiscordNotifier {
    client: reqwest::Client,
    token:  String,
}

impl DiscordNotifier {
    pub fn new(token: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            token: token.into(),
        }
    }
}

impl Notifier for DiscordNotifier {
    async fn deliver(&self, destination: &str, notification: &MatchNotification) -> Result<()> {
        let url = format!("{DISCORD_API}/channels/{destination}/messages");
        let body = json!({
            "content": notification.headline(),
            "embeds": [embed(notification)],
        });
        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Bot {}", self.token))
            .json(&body)
            .send()
            .await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            warn!("Discord send to {} failed: {}: {}", destination, status, body);
            bail!("Discord send failed: {}", status);
        }
        Ok(())
    }
}

/// Discord embed JSON for a payload.
pub fn embed(n: &MatchNotification) -> Value {
    let color = match n.outcome {
        Outcome::Win => COLOR_WIN,
        Outcome::Loss => COLOR_LOSS,
        Outcome::Unknown => COLOR_UNKNOWN,
    };
    let indicator = match n.outcome {
        Outcome::Win => "✅ ",
        Outcome::Loss => "❌ ",
        Outcome::Unknown => "",
    };

    let mut fields = vec![
        json!({ "name": "Finished", "value": n.finished_label(), "inline": true }),
        json!({ "name": "Map",      "value": n.map_name,         "inline": true }),
        json!({ "name": "Score",    "value": n.round_score,      "inline": true }),
    ];
    for row in &n.rows {
        let mut value = format!(
            "K/D/A: {}/{}/{}\nK/D: {}\nADR: {}",
            na(row.kills),
            na(row.deaths),
            na(row.assists),
            na(row.kd),
            row.adr.map(|a| format!("{a:.1}")).unwrap_or_else(|| "N/A".into()),
        );
        if let Some(kr) = row.kr {
            value.push_str(&format!("\nK/R: {kr}"));
        }
        if let Some(elo) = row.elo {
            let delta = row.elo_delta.map(|d| format!(" ({})", signed(d))).unwrap_or_default();
            value.push_str(&format!("\nELO: {elo}{delta}"));
        }
        fields.push(json!({ "name": row.name, "value": value, "inline": n.is_group() }));
    }

    let mut embed = json!({
        "title": format!("{indicator}{}", n.title),
        "color": color,
        "fields": fields,
    });
    if let Some(url) = &n.url {
        embed["url"] = json!(url);
    }
    embed
}

fn na<T: std::fmt::Display>(v: Option<T>) -> String {
    v.map(|v| v.to_string()).unwrap_or_else(|| "N/A".to_string())
}

// ── Observe-only ─────────────────────────────────────────────────────────────

/// Writes notifications to the event log instead of a chat service.
pub struct LogNotifier {
    logger: EventLogger,
}

impl LogNotifier {
    pub fn new(log_dir: impl Into<std::path::PathBuf>) -> Self {
        Self { logger: EventLogger::new(log_dir) }
    }
}

impl Notifier for LogNotifier {
    async fn deliver(&self, destination: &str, notification: &MatchNotification) -> Result<()> {
        let text = notification.render_text();
        info!("[{}] {}", destination, text);
        self.logger.log(&NotificationEvent {
            ts: now_iso(),
            event: "NOTIFICATION",
            destination: destination.to_string(),
            match_id: notification.match_id.clone(),
            title: notification.title.clone(),
            text,
        })
    }
}

// ── Runtime selection ────────────────────────────────────────────────────────

/// Discord when a bot token is configured, otherwise observe-only.
pub enum AnyNotifier {
    Discord(DiscordNotifier),
    Log(LogNotifier),
}

impl AnyNotifier {
    pub fn mode(&self) -> &'static str {
        match self {
            AnyNotifier::Discord(_) => "DISCORD",
            AnyNotifier::Log(_) => "OBSERVE ONLY (jsonl)",
        }
    }
}

impl Notifier for AnyNotifier {
    async fn deliver(&self, destination: &str, notification: &MatchNotification) -> Result<()> {
        match self {
            AnyNotifier::Discord(n) => n.deliver(destination, notification).await,
            AnyNotifier::Log(n) => n.deliver(destination, notification).await,
        }
    }
}
