// Pagebot Engine — Wiki-Change Notifier
//
// Polls a Wiki.js instance's recent-changes endpoint every 5 minutes and
// posts an embed listing changed pages. A `last_update` watermark is
// persisted after each pass; the first pass only establishes the watermark
// so a fresh install does not replay history.

use crate::atoms::constants::WIKI_POLL_INTERVAL_SECS;
use crate::atoms::error::AddonResult;
use crate::atoms::types::{Embed, EmbedField};
use crate::engine::addons::{load_addon_config, save_addon_config};
use crate::engine::platform::{ChatPlatform, OutboundMessage};
use crate::engine::store::KvStore;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

const CONFIG_KEY: &str = "wikijs_config";

// ── Config ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WikiConfig {
    pub wiki_url: Option<String>,
    pub api_key: Option<String>,
    pub channel_id: Option<String>,
    /// RFC 3339 instant of the last completed pass.
    pub last_update: Option<String>,
}

// ── Change parsing (pure) ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct WikiChange {
    pub title: String,
}

fn parse_changes(data: &Value) -> Vec<WikiChange> {
    data.get("changes")
        .and_then(Value::as_array)
        .map(|changes| {
            changes
                .iter()
                .map(|c| WikiChange {
                    title: c
                        .get("title")
                        .and_then(Value::as_str)
                        .unwrap_or("Unknown article")
                        .to_string(),
                })
                .collect()
        })
        .unwrap_or_default()
}

fn build_change_embed(wiki_url: &str, changes: &[WikiChange]) -> Embed {
    Embed {
        title: Some("Wiki updates".into()),
        description: Some("Here are the latest changes:".into()),
        fields: changes
            .iter()
            .map(|c| EmbedField {
                name: c.title.clone(),
                value: format!("{}/page/{}", wiki_url, c.title),
                inline: false,
            })
            .collect(),
        ..Default::default()
    }
}

// ── Notifier ───────────────────────────────────────────────────────────────

pub struct WikiNotifier {
    kv: Arc<dyn KvStore>,
    platform: Arc<dyn ChatPlatform>,
    client: reqwest::Client,
}

impl WikiNotifier {
    pub fn new(
        kv: Arc<dyn KvStore>,
        platform: Arc<dyn ChatPlatform>,
        client: reqwest::Client,
    ) -> Self {
        WikiNotifier { kv, platform, client }
    }

    fn load_config(&self) -> WikiConfig {
        load_addon_config(self.kv.as_ref(), CONFIG_KEY)
    }

    fn save_config(&self, config: &WikiConfig) -> AddonResult<()> {
        save_addon_config(self.kv.as_ref(), CONFIG_KEY, config)
    }

    // ── Command surface ────────────────────────────────────────────────────

    pub fn set_channel(&self, channel: &str) -> String {
        let mut config = self.load_config();
        config.channel_id = Some(channel.to_string());
        match self.save_config(&config) {
            Ok(()) => format!("Notification channel set to {}.", channel),
            Err(e) => format!("Error: {}", e),
        }
    }

    pub fn set_api_key(&self, api_key: &str) -> String {
        let mut config = self.load_config();
        config.api_key = Some(api_key.to_string());
        match self.save_config(&config) {
            Ok(()) => "API key saved.".into(),
            Err(e) => format!("Error: {}", e),
        }
    }

    pub fn set_wiki_url(&self, wiki_url: &str) -> String {
        let mut config = self.load_config();
        config.wiki_url = Some(wiki_url.trim_end_matches('/').to_string());
        match self.save_config(&config) {
            Ok(()) => "Wiki URL saved.".into(),
            Err(e) => format!("Error: {}", e),
        }
    }

    // ── Polling ────────────────────────────────────────────────────────────

    /// One poll pass. Skips quietly until a wiki URL and channel are
    /// configured.
    pub async fn run_poll_cycle(&self) -> AddonResult<()> {
        let mut config = self.load_config();
        let (Some(wiki_url), Some(channel)) =
            (config.wiki_url.clone(), config.channel_id.clone())
        else {
            return Ok(());
        };

        let first_pass = config.last_update.is_none();
        let mut url = format!("{}/api/recent-changes", wiki_url);
        if let Some(key) = &config.api_key {
            url.push_str(&format!("?api_key={}", urlencoding::encode(key)));
        }

        match self.client.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => {
                let data: Value = resp.json().await?;
                let changes = parse_changes(&data);
                if !changes.is_empty() && !first_pass {
                    info!("[wiki] {} changed pages", changes.len());
                    let embed = build_change_embed(&wiki_url, &changes);
                    let msg = OutboundMessage { embeds: vec![embed], ..Default::default() };
                    if let Err(e) = self.platform.send_message(&channel, &msg).await {
                        warn!("[wiki] notification failed: {}", e);
                    }
                }
            }
            Ok(resp) => warn!("[wiki] recent-changes returned HTTP {}", resp.status()),
            Err(e) => warn!("[wiki] recent-changes request failed: {}", e),
        }

        config.last_update = Some(chrono::Utc::now().to_rfc3339());
        self.save_config(&config)
    }

    /// Run the poll loop until the host drops the handle.
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(Duration::from_secs(WIKI_POLL_INTERVAL_SECS));
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if let Err(e) = self.run_poll_cycle().await {
                    warn!("[wiki] poll cycle failed: {}", e);
                }
            }
        })
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────
