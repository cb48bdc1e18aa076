// Pagebot Engine — Manga-Release Poller
//
// Polls MangaDex for each tracked title every 30 minutes, with an AniList
// GraphQL fallback when MangaDex yields nothing. A new chapter beyond the
// stored watermark posts an embed to the configured channel and advances
// the watermark. Lookup failures are logged and skipped; the loop never
// dies on a bad response.

use crate::atoms::constants::MANGA_POLL_INTERVAL_SECS;
use crate::atoms::error::AddonResult;
use crate::atoms::types::{Embed, EmbedField, EmbedFooter, EmbedMedia};
use crate::engine::addons::{load_addon_config, save_addon_config};
use crate::engine::platform::{ChatPlatform, OutboundMessage};
use crate::engine::store::KvStore;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

const CONFIG_KEY: &str = "manganotifier_config";
const MANGADEX_API: &str = "https://api.mangadex.org";
const ANILIST_API: &str = "https://graphql.anilist.co";

const COLOR_BLUE: u32 = 0x3498db;

// ── Config ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MangaEntry {
    pub name: String,
    /// Highest chapter number already announced.
    pub last_episode: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MangaConfig {
    #[serde(default)]
    pub manga_list: Vec<MangaEntry>,
    pub channel_id: Option<String>,
}

// ── Lookup result ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct MangaUpdate {
    pub latest_episode: u64,
    pub url: Option<String>,
    pub cover_image: Option<String>,
    pub description: Option<String>,
}

// ── Response parsing (pure) ────────────────────────────────────────────────

/// Extract the first usable entry from a MangaDex title search. Mirrors the
/// upstream shape: `data[]` with `attributes.latestChapter` (numeric
/// string), a `cover_art` relationship, and an English description.
fn parse_mangadex_response(data: &Value) -> Option<MangaUpdate> {
    let list = data.get("data")?.as_array()?;
    let manga = list.iter().find(|m| m.get("attributes").is_some())?;
    let attributes = &manga["attributes"];

    let latest = attributes.get("latestChapter").and_then(Value::as_str)?;
    let episode: u64 = latest.parse().ok()?;

    let cover_image = manga
        .get("relationships")
        .and_then(Value::as_array)
        .and_then(|rels| {
            rels.iter().find(|r| r.get("type").and_then(Value::as_str) == Some("cover_art"))
        })
        .and_then(|r| r.get("id"))
        .and_then(Value::as_str)
        .map(|id| format!("https://og.mangadex.org/og-image/manga/{}", id));

    let description = attributes
        .get("description")
        .and_then(|d| d.get("en"))
        .and_then(Value::as_str)
        .unwrap_or("No description available.")
        .to_string();

    let url = manga
        .get("id")
        .and_then(Value::as_str)
        .map(|id| format!("https://mangadex.org/title/{}", id));

    Some(MangaUpdate { latest_episode: episode, url, cover_image, description: Some(description) })
}

/// Extract the chapter count from an AniList media search.
fn parse_anilist_response(data: &Value) -> Option<MangaUpdate> {
    let chapters = data.get("data")?.get("Media")?.get("chapters")?.as_u64()?;
    if chapters == 0 {
        return None;
    }
    Some(MangaUpdate { latest_episode: chapters, url: None, cover_image: None, description: None })
}

// ── Notifier ───────────────────────────────────────────────────────────────

pub struct MangaNotifier {
    kv: Arc<dyn KvStore>,
    platform: Arc<dyn ChatPlatform>,
    client: reqwest::Client,
}

impl MangaNotifier {
    pub fn new(
        kv: Arc<dyn KvStore>,
        platform: Arc<dyn ChatPlatform>,
        client: reqwest::Client,
    ) -> Self {
        MangaNotifier { kv, platform, client }
    }

    fn load_config(&self) -> MangaConfig {
        load_addon_config(self.kv.as_ref(), CONFIG_KEY)
    }

    fn save_config(&self, config: &MangaConfig) -> AddonResult<()> {
        save_addon_config(self.kv.as_ref(), CONFIG_KEY, config)
    }

    // ── Remote lookups ─────────────────────────────────────────────────────

    async fn check_mangadex(&self, name: &str) -> Option<MangaUpdate> {
        let url = format!("{}/manga?title={}", MANGADEX_API, urlencoding::encode(name));
        match self.client.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => match resp.json::<Value>().await {
                Ok(data) => parse_mangadex_response(&data),
                Err(e) => {
                    warn!("[manga] MangaDex response for `{}` unreadable: {}", name, e);
                    None
                }
            },
            Ok(resp) => {
                warn!("[manga] MangaDex returned HTTP {} for `{}`", resp.status(), name);
                None
            }
            Err(e) => {
                warn!("[manga] MangaDex request for `{}` failed: {}", name, e);
                None
            }
        }
    }

    async fn check_fallback(&self, name: &str) -> Option<MangaUpdate> {
        let query = r#"
        query ($search: String) {
          Media(search: $search, type: MANGA) {
            id
            chapters
          }
        }
        "#;
        let body = json!({ "query": query, "variables": { "search": name } });
        match self.client.post(ANILIST_API).json(&body).send().await {
            Ok(resp) if resp.status().is_success() => match resp.json::<Value>().await {
                Ok(data) => parse_anilist_response(&data),
                Err(e) => {
                    warn!("[manga] AniList response for `{}` unreadable: {}", name, e);
                    None
                }
            },
            Ok(resp) => {
                warn!("[manga] AniList returned HTTP {} for `{}`", resp.status(), name);
                None
            }
            Err(e) => {
                warn!("[manga] AniList request for `{}` failed: {}", name, e);
                None
            }
        }
    }

    /// MangaDex first, AniList as fallback.
    async fn lookup(&self, name: &str) -> Option<MangaUpdate> {
        match self.check_mangadex(name).await {
            Some(update) => Some(update),
            None => self.check_fallback(name).await,
        }
    }

    // ── Polling ────────────────────────────────────────────────────────────

    /// One poll pass over every tracked title.
    pub async fn run_poll_cycle(&self) -> AddonResult<()> {
        let mut config = self.load_config();
        let Some(channel) = config.channel_id.clone() else {
            return Ok(()); // notification channel not set yet
        };
        let mut changed = false;
        for entry in &mut config.manga_list {
            let Some(update) = self.lookup(&entry.name).await else { continue };
            if update.latest_episode > entry.last_episode {
                self.notify_new_episode(&channel, &entry.name, &update).await;
                entry.last_episode = update.latest_episode;
                changed = true;
            }
        }
        if changed {
            self.save_config(&config)?;
        }
        Ok(())
    }

    async fn notify_new_episode(&self, channel: &str, name: &str, update: &MangaUpdate) {
        info!("[manga] new episode {} of `{}`", update.latest_episode, name);
        let embed = Embed {
            title: Some(format!("New episode of {}", name)),
            description: update.description.clone(),
            url: update.url.clone(),
            color: Some(COLOR_BLUE),
            image: update.cover_image.clone().map(|url| EmbedMedia { url }),
            fields: vec![EmbedField {
                name: "Latest Episode".into(),
                value: format!("Episode {}", update.latest_episode),
                inline: true,
            }],
            footer: Some(EmbedFooter { text: "MangaNotifier".into(), icon_url: None }),
            ..Default::default()
        };
        let msg = OutboundMessage { embeds: vec![embed], ..Default::default() };
        if let Err(e) = self.platform.send_message(channel, &msg).await {
            warn!("[manga] notification for `{}` failed: {}", name, e);
        }
    }

    /// Run the poll loop until the host drops the handle.
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(Duration::from_secs(MANGA_POLL_INTERVAL_SECS));
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if let Err(e) = self.run_poll_cycle().await {
                    warn!("[manga] poll cycle failed: {}", e);
                }
            }
        })
    }

    // ── Command surface ────────────────────────────────────────────────────
    // Replies are user-visible strings; storage errors are recovered here.

    pub async fn add(&self, name: &str) -> String {
        let mut config = self.load_config();
        if config.manga_list.iter().any(|m| m.name.eq_ignore_ascii_case(name)) {
            return format!("{} is already in the list.", name);
        }
        let Some(update) = self.lookup(name).await else {
            return format!("Failed to fetch details for {}.", name);
        };
        config
            .manga_list
            .push(MangaEntry { name: name.to_string(), last_episode: update.latest_episode });
        if let Err(e) = self.save_config(&config) {
            return format!("Error: {}", e);
        }
        format!("Added {} to the list with the latest episode {}.", name, update.latest_episode)
    }

    pub fn remove(&self, name: &str) -> String {
        let mut config = self.load_config();
        config.manga_list.retain(|m| !m.name.eq_ignore_ascii_case(name));
        if let Err(e) = self.save_config(&config) {
            return format!("Error: {}", e);
        }
        format!("Removed {} from the list.", name)
    }

    pub fn list(&self) -> String {
        let config = self.load_config();
        if config.manga_list.is_empty() {
            return "The manga list is empty.".into();
        }
        config.manga_list.iter().map(|m| m.name.as_str()).collect::<Vec<_>>().join("\n")
    }

    pub fn set_channel(&self, channel: &str) -> String {
        let mut config = self.load_config();
        config.channel_id = Some(channel.to_string());
        if let Err(e) = self.save_config(&config) {
            return format!("Error: {}", e);
        }
        format!("Notification channel set to {}.", channel)
    }

    pub async fn info(&self, name: &str) -> String {
        match self.lookup(name).await {
            Some(update) => format!("{}: latest episode {}.", name, update.latest_episode),
            None => format!("Failed to fetch details for {}.", name),
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────
