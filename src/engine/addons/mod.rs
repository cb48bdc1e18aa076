// Pagebot Engine — Scheduled-Poll Add-ons
//
// Thin glue add-ons: fetch on a timer, diff against a stored watermark,
// post an embed. No state machine of their own.

pub mod manga;
pub mod wiki;

use crate::atoms::error::AddonResult;
use crate::engine::store::KvStore;
use log::warn;
use serde::de::DeserializeOwned;
use serde::Serialize;

// ── Shared config helpers ──────────────────────────────────────────────────

/// Each add-on stores its config under a unique KV key as one JSON document.
/// Missing or unreadable config falls back to `Default` (a fresh install
/// has no key yet).
pub fn load_addon_config<T: DeserializeOwned + Default>(
    kv: &dyn KvStore,
    config_key: &str,
) -> T {
    match kv.get(config_key) {
        Ok(Some(json)) => serde_json::from_str(&json).unwrap_or_else(|e| {
            warn!("[addons] unreadable {} config, using defaults: {}", config_key, e);
            T::default()
        }),
        _ => T::default(),
    }
}

pub fn save_addon_config<T: Serialize>(
    kv: &dyn KvStore,
    config_key: &str,
    config: &T,
) -> AddonResult<()> {
    kv.set(config_key, &serde_json::to_string(config)?)
}
