// ── Pagebot Atoms: Constants ───────────────────────────────────────────────
// All named constants shared across the crate live here.
// Subsystem-local values (API base URLs, config keys) stay with their module.

// ── Page / embed ceilings ──────────────────────────────────────────────────
// Platform limits for a single rendered message. A page that exceeds either
// of these would be refused by the delivery channel, so the parser rejects
// it before it can reach the store.
pub const MAX_EMBEDS_PER_PAGE: usize = 10;
pub const MAX_EMBED_CHARS: usize = 6000;

// ── Navigation defaults ────────────────────────────────────────────────────
/// Session timeout used when a group is created without an explicit value.
pub const DEFAULT_GROUP_TIMEOUT_SECS: u64 = 60;

// ── Outbound HTTP ──────────────────────────────────────────────────────────
// Every network call in the crate (paste fetch, poller requests) goes
// through a client built with this request timeout. No suspension point
// may block indefinitely.
pub const HTTP_REQUEST_TIMEOUT_SECS: u64 = 30;

// ── Poller cadence ─────────────────────────────────────────────────────────
// Used by `spawn()` in engine/addons/manga.rs and engine/addons/wiki.rs.
pub const MANGA_POLL_INTERVAL_SECS: u64 = 30 * 60;
pub const WIKI_POLL_INTERVAL_SECS: u64 = 5 * 60;
