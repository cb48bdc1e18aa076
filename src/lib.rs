// Pagebot — chat-bot add-on engine
//
// Hosts three add-ons inside a third-party bot runtime:
//   - a paginated content delivery engine (page groups, content
//     converters, an interactive navigation state machine),
//   - a manga-release poller (MangaDex with AniList fallback),
//   - a wiki-change notifier.
//
// The bot runtime's command dispatch, the chat platform's rendering,
// and the persistent key-value engine are all external collaborators:
// hosts inject a `ChatPlatform` and a `KvStore` and route dispatched
// commands to the `Paginator` / add-on surfaces.

pub mod atoms;
pub mod commands;
pub mod engine;

pub use atoms::error::{AddonError, AddonResult};
pub use atoms::types::{Embed, Page, PageGroup};
pub use commands::{CommandContext, Paginator, Reply};
pub use engine::navigator::{Interaction, NavAction, NavigatorHandle, SessionEnd};
pub use engine::parser::PageFormat;
pub use engine::platform::{ChatPlatform, ControlKind, MessageHandle, OutboundMessage};
pub use engine::store::{KvStore, MemoryStore, SqliteStore};
