// ── Pagebot Atoms: Error Types ─────────────────────────────────────────────
// Single canonical error enum for the add-on engine, built with `thiserror`.
//
// Design rules:
//   • One variant per failure the command boundary can show to a user.
//   • The `#[from]` attribute wires std/external error conversions.
//   • Every variant is recovered in commands.rs and turned into a reply;
//     none of them may crash the hosting process.
//   • `NotAuthorized` is additionally delivered privately to the offending
//     actor by the navigator, without touching session state.

use thiserror::Error;

// ── Primary error enum ─────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum AddonError {
    /// Page group is absent for this tenant.
    #[error("A page group named `{0}` does not exist.")]
    NotFound(String),

    /// A group with the same name already exists in this tenant.
    #[error("A page group named `{0}` already exists. Please use a different name.")]
    AlreadyExists(String),

    /// 1-based page index outside the valid range for the group.
    #[error("Page index `{index}` is out of range. This group has {len} pages.")]
    IndexOutOfRange { index: usize, len: usize },

    /// Raw text is not valid syntax for the declared format.
    #[error("{format} parse error: {message}")]
    Parse { format: &'static str, message: String },

    /// The decoded value is not an object/mapping.
    #[error("The provided {format} does not represent a mapping.")]
    Schema { format: &'static str },

    /// Structurally decodable but violates a page invariant.
    #[error("Invalid page: {0}")]
    Validation(String),

    /// The platform refused to display a page that validated structurally.
    #[error("The platform rejected the page on trial render: {0}")]
    RenderRejected(String),

    /// Link matches no known paste-service pattern.
    #[error("`{0}` is not a recognized paste link.")]
    InvalidLink(String),

    /// Paste service answered with a non-success HTTP status.
    #[error("`{link}` returned HTTP {status}.")]
    FetchFailed { link: String, status: u16 },

    /// Interaction from someone other than the session invoker.
    #[error("You aren't allowed to interact with this. Back off!")]
    NotAuthorized,

    // ── Ambient variants ───────────────────────────────────────────────────

    /// Filesystem or OS-level I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization / deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP / network failure (reqwest layer).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Backing key-value store failure.
    #[error("Storage error: {0}")]
    Storage(String),
}

// ── Convenience constructors ───────────────────────────────────────────────

impl AddonError {
    /// Create a parse error for the given input format.
    pub fn parse(format: &'static str, message: impl Into<String>) -> Self {
        Self::Parse { format, message: message.into() }
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

impl From<rusqlite::Error> for AddonError {
    fn from(e: rusqlite::Error) -> Self {
        AddonError::Storage(e.to_string())
    }
}

// ── Convenience alias ──────────────────────────────────────────────────────

/// All add-on operations should return this type.
/// At the command boundary, convert with `Reply::error`.
pub type AddonResult<T> = Result<T, AddonError>;
