// Pagebot Engine — Chat Platform Seam
//
// The chat platform's message/embed rendering and interaction delivery are
// external collaborators. Hosts implement `ChatPlatform` over their bridge
// (Discord REST, Matrix, webchat, ...); the engine only ever talks to this
// trait, so the navigator and parser can be driven by a mock in tests.

use crate::atoms::error::AddonResult;
use crate::atoms::types::{Embed, Page};
use async_trait::async_trait;

// ── Message handle ─────────────────────────────────────────────────────────

/// Opaque reference to a message the platform has rendered. The engine never
/// inspects it; it is handed back for edit/delete calls.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageHandle(pub String);

// ── Interactive controls ───────────────────────────────────────────────────

/// The closed set of controls a navigation session can render. How the host
/// platform represents them (buttons, reactions, keyboard rows) is its
/// business; the engine only describes kind + disabled state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlKind {
    First,
    Backward,
    /// Inert "Page x/N" label between the arrows.
    PageIndicator(String),
    Forward,
    Last,
    Close,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Control {
    pub kind: ControlKind,
    pub disabled: bool,
}

/// Optional jump-to-page selector menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    /// One label per page, in page order. Choosing entry k maps to
    /// `NavAction::JumpTo(k)`.
    pub options: Vec<String>,
    pub disabled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControlSet {
    pub selector: Option<Selector>,
    pub buttons: Vec<Control>,
}

impl ControlSet {
    /// Render every control inert (timeout teardown without deletion).
    pub fn disable_all(&mut self) {
        if let Some(sel) = &mut self.selector {
            sel.disabled = true;
        }
        for b in &mut self.buttons {
            b.disabled = true;
        }
    }
}

// ── Outbound message ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutboundMessage {
    pub content: Option<String>,
    pub embeds: Vec<Embed>,
    pub controls: Option<ControlSet>,
}

impl OutboundMessage {
    /// A page rendered without controls (trial renders, poller notices).
    pub fn from_page(page: &Page) -> Self {
        OutboundMessage {
            content: page.content().map(str::to_owned),
            embeds: page.embeds().to_vec(),
            controls: None,
        }
    }

    pub fn text(content: impl Into<String>) -> Self {
        OutboundMessage { content: Some(content.into()), ..Default::default() }
    }
}

// ── Platform trait ─────────────────────────────────────────────────────────

#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// Render a message into a channel. A failure here is how the platform
    /// vetoes content (forbidden image URLs etc.) — the parser's trial
    /// render relies on that.
    async fn send_message(
        &self,
        channel: &str,
        message: &OutboundMessage,
    ) -> AddonResult<MessageHandle>;

    /// Replace a previously sent message's content/embeds/controls.
    async fn edit_message(
        &self,
        handle: &MessageHandle,
        message: &OutboundMessage,
    ) -> AddonResult<()>;

    async fn delete_message(&self, handle: &MessageHandle) -> AddonResult<()>;

    /// Reply privately (ephemerally) to one user; invisible to the channel.
    async fn send_private(&self, user: &str, text: &str) -> AddonResult<()>;
}
