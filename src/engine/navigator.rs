// Pagebot Engine — Pagination Navigator
//
// Interactive, per-invocation state machine over an immutable page
// snapshot: Active(index) -> Closed (invoker) | TimedOut (deadline).
// All index arithmetic is modulo the page count — wraparound, not
// clamping. Interactions are serialized through one mpsc channel, so the
// session is single-writer by construction.
//
// The deadline is computed once at start and is NOT extended by
// interactions (observed behavior, preserved literally — see DESIGN.md).

use crate::atoms::error::{AddonError, AddonResult};
use crate::atoms::types::Page;
use crate::engine::platform::{
    ChatPlatform, Control, ControlKind, ControlSet, MessageHandle, OutboundMessage, Selector,
};
use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

// ── Actions ────────────────────────────────────────────────────────────────

/// The closed set of control activations a session understands. Hosts map
/// their platform's component events onto these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavAction {
    Forward,
    Backward,
    First,
    Last,
    /// 0-based target page, produced by the selector menu. Valid by
    /// construction — selector entries are built from the page list.
    JumpTo(usize),
    Close,
}

/// One control activation: who pressed, and what.
#[derive(Debug, Clone)]
pub struct Interaction {
    pub actor: String,
    pub action: NavAction,
}

/// Terminal outcome of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// Invoker pressed close; the rendered message was deleted.
    Closed,
    /// Deadline expired; the message was deleted or its controls disabled
    /// per the group's policy.
    TimedOut,
    /// The host dropped the event channel (process shutdown). No teardown
    /// side effects — sessions are not durable.
    Detached,
}

// ── Pure transition core ───────────────────────────────────────────────────

/// Index transition for a non-close action. `len` must be ≥ 1.
pub fn advance(index: usize, len: usize, action: NavAction) -> usize {
    match action {
        NavAction::Forward => (index + 1) % len,
        NavAction::Backward => (index + len - 1) % len,
        NavAction::First => 0,
        NavAction::Last => len - 1,
        NavAction::JumpTo(k) => k,
        NavAction::Close => index,
    }
}

/// Control visibility policy:
///   len == 1  -> close only;
///   len == 2  -> back / indicator / forward / close (first and last are
///                redundant with two pages);
///   len  > 2  -> the full five-control set plus close, with first/last
///                rendered disabled at their respective boundaries.
/// The jump selector appears whenever `use_selector` and there is more than
/// one page. The indicator is always inert.
pub fn control_layout(len: usize, index: usize, use_selector: bool) -> ControlSet {
    let indicator = Control {
        kind: ControlKind::PageIndicator(format!("Page {}/{}", index + 1, len)),
        disabled: true,
    };
    let mut buttons = Vec::new();
    if len == 2 {
        buttons.push(Control { kind: ControlKind::Backward, disabled: false });
        buttons.push(indicator);
        buttons.push(Control { kind: ControlKind::Forward, disabled: false });
    } else if len > 2 {
        buttons.push(Control { kind: ControlKind::First, disabled: index == 0 });
        buttons.push(Control { kind: ControlKind::Backward, disabled: false });
        buttons.push(indicator);
        buttons.push(Control { kind: ControlKind::Forward, disabled: false });
        buttons.push(Control { kind: ControlKind::Last, disabled: index == len - 1 });
    }
    buttons.push(Control { kind: ControlKind::Close, disabled: false });

    let selector = (use_selector && len > 1).then(|| Selector {
        options: (1..=len).map(|i| format!("Go to page {}", i)).collect(),
        disabled: false,
    });

    ControlSet { selector, buttons }
}

// ── Session ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub channel: String,
    /// Only this identity may drive the controls.
    pub invoker: String,
    pub timeout: Duration,
    pub delete_on_timeout: bool,
    pub use_selector: bool,
    /// Optional follow-up notice sent after a disable-style timeout.
    pub timeout_message: Option<String>,
}

/// Host-side handle: feed control activations in, await the outcome.
pub struct NavigatorHandle {
    pub id: String,
    pub events: mpsc::Sender<Interaction>,
    pub finished: JoinHandle<SessionEnd>,
}

struct NavigatorSession {
    id: String,
    pages: Arc<Vec<Page>>,
    index: usize,
    platform: Arc<dyn ChatPlatform>,
    config: SessionConfig,
    message: MessageHandle,
    rx: mpsc::Receiver<Interaction>,
}

/// Start a navigation session over a page snapshot. `start_page` is the
/// 1-based page number; bounds are checked before anything is sent, so an
/// out-of-range start never produces a message.
pub async fn start(
    platform: Arc<dyn ChatPlatform>,
    pages: Vec<Page>,
    start_page: Option<usize>,
    config: SessionConfig,
) -> AddonResult<NavigatorHandle> {
    if pages.is_empty() {
        return Err(AddonError::validation("cannot paginate an empty page list"));
    }
    let index = match start_page {
        None => 0,
        Some(p) if (1..=pages.len()).contains(&p) => p - 1,
        Some(p) => return Err(AddonError::IndexOutOfRange { index: p, len: pages.len() }),
    };

    let pages = Arc::new(pages);
    let message = platform
        .send_message(&config.channel, &render(&pages, index, config.use_selector))
        .await?;

    let id = uuid::Uuid::new_v4().to_string();
    info!(
        "[navigator] session {} started: {} pages, index {}, timeout {:?}",
        id,
        pages.len(),
        index,
        config.timeout
    );

    let (tx, rx) = mpsc::channel(16);
    let session = NavigatorSession { id: id.clone(), pages, index, platform, config, message, rx };
    let finished = tokio::spawn(session.run());
    Ok(NavigatorHandle { id, events: tx, finished })
}

fn render(pages: &[Page], index: usize, use_selector: bool) -> OutboundMessage {
    let page = &pages[index];
    OutboundMessage {
        content: page.content().map(str::to_owned),
        embeds: page.embeds().to_vec(),
        controls: Some(control_layout(pages.len(), index, use_selector)),
    }
}

impl NavigatorSession {
    async fn run(mut self) -> SessionEnd {
        let deadline = Instant::now() + self.config.timeout;
        loop {
            tokio::select! {
                _ = tokio::time::sleep_until(deadline) => {
                    return self.finish_timed_out().await;
                }
                event = self.rx.recv() => match event {
                    None => {
                        info!("[navigator] session {} detached", self.id);
                        return SessionEnd::Detached;
                    }
                    Some(interaction) => {
                        if let Some(end) = self.handle(interaction).await {
                            return end;
                        }
                    }
                }
            }
        }
    }

    /// Process one activation. Returns the terminal state on close.
    async fn handle(&mut self, interaction: Interaction) -> Option<SessionEnd> {
        if interaction.actor != self.config.invoker {
            // Rejected privately; no state transition, no message edit.
            if let Err(e) = self
                .platform
                .send_private(&interaction.actor, &AddonError::NotAuthorized.to_string())
                .await
            {
                warn!("[navigator] session {}: private rejection failed: {}", self.id, e);
            }
            return None;
        }
        match interaction.action {
            NavAction::Close => {
                if let Err(e) = self.platform.delete_message(&self.message).await {
                    warn!("[navigator] session {}: close delete failed: {}", self.id, e);
                }
                info!("[navigator] session {} closed by invoker", self.id);
                Some(SessionEnd::Closed)
            }
            action => {
                self.index = advance(self.index, self.pages.len(), action);
                let msg = render(&self.pages, self.index, self.config.use_selector);
                if let Err(e) = self.platform.edit_message(&self.message, &msg).await {
                    warn!("[navigator] session {}: edit failed: {}", self.id, e);
                }
                None
            }
        }
    }

    async fn finish_timed_out(self) -> SessionEnd {
        info!("[navigator] session {} timed out", self.id);
        if self.config.delete_on_timeout {
            if let Err(e) = self.platform.delete_message(&self.message).await {
                warn!("[navigator] session {}: timeout delete failed: {}", self.id, e);
            }
        } else {
            let mut msg = render(&self.pages, self.index, self.config.use_selector);
            if let Some(controls) = &mut msg.controls {
                controls.disable_all();
            }
            if let Err(e) = self.platform.edit_message(&self.message, &msg).await {
                warn!("[navigator] session {}: timeout disable failed: {}", self.id, e);
            }
            if let Some(notice) = &self.config.timeout_message {
                if let Err(e) = self
                    .platform
                    .send_message(&self.config.channel, &OutboundMessage::text(notice.clone()))
                    .await
                {
                    warn!("[navigator] session {}: timeout notice failed: {}", self.id, e);
                }
            }
        }
        SessionEnd::TimedOut
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────
