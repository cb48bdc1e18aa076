// Pagebot — Paginator Command Boundary
//
// The host bot runtime owns dispatch and permission checks; it routes the
// paginator command surface here. Every `AddonError` raised below this
// point is recovered HERE and turned into a user-visible `Reply` — nothing
// in this module may crash the hosting process. (`NotAuthorized` is the
// one exception handled deeper: the navigator delivers it privately to the
// offending actor without touching session state.)

use crate::atoms::error::{AddonError, AddonResult};
use crate::atoms::types::Page;
use crate::engine::navigator::{self, NavigatorHandle, SessionConfig};
use crate::engine::parser::{PageConverter, PageFormat};
use crate::engine::platform::ChatPlatform;
use crate::engine::resolver::{default_client, ResolverRegistry};
use crate::engine::store::{KvStore, PageGroupStore};
use std::sync::Arc;
use std::time::Duration;

// ── Invocation context ─────────────────────────────────────────────────────

/// Who invoked a command, where. Supplied by the host dispatcher.
#[derive(Debug, Clone)]
pub struct CommandContext {
    /// Server/tenant scope for group names.
    pub tenant: String,
    /// Channel the reply (and any trial render) goes to.
    pub channel: String,
    /// Invoker identity; becomes the session owner for `start`.
    pub invoker: String,
}

// ── Replies ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Text(String),
    /// Raw page dumps are delivered as a file attachment.
    File { name: String, content: String },
}

impl Reply {
    pub fn error(e: &AddonError) -> Reply {
        Reply::Text(format!("Error: {}", e))
    }
}

fn recover(result: AddonResult<Reply>) -> Reply {
    result.unwrap_or_else(|e| Reply::error(&e))
}

// ── Paginator ──────────────────────────────────────────────────────────────

pub struct Paginator {
    store: PageGroupStore,
    platform: Arc<dyn ChatPlatform>,
    resolvers: ResolverRegistry,
}

impl Paginator {
    pub fn new(kv: Arc<dyn KvStore>, platform: Arc<dyn ChatPlatform>) -> AddonResult<Self> {
        let client = default_client()?;
        Ok(Paginator {
            store: PageGroupStore::new(kv),
            platform,
            resolvers: ResolverRegistry::new(client),
        })
    }

    /// Construct with explicit link resolvers (tests, exotic paste hosts).
    pub fn with_resolvers(
        kv: Arc<dyn KvStore>,
        platform: Arc<dyn ChatPlatform>,
        resolvers: ResolverRegistry,
    ) -> Self {
        Paginator { store: PageGroupStore::new(kv), platform, resolvers }
    }

    pub fn store(&self) -> &PageGroupStore {
        &self.store
    }

    // ── Group lifecycle ────────────────────────────────────────────────────

    pub fn create_group(
        &self,
        ctx: &CommandContext,
        name: &str,
        use_selector: bool,
        timeout: u64,
        delete_on_timeout: bool,
    ) -> Reply {
        recover((|| {
            self.store.create(&ctx.tenant, name, timeout, use_selector, delete_on_timeout)?;
            Ok(Reply::Text(format!("Created a new paginator group named `{}`.", name)))
        })())
    }

    pub fn delete_group(&self, ctx: &CommandContext, name: &str) -> Reply {
        recover((|| {
            self.store.delete_group(&ctx.tenant, name)?;
            Ok(Reply::Text(format!("Deleted the paginator group named `{}`.", name)))
        })())
    }

    // ── Page mutations ─────────────────────────────────────────────────────

    /// Resolve the link, parse + trial-render the content, then insert.
    /// The page is persisted only after the platform has proven it can be
    /// displayed.
    pub async fn add_page(
        &self,
        ctx: &CommandContext,
        group: &str,
        link: &str,
        format: PageFormat,
        index: Option<usize>,
    ) -> Reply {
        recover(
            async {
                let page = self.convert(ctx, link, format).await?;
                self.store.insert_page(&ctx.tenant, group, page, index)?;
                Ok(Reply::Text(format!(
                    "Added a page to the paginator group named `{}`.",
                    group
                )))
            }
            .await,
        )
    }

    /// Wholesale replacement of the page at the 1-based index.
    pub async fn replace_page(
        &self,
        ctx: &CommandContext,
        group: &str,
        index: usize,
        link: &str,
        format: PageFormat,
    ) -> Reply {
        recover(
            async {
                let page = self.convert(ctx, link, format).await?;
                self.store.replace_page(&ctx.tenant, group, index, page)?;
                Ok(Reply::Text(format!(
                    "Edited page number `{}` in the paginator group named `{}`.",
                    index, group
                )))
            }
            .await,
        )
    }

    async fn convert(
        &self,
        ctx: &CommandContext,
        link: &str,
        format: PageFormat,
    ) -> AddonResult<Page> {
        let raw = self.resolvers.resolve(link).await?;
        PageConverter::new(self.platform.as_ref(), &ctx.channel).convert(&raw, format).await
    }

    pub fn remove_page(&self, ctx: &CommandContext, group: &str, index: usize) -> Reply {
        recover((|| {
            self.store.remove_page(&ctx.tenant, group, index)?;
            Ok(Reply::Text(format!(
                "Removed page number `{}` from the paginator group named `{}`.",
                index, group
            )))
        })())
    }

    // ── Inspection ─────────────────────────────────────────────────────────

    pub fn list_groups(&self, ctx: &CommandContext) -> Reply {
        recover((|| {
            let groups = self.store.list_groups(&ctx.tenant)?;
            if groups.is_empty() {
                return Ok(Reply::Text("There are no paginator groups in this server.".into()));
            }
            let mut out = String::from("Paginator groups:\n");
            for (name, count) in groups {
                out.push_str(&format!("**{}** - {} pages\n", name, count));
            }
            Ok(Reply::Text(out))
        })())
    }

    pub fn describe_group(&self, ctx: &CommandContext, group: &str) -> Reply {
        recover((|| {
            let s = self.store.describe(&ctx.tenant, group)?;
            Ok(Reply::Text(format!(
                "Paginator group: {}\n\
                 **Timeout:** {} seconds\n\
                 **Delete after timeout:** {}\n\
                 **Selector menu:** {}\n\
                 **Pages:** {} total\n\
                 {} pages with content (indices {:?})\n\
                 {} pages with embeds (indices {:?})",
                s.name,
                s.timeout,
                s.delete_on_timeout,
                s.reactions,
                s.total,
                s.with_content.len(),
                s.with_content,
                s.with_embeds.len(),
                s.with_embeds,
            )))
        })())
    }

    pub fn dump_raw_page(&self, ctx: &CommandContext, group: &str, index: usize) -> Reply {
        recover((|| {
            let content = self.store.raw_page(&ctx.tenant, group, index)?;
            Ok(Reply::File { name: format!("{}.json", group), content })
        })())
    }

    // ── Interactive start ──────────────────────────────────────────────────

    /// Load a snapshot of the group and hand it to the navigator, which
    /// owns the interactive lifecycle from here. `page` is 1-based; an
    /// out-of-range value fails before any message is sent. Failures come
    /// back as a ready-to-send user `Reply`.
    pub async fn start(
        &self,
        ctx: &CommandContext,
        group: &str,
        page: Option<usize>,
        timeout: Option<u64>,
    ) -> Result<NavigatorHandle, Reply> {
        self.try_start(ctx, group, page, timeout).await.map_err(|e| Reply::error(&e))
    }

    async fn try_start(
        &self,
        ctx: &CommandContext,
        group_name: &str,
        page: Option<usize>,
        timeout: Option<u64>,
    ) -> AddonResult<NavigatorHandle> {
        let group = self.store.snapshot(&ctx.tenant, group_name)?;
        if group.pages.is_empty() {
            return Err(AddonError::validation(format!(
                "the paginator group named `{}` is empty",
                group_name
            )));
        }
        let config = SessionConfig {
            channel: ctx.channel.clone(),
            invoker: ctx.invoker.clone(),
            timeout: Duration::from_secs(timeout.unwrap_or(group.timeout)),
            delete_on_timeout: group.delete_on_timeout,
            use_selector: group.reactions,
            timeout_message: None,
        };
        navigator::start(self.platform.clone(), group.pages, page, config).await
    }
}
