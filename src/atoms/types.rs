// ── Pagebot Atoms: Core Types ──────────────────────────────────────────────
// Page, rich-content blocks (embeds), and the persisted page-group shape.
//
// Serde field names are the on-disk layout and must stay stable:
//   tenant doc: { "page_groups": { name: { "pages": [...], "timeout": n,
//                 "reactions": bool, "delete_on_timeout": bool } } }
//   page:       { "content": string|null, "embeds": [...] }

use crate::atoms::constants::{MAX_EMBEDS_PER_PAGE, MAX_EMBED_CHARS};
use crate::atoms::error::{AddonError, AddonResult};
use serde::{Deserialize, Serialize};

// ── Embed (rich-content block) ─────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub inline: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedFooter {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedAuthor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
}

/// Image or thumbnail reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedMedia {
    pub url: String,
}

/// One rich-content block, bounded in count (≤10 per page) and size
/// (≤6000 counted characters).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Embed {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    /// ISO-8601 timestamp. A trailing UTC "Z" marker is stripped by the
    /// parser before this field is populated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<EmbedMedia>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<EmbedMedia>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footer: Option<EmbedFooter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<EmbedAuthor>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
}

impl Embed {
    /// Counted text length of the block: title + description + footer text +
    /// author name + every field name and value. This is the value checked
    /// against the 6000-character ceiling.
    pub fn text_len(&self) -> usize {
        let opt = |s: &Option<String>| s.as_deref().map(|v| v.chars().count()).unwrap_or(0);
        opt(&self.title)
            + opt(&self.description)
            + self.footer.as_ref().map(|f| f.text.chars().count()).unwrap_or(0)
            + self.author.as_ref().map(|a| a.name.chars().count()).unwrap_or(0)
            + self
                .fields
                .iter()
                .map(|f| f.name.chars().count() + f.value.chars().count())
                .sum::<usize>()
    }
}

// ── Page ───────────────────────────────────────────────────────────────────

/// One displayable unit: optional plain text body plus 0–10 embeds.
/// Immutable once validated — edits replace the stored page wholesale.
/// Invariants are enforced by `Page::new`; fields are private so a page
/// cannot be mutated into an invalid state after construction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Page {
    content: Option<String>,
    #[serde(default)]
    embeds: Vec<Embed>,
}

impl Page {
    /// Validate and construct a page. Fails `Validation` when neither a
    /// non-empty body nor any embed is present, when more than 10 embeds
    /// are supplied, or when any single embed exceeds 6000 counted
    /// characters.
    pub fn new(content: Option<String>, embeds: Vec<Embed>) -> AddonResult<Self> {
        let has_body = content.as_deref().is_some_and(|c| !c.is_empty());
        if !has_body && embeds.is_empty() {
            return Err(AddonError::validation(
                "a page needs a non-empty 'content' body or at least one embed",
            ));
        }
        if embeds.len() > MAX_EMBEDS_PER_PAGE {
            return Err(AddonError::validation(format!(
                "at most {} embeds per page are supported (got {})",
                MAX_EMBEDS_PER_PAGE,
                embeds.len()
            )));
        }
        for embed in &embeds {
            let len = embed.text_len();
            if len > MAX_EMBED_CHARS {
                return Err(AddonError::validation(format!(
                    "embed size exceeds the limit of {} characters ({})",
                    MAX_EMBED_CHARS, len
                )));
            }
        }
        Ok(Page { content, embeds })
    }

    pub fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }

    pub fn embeds(&self) -> &[Embed] {
        &self.embeds
    }

    /// True when the page carries a non-empty text body.
    pub fn has_content(&self) -> bool {
        self.content.as_deref().is_some_and(|c| !c.is_empty())
    }
}

// ── Page group ─────────────────────────────────────────────────────────────

/// A named, ordered, persisted collection of pages plus navigation settings.
/// Insertion order IS the page order shown to users.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageGroup {
    #[serde(default)]
    pub pages: Vec<Page>,
    /// Default navigation-session timeout in seconds.
    pub timeout: u64,
    /// Navigation style: true = selector-menu paging, false = arrows only.
    pub reactions: bool,
    /// On session timeout: delete the rendered message instead of just
    /// disabling its controls.
    pub delete_on_timeout: bool,
}

impl PageGroup {
    pub fn new(timeout: u64, reactions: bool, delete_on_timeout: bool) -> Self {
        PageGroup { pages: Vec::new(), timeout, reactions, delete_on_timeout }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_requires_body_or_embed() {
        assert!(Page::new(None, vec![]).is_err());
        assert!(Page::new(Some(String::new()), vec![]).is_err());
        assert!(Page::new(Some("hi".into()), vec![]).is_ok());
        assert!(Page::new(None, vec![Embed { title: Some("t".into()), ..Default::default() }])
            .is_ok());
    }

    #[test]
    fn page_rejects_more_than_ten_embeds() {
        let embeds = vec![Embed { title: Some("x".into()), ..Default::default() }; 11];
        let err = Page::new(None, embeds).unwrap_err();
        assert!(matches!(err, AddonError::Validation(_)));
    }

    #[test]
    fn page_rejects_oversized_embed() {
        let embed = Embed { description: Some("a".repeat(6001)), ..Default::default() };
        assert!(Page::new(None, vec![embed]).is_err());
        let embed = Embed { description: Some("a".repeat(6000)), ..Default::default() };
        assert!(Page::new(None, vec![embed]).is_ok());
    }

    #[test]
    fn embed_text_len_counts_all_text_parts() {
        let embed = Embed {
            title: Some("abcd".into()),
            description: Some("efgh".into()),
            footer: Some(EmbedFooter { text: "ij".into(), icon_url: None }),
            author: Some(EmbedAuthor { name: "kl".into(), url: None, icon_url: None }),
            fields: vec![EmbedField { name: "mn".into(), value: "op".into(), inline: false }],
            ..Default::default()
        };
        assert_eq!(embed.text_len(), 4 + 4 + 2 + 2 + 2 + 2);
    }

    #[test]
    fn page_survives_a_serialize_parse_cycle() {
        let page = Page::new(
            Some("Hello".into()),
            vec![Embed {
                title: Some("t".into()),
                color: Some(0x3498db),
                fields: vec![EmbedField { name: "n".into(), value: "v".into(), inline: true }],
                ..Default::default()
            }],
        )
        .unwrap();
        let json = serde_json::to_string(&page).unwrap();
        let back: Page = serde_json::from_str(&json).unwrap();
        assert_eq!(page, back);
    }
}
