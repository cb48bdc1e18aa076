// Pagebot Engine — Content Parser
//
// Turns an untrusted raw text blob (JSON or YAML, typically fetched from a
// paste service) into a validated `Page`. Two phases:
//
//   1. `parse_page` — pure structural phase. Syntax errors -> `Parse`,
//      non-mapping input -> `Schema`, invariant violations -> `Validation`.
//   2. `PageConverter::convert` — structural phase plus a trial render
//      through the live delivery channel. The platform can refuse content
//      that static validation cannot catch (forbidden image URLs etc.);
//      such a refusal surfaces as `RenderRejected` and the page never
//      reaches the store.

use crate::atoms::error::{AddonError, AddonResult};
use crate::atoms::types::{Embed, Page};
use crate::engine::platform::{ChatPlatform, OutboundMessage};
use serde_json::{Map, Value};

// ── Input format ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageFormat {
    Json,
    Yaml,
}

impl PageFormat {
    pub fn label(self) -> &'static str {
        match self {
            PageFormat::Json => "JSON",
            PageFormat::Yaml => "YAML",
        }
    }
}

// ── Structural phase ───────────────────────────────────────────────────────

/// Parse and validate a page from raw text. Surrounding backticks are
/// stripped first so code-block-wrapped input is accepted.
pub fn parse_page(raw: &str, format: PageFormat) -> AddonResult<Page> {
    let mut map = decode(raw.trim().trim_matches('`'), format)?;

    let content = match map.get("content") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => return Err(AddonError::validation("'content' must be a string")),
    };

    let single = map.remove("embed").filter(|v| !v.is_null());
    let list = match map.remove("embeds").filter(|v| !v.is_null()) {
        None => None,
        Some(Value::Array(items)) => Some(items),
        Some(_) => {
            return Err(AddonError::validation(
                "expected 'embeds' to be a list of embed objects",
            ))
        }
    };

    // Ambiguous input is rejected, never merged.
    if single.is_some() && list.as_ref().is_some_and(|items| !items.is_empty()) {
        return Err(AddonError::validation(
            "only one of 'embed' or 'embeds' can be used (not both)",
        ));
    }

    let raw_embeds = single.map(|e| vec![e]).or(list).unwrap_or_default();

    if content.as_deref().map_or(true, str::is_empty) && raw_embeds.is_empty() {
        return Err(AddonError::validation(format!(
            "no 'content' or 'embeds' found in {} data",
            format.label()
        )));
    }

    let embeds = raw_embeds
        .into_iter()
        .enumerate()
        .map(|(i, v)| convert_embed(v, i))
        .collect::<AddonResult<Vec<Embed>>>()?;

    // Count and per-embed size ceilings live in the constructor.
    Page::new(content, embeds)
}

fn decode(raw: &str, format: PageFormat) -> AddonResult<Map<String, Value>> {
    let value: Value = match format {
        PageFormat::Json => {
            serde_json::from_str(raw).map_err(|e| AddonError::parse("JSON", e.to_string()))?
        }
        PageFormat::Yaml => {
            serde_yaml::from_str(raw).map_err(|e| AddonError::parse("YAML", e.to_string()))?
        }
    };
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(AddonError::Schema { format: format.label() }),
    }
}

fn convert_embed(mut value: Value, index: usize) -> AddonResult<Embed> {
    let Some(obj) = value.as_object_mut() else {
        return Err(AddonError::validation(format!("embed {} is not a mapping", index + 1)));
    };
    // Narrow normalization: strip a trailing UTC "Z" marker, nothing more.
    if let Some(Value::String(ts)) = obj.get_mut("timestamp") {
        if ts.ends_with('Z') {
            *ts = ts.trim_end_matches('Z').to_string();
        }
    }
    serde_json::from_value(value)
        .map_err(|e| AddonError::validation(format!("embed {}: {}", index + 1, e)))
}

// ── Conversion with trial render ───────────────────────────────────────────

/// Parser bound to a live delivery channel. `convert` is the path every
/// add/edit command goes through: parse, then prove the page can actually
/// be displayed before it is handed to the store.
pub struct PageConverter<'a> {
    platform: &'a dyn ChatPlatform,
    channel: &'a str,
}

impl<'a> PageConverter<'a> {
    pub fn new(platform: &'a dyn ChatPlatform, channel: &'a str) -> Self {
        PageConverter { platform, channel }
    }

    pub async fn convert(&self, raw: &str, format: PageFormat) -> AddonResult<Page> {
        let page = parse_page(raw, format)?;
        // The trial message stays in the channel (observed behavior).
        self.platform
            .send_message(self.channel, &OutboundMessage::from_page(&page))
            .await
            .map_err(|e| AddonError::RenderRejected(e.to_string()))?;
        Ok(page)
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const JSON_PAGE: &str = r#"{
        "content": "Hello",
        "embeds": [
            { "title": "One", "description": "first", "color": 3447003 },
            { "title": "Two", "fields": [{ "name": "a", "value": "b" }] }
        ]
    }"#;

    const YAML_PAGE: &str = r#"
content: Hello
embeds:
  - title: One
    description: first
    color: 3447003
  - title: Two
    fields:
      - name: a
        value: b
"#;

    #[test]
    fn parses_json_page() {
        let page = parse_page(JSON_PAGE, PageFormat::Json).unwrap();
        assert_eq!(page.content(), Some("Hello"));
        assert_eq!(page.embeds().len(), 2);
        assert_eq!(page.embeds()[0].title.as_deref(), Some("One"));
        assert_eq!(page.embeds()[0].color, Some(3447003));
        assert_eq!(page.embeds()[1].fields[0].name, "a");
    }

    #[test]
    fn parses_yaml_page_identically_to_json() {
        let a = parse_page(JSON_PAGE, PageFormat::Json).unwrap();
        let b = parse_page(YAML_PAGE, PageFormat::Yaml).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn strips_code_block_backticks() {
        let page = parse_page("```{\"content\": \"hi\"}```", PageFormat::Json).unwrap();
        assert_eq!(page.content(), Some("hi"));
    }

    #[test]
    fn syntax_error_is_parse_error() {
        let err = parse_page("{not json", PageFormat::Json).unwrap_err();
        assert!(matches!(err, AddonError::Parse { format: "JSON", .. }));
    }

    #[test]
    fn non_mapping_is_schema_error() {
        let err = parse_page("[1, 2, 3]", PageFormat::Json).unwrap_err();
        assert!(matches!(err, AddonError::Schema { format: "JSON" }));
        let err = parse_page("- a\n- b", PageFormat::Yaml).unwrap_err();
        assert!(matches!(err, AddonError::Schema { format: "YAML" }));
    }

    #[test]
    fn empty_page_is_validation_error() {
        let err = parse_page("{}", PageFormat::Json).unwrap_err();
        assert!(matches!(err, AddonError::Validation(_)));
    }

    #[test]
    fn single_embed_field_is_promoted() {
        let page =
            parse_page(r#"{ "embed": { "title": "only" } }"#, PageFormat::Json).unwrap();
        assert_eq!(page.embeds().len(), 1);
        assert_eq!(page.embeds()[0].title.as_deref(), Some("only"));
    }

    #[test]
    fn embed_and_embeds_together_are_rejected_not_merged() {
        let raw = r#"{ "embed": { "title": "a" }, "embeds": [{ "title": "b" }] }"#;
        let err = parse_page(raw, PageFormat::Json).unwrap_err();
        assert!(matches!(err, AddonError::Validation(_)));
    }

    #[test]
    fn embed_with_empty_embeds_list_is_accepted() {
        let raw = r#"{ "embed": { "title": "a" }, "embeds": [] }"#;
        let page = parse_page(raw, PageFormat::Json).unwrap();
        assert_eq!(page.embeds().len(), 1);
    }

    #[test]
    fn more_than_ten_embeds_is_rejected() {
        let embeds: Vec<String> =
            (0..11).map(|i| format!("{{ \"title\": \"{}\" }}", i)).collect();
        let raw = format!("{{ \"embeds\": [{}] }}", embeds.join(","));
        let err = parse_page(&raw, PageFormat::Json).unwrap_err();
        assert!(matches!(err, AddonError::Validation(_)));
    }

    #[test]
    fn oversized_embed_is_rejected() {
        let raw = format!(
            "{{ \"embeds\": [{{ \"description\": \"{}\" }}] }}",
            "a".repeat(6001)
        );
        let err = parse_page(&raw, PageFormat::Json).unwrap_err();
        assert!(matches!(err, AddonError::Validation(_)));
    }

    #[test]
    fn trailing_z_is_stripped_from_timestamps() {
        let raw = r#"{ "embeds": [{ "title": "t", "timestamp": "2024-05-01T10:00:00Z" }] }"#;
        let page = parse_page(raw, PageFormat::Json).unwrap();
        assert_eq!(page.embeds()[0].timestamp.as_deref(), Some("2024-05-01T10:00:00"));
    }

    #[test]
    fn body_only_page_round_trips() {
        let page = parse_page(r#"{ "content": "solo" }"#, PageFormat::Json).unwrap();
        let json = serde_json::to_string(&page).unwrap();
        assert_eq!(parse_page(&json, PageFormat::Json).unwrap(), page);
    }

    #[test]
    fn embed_page_round_trips_field_for_field() {
        let page = parse_page(JSON_PAGE, PageFormat::Json).unwrap();
        let json = serde_json::to_string(&page).unwrap();
        assert_eq!(parse_page(&json, PageFormat::Json).unwrap(), page);
    }
}
