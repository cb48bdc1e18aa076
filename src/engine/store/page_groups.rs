// Pagebot Engine — Page Group Store
//
// Source of truth for page groups: a per-tenant JSON document in the
// key-value store, key `page_groups:{tenant}`. Every mutation is a
// read-modify-write; the backing store has no optimistic-concurrency
// primitive, so mutations take a per-tenant mutex from the lock registry.
// The whole tenant document is a single KV value, so the critical section
// is per tenant — strictly coarser than the required per-(tenant, group)
// serialization.
//
// Page indices at this surface are 1-based (what users type); `describe`
// reports 0-based indices (what the original reported).

use crate::atoms::error::{AddonError, AddonResult};
use crate::atoms::types::{Page, PageGroup};
use crate::engine::store::KvStore;
use log::info;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

// ── Persisted tenant document ──────────────────────────────────────────────

#[derive(Debug, Default, Serialize, Deserialize)]
struct TenantDoc {
    #[serde(default)]
    page_groups: BTreeMap<String, PageGroup>,
}

// ── Describe output ────────────────────────────────────────────────────────

/// Snapshot of a group's shape for the describe/info command.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupSummary {
    pub name: String,
    pub timeout: u64,
    pub reactions: bool,
    pub delete_on_timeout: bool,
    /// Total page count.
    pub total: usize,
    /// 0-based indices of pages with a non-empty body.
    pub with_content: Vec<usize>,
    /// 0-based indices of pages counted as "with embeds". The observed
    /// threshold is MORE THAN ONE embed: a page with exactly one block is
    /// not counted. Preserved as-is; see DESIGN.md.
    pub with_embeds: Vec<usize>,
}

// ── Store ──────────────────────────────────────────────────────────────────

pub struct PageGroupStore {
    kv: Arc<dyn KvStore>,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl PageGroupStore {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        PageGroupStore { kv, locks: Mutex::new(HashMap::new()) }
    }

    fn tenant_key(tenant: &str) -> String {
        format!("page_groups:{}", tenant)
    }

    fn lock_for(&self, tenant: &str) -> Arc<Mutex<()>> {
        self.locks.lock().entry(tenant.to_string()).or_default().clone()
    }

    fn load(&self, tenant: &str) -> AddonResult<TenantDoc> {
        match self.kv.get(&Self::tenant_key(tenant))? {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(TenantDoc::default()),
        }
    }

    fn save(&self, tenant: &str, doc: &TenantDoc) -> AddonResult<()> {
        self.kv.set(&Self::tenant_key(tenant), &serde_json::to_string(doc)?)
    }

    /// Run `f` over the tenant document as one critical section, persisting
    /// the document afterwards when `f` succeeds.
    fn mutate<T>(
        &self,
        tenant: &str,
        f: impl FnOnce(&mut TenantDoc) -> AddonResult<T>,
    ) -> AddonResult<T> {
        let lock = self.lock_for(tenant);
        let _guard = lock.lock();
        let mut doc = self.load(tenant)?;
        let out = f(&mut doc)?;
        self.save(tenant, &doc)?;
        Ok(out)
    }

    // ── Group lifecycle ────────────────────────────────────────────────────

    pub fn create(
        &self,
        tenant: &str,
        name: &str,
        timeout: u64,
        reactions: bool,
        delete_on_timeout: bool,
    ) -> AddonResult<()> {
        self.mutate(tenant, |doc| {
            if doc.page_groups.contains_key(name) {
                return Err(AddonError::AlreadyExists(name.to_string()));
            }
            doc.page_groups
                .insert(name.to_string(), PageGroup::new(timeout, reactions, delete_on_timeout));
            Ok(())
        })?;
        info!("[store] created page group `{}` for tenant {}", name, tenant);
        Ok(())
    }

    pub fn delete_group(&self, tenant: &str, name: &str) -> AddonResult<()> {
        self.mutate(tenant, |doc| {
            doc.page_groups
                .remove(name)
                .map(|_| ())
                .ok_or_else(|| AddonError::NotFound(name.to_string()))
        })?;
        info!("[store] deleted page group `{}` for tenant {}", name, tenant);
        Ok(())
    }

    // ── Page mutations (1-based indices) ───────────────────────────────────

    /// Append when `index` is omitted; otherwise insert at the 1-based
    /// position, shifting later pages. `len + 1` is append-equivalent.
    pub fn insert_page(
        &self,
        tenant: &str,
        name: &str,
        page: Page,
        index: Option<usize>,
    ) -> AddonResult<()> {
        self.mutate(tenant, |doc| {
            let group = group_mut(doc, name)?;
            match index {
                None => group.pages.push(page),
                Some(i) => {
                    let len = group.pages.len();
                    if i < 1 || i > len + 1 {
                        return Err(AddonError::IndexOutOfRange { index: i, len });
                    }
                    group.pages.insert(i - 1, page);
                }
            }
            Ok(())
        })
    }

    pub fn remove_page(&self, tenant: &str, name: &str, index: usize) -> AddonResult<()> {
        self.mutate(tenant, |doc| {
            let group = group_mut(doc, name)?;
            check_existing_index(index, group.pages.len())?;
            group.pages.remove(index - 1);
            Ok(())
        })
    }

    /// Wholesale replacement — stored pages are immutable units.
    pub fn replace_page(
        &self,
        tenant: &str,
        name: &str,
        index: usize,
        page: Page,
    ) -> AddonResult<()> {
        self.mutate(tenant, |doc| {
            let group = group_mut(doc, name)?;
            check_existing_index(index, group.pages.len())?;
            group.pages[index - 1] = page;
            Ok(())
        })
    }

    // ── Reads ──────────────────────────────────────────────────────────────

    /// `(name, page_count)` for every group. Re-reads current state on every
    /// call; nothing is cached.
    pub fn list_groups(&self, tenant: &str) -> AddonResult<Vec<(String, usize)>> {
        let doc = self.load(tenant)?;
        Ok(doc
            .page_groups
            .iter()
            .map(|(name, group)| (name.clone(), group.pages.len()))
            .collect())
    }

    pub fn describe(&self, tenant: &str, name: &str) -> AddonResult<GroupSummary> {
        let doc = self.load(tenant)?;
        let group =
            doc.page_groups.get(name).ok_or_else(|| AddonError::NotFound(name.to_string()))?;
        let with_content = group
            .pages
            .iter()
            .enumerate()
            .filter(|(_, p)| p.has_content())
            .map(|(i, _)| i)
            .collect();
        let with_embeds = group
            .pages
            .iter()
            .enumerate()
            .filter(|(_, p)| p.embeds().len() > 1)
            .map(|(i, _)| i)
            .collect();
        Ok(GroupSummary {
            name: name.to_string(),
            timeout: group.timeout,
            reactions: group.reactions,
            delete_on_timeout: group.delete_on_timeout,
            total: group.pages.len(),
            with_content,
            with_embeds,
        })
    }

    /// Pretty-printed JSON of one stored page, exactly as persisted.
    pub fn raw_page(&self, tenant: &str, name: &str, index: usize) -> AddonResult<String> {
        let group = self.snapshot(tenant, name)?;
        check_existing_index(index, group.pages.len())?;
        Ok(serde_json::to_string_pretty(&group.pages[index - 1])?)
    }

    /// Full copy of a group for a navigation session. The session operates
    /// on this snapshot; later edits to the stored group do not affect it.
    pub fn snapshot(&self, tenant: &str, name: &str) -> AddonResult<PageGroup> {
        let doc = self.load(tenant)?;
        doc.page_groups
            .get(name)
            .cloned()
            .ok_or_else(|| AddonError::NotFound(name.to_string()))
    }
}

fn group_mut<'a>(doc: &'a mut TenantDoc, name: &str) -> AddonResult<&'a mut PageGroup> {
    doc.page_groups.get_mut(name).ok_or_else(|| AddonError::NotFound(name.to_string()))
}

/// Valid range for an index that must refer to an existing page: [1, len].
fn check_existing_index(index: usize, len: usize) -> AddonResult<()> {
    if index < 1 || index > len {
        return Err(AddonError::IndexOutOfRange { index, len });
    }
    Ok(())
}

// ── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::types::Embed;
    use crate::engine::store::MemoryStore;

    fn store() -> PageGroupStore {
        PageGroupStore::new(Arc::new(MemoryStore::new()))
    }

    fn body(text: &str) -> Page {
        Page::new(Some(text.into()), vec![]).unwrap()
    }

    fn embeds(n: usize) -> Page {
        let blocks =
            (0..n).map(|i| Embed { title: Some(format!("e{}", i)), ..Default::default() }).collect();
        Page::new(None, blocks).unwrap()
    }

    #[test]
    fn create_is_unique_per_tenant() {
        let s = store();
        s.create("t1", "g", 60, false, false).unwrap();
        let err = s.create("t1", "g", 60, false, false).unwrap_err();
        assert!(matches!(err, AddonError::AlreadyExists(_)));
        // Same name under a different tenant is fine.
        s.create("t2", "g", 60, false, false).unwrap();
    }

    #[test]
    fn group_names_are_case_sensitive() {
        let s = store();
        s.create("t", "News", 60, false, false).unwrap();
        s.create("t", "news", 60, false, false).unwrap();
        assert_eq!(s.list_groups("t").unwrap().len(), 2);
    }

    #[test]
    fn delete_missing_group_is_not_found() {
        let s = store();
        let err = s.delete_group("t", "nope").unwrap_err();
        assert!(matches!(err, AddonError::NotFound(_)));
    }

    #[test]
    fn insert_at_len_plus_one_appends_but_len_plus_two_fails() {
        let s = store();
        s.create("t", "g", 60, false, false).unwrap();
        s.insert_page("t", "g", body("a"), None).unwrap();
        s.insert_page("t", "g", body("b"), Some(2)).unwrap(); // len+1 == append
        let err = s.insert_page("t", "g", body("c"), Some(4)).unwrap_err(); // len+2
        assert!(matches!(err, AddonError::IndexOutOfRange { index: 4, len: 2 }));
        let err = s.insert_page("t", "g", body("c"), Some(0)).unwrap_err();
        assert!(matches!(err, AddonError::IndexOutOfRange { index: 0, .. }));
    }

    #[test]
    fn insert_shifts_later_pages() {
        let s = store();
        s.create("t", "g", 60, false, false).unwrap();
        s.insert_page("t", "g", body("Hello"), None).unwrap();
        s.insert_page("t", "g", embeds(2), Some(1)).unwrap();
        let group = s.snapshot("t", "g").unwrap();
        assert_eq!(group.pages[0].embeds().len(), 2);
        assert_eq!(group.pages[1].content(), Some("Hello"));
    }

    #[test]
    fn remove_and_replace_validate_the_index() {
        let s = store();
        s.create("t", "g", 60, false, false).unwrap();
        s.insert_page("t", "g", body("a"), None).unwrap();
        assert!(matches!(
            s.remove_page("t", "g", 2).unwrap_err(),
            AddonError::IndexOutOfRange { .. }
        ));
        assert!(matches!(
            s.replace_page("t", "g", 0, body("x")).unwrap_err(),
            AddonError::IndexOutOfRange { .. }
        ));
        s.replace_page("t", "g", 1, body("z")).unwrap();
        assert_eq!(s.snapshot("t", "g").unwrap().pages[0].content(), Some("z"));
        s.remove_page("t", "g", 1).unwrap();
        assert_eq!(s.snapshot("t", "g").unwrap().pages.len(), 0);
    }

    #[test]
    fn describe_reports_content_and_embed_subsets() {
        // The announcements scenario: page 1 has two embeds, page 2 is "Hello".
        let s = store();
        s.create("t", "announcements", 60, false, false).unwrap();
        s.insert_page("t", "announcements", body("Hello"), None).unwrap();
        s.insert_page("t", "announcements", embeds(2), Some(1)).unwrap();
        let summary = s.describe("t", "announcements").unwrap();
        assert_eq!(summary.total, 2);
        assert_eq!(summary.with_content, vec![1]);
        assert_eq!(summary.with_embeds, vec![0]);
    }

    #[test]
    fn single_embed_page_is_not_counted_as_with_embeds() {
        let s = store();
        s.create("t", "g", 60, false, false).unwrap();
        s.insert_page("t", "g", embeds(1), None).unwrap();
        let summary = s.describe("t", "g").unwrap();
        assert_eq!(summary.total, 1);
        assert!(summary.with_embeds.is_empty());
    }

    #[test]
    fn list_groups_rereads_current_state() {
        let s = store();
        assert!(s.list_groups("t").unwrap().is_empty());
        s.create("t", "a", 60, false, false).unwrap();
        s.create("t", "b", 30, true, true).unwrap();
        s.insert_page("t", "b", body("x"), None).unwrap();
        let listed = s.list_groups("t").unwrap();
        assert_eq!(listed, vec![("a".to_string(), 0), ("b".to_string(), 1)]);
    }

    #[test]
    fn snapshot_is_isolated_from_later_edits() {
        let s = store();
        s.create("t", "g", 60, false, false).unwrap();
        s.insert_page("t", "g", body("a"), None).unwrap();
        let snap = s.snapshot("t", "g").unwrap();
        s.insert_page("t", "g", body("b"), None).unwrap();
        assert_eq!(snap.pages.len(), 1);
        assert_eq!(s.snapshot("t", "g").unwrap().pages.len(), 2);
    }

    #[test]
    fn raw_page_is_the_persisted_json() {
        let s = store();
        s.create("t", "g", 60, false, false).unwrap();
        s.insert_page("t", "g", body("hi"), None).unwrap();
        let raw = s.raw_page("t", "g", 1).unwrap();
        let v: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(v["content"], "hi");
    }
}
