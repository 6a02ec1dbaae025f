//! Query Cache
//!
//! Last-known server state keyed by a structured [`QueryKey`]. The cache owns
//! its entries: readers get clones, writers go through the methods here (or
//! the crate-internal `edit` used by optimistic mutations), and every change
//! bumps a revision counter that UIs can watch.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::debug;

use crate::api::ApiResult;
use crate::domain::Entity;

/// Structured cache key such as `["questTemplates"]` or `["questTemplate", id]`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey(Vec<String>);

impl QueryKey {
    pub fn new<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(parts.into_iter().map(Into::into).collect())
    }

    pub fn list(name: &str) -> Self {
        Self(vec![name.to_string()])
    }

    pub fn detail(name: &str, id: &str) -> Self {
        Self(vec![name.to_string(), id.to_string()])
    }

    /// Extend the key with one more part
    pub fn with(mut self, part: impl Into<String>) -> Self {
        self.0.push(part.into());
        self
    }

    pub fn parts(&self) -> &[String] {
        &self.0
    }

    /// Prefix match used for invalidation
    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.join(", "))
    }
}

/// Keys used by the bundled collections
pub mod keys {
    use super::QueryKey;

    pub fn quest_templates() -> QueryKey {
        QueryKey::list("questTemplates")
    }

    pub fn quest_template(id: &str) -> QueryKey {
        QueryKey::detail("questTemplate", id)
    }

    pub fn quests() -> QueryKey {
        QueryKey::list("quests")
    }

    pub fn active_quests() -> QueryKey {
        quests().with("active")
    }

    pub fn quest(id: &str) -> QueryKey {
        QueryKey::detail("quest", id)
    }

    pub fn quest_contributions(quest_id: &str) -> QueryKey {
        QueryKey::detail("questContributions", quest_id)
    }

    pub fn goals() -> QueryKey {
        QueryKey::list("goals")
    }

    pub fn goal(id: &str) -> QueryKey {
        QueryKey::detail("goal", id)
    }

    pub fn goal_tasks(goal_id: &str) -> QueryKey {
        QueryKey::detail("goalTasks", goal_id)
    }

    pub fn guilds() -> QueryKey {
        QueryKey::list("guilds")
    }

    pub fn guild(id: &str) -> QueryKey {
        QueryKey::detail("guild", id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CacheData<T> {
    List(Vec<T>),
    Item(T),
}

#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub data: CacheData<T>,
    /// Marked by invalidation; the next fetch goes to the network
    pub stale: bool,
    pub updated_at: DateTime<Utc>,
}

impl<T> CacheEntry<T> {
    pub(crate) fn fresh(data: CacheData<T>) -> Self {
        Self {
            data,
            stale: false,
            updated_at: Utc::now(),
        }
    }
}

pub(crate) type Entries<T> = HashMap<QueryKey, CacheEntry<T>>;

pub struct QueryCache<T> {
    entries: Mutex<Entries<T>>,
    revision: watch::Sender<u64>,
}

impl<T: Entity> Default for QueryCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Entity> QueryCache<T> {
    pub fn new() -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            entries: Mutex::new(HashMap::new()),
            revision,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Entries<T>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self) {
        self.revision.send_modify(|rev| *rev = rev.wrapping_add(1));
    }

    /// Run `f` under the cache lock and publish one revision afterwards.
    ///
    /// Everything `f` does is applied atomically with respect to other
    /// readers and writers.
    pub(crate) fn edit<R>(&self, f: impl FnOnce(&mut Entries<T>) -> R) -> R {
        let result = f(&mut self.lock());
        self.notify();
        result
    }

    // ========================
    // Reads
    // ========================

    pub fn get_list(&self, key: &QueryKey) -> Option<Vec<T>> {
        match &self.lock().get(key)?.data {
            CacheData::List(items) => Some(items.clone()),
            CacheData::Item(_) => None,
        }
    }

    pub fn get_item(&self, key: &QueryKey) -> Option<T> {
        match &self.lock().get(key)?.data {
            CacheData::Item(item) => Some(item.clone()),
            CacheData::List(_) => None,
        }
    }

    pub fn contains(&self, key: &QueryKey) -> bool {
        self.lock().contains_key(key)
    }

    /// Missing entries count as stale
    pub fn is_stale(&self, key: &QueryKey) -> bool {
        self.lock().get(key).map_or(true, |entry| entry.stale)
    }

    pub fn updated_at(&self, key: &QueryKey) -> Option<DateTime<Utc>> {
        self.lock().get(key).map(|entry| entry.updated_at)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    // ========================
    // Writes
    // ========================

    pub fn set_list(&self, key: QueryKey, items: Vec<T>) {
        self.edit(|entries| {
            entries.insert(key, CacheEntry::fresh(CacheData::List(items)));
        });
    }

    pub fn set_item(&self, key: QueryKey, item: T) {
        self.edit(|entries| {
            entries.insert(key, CacheEntry::fresh(CacheData::Item(item)));
        });
    }

    pub fn remove(&self, key: &QueryKey) -> bool {
        self.edit(|entries| entries.remove(key).is_some())
    }

    /// Mark every entry under `prefix` stale. Returns how many were touched.
    pub fn invalidate(&self, prefix: &QueryKey) -> usize {
        let count = self.edit(|entries| {
            let mut count = 0;
            for (key, entry) in entries.iter_mut() {
                if key.starts_with(prefix) {
                    entry.stale = true;
                    count += 1;
                }
            }
            count
        });
        debug!(%prefix, count, "invalidated cache entries");
        count
    }

    pub fn clear(&self) {
        self.edit(|entries| entries.clear());
    }

    // ========================
    // Fetch-through
    // ========================

    /// Return the cached list unless it is missing or stale, otherwise run
    /// `fetch` and store its result.
    pub async fn fetch_list<F, Fut>(&self, key: QueryKey, fetch: F) -> ApiResult<Vec<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ApiResult<Vec<T>>>,
    {
        if !self.is_stale(&key) {
            if let Some(items) = self.get_list(&key) {
                return Ok(items);
            }
        }
        let items = fetch().await?;
        self.set_list(key, items.clone());
        Ok(items)
    }

    pub async fn fetch_item<F, Fut>(&self, key: QueryKey, fetch: F) -> ApiResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ApiResult<T>>,
    {
        if !self.is_stale(&key) {
            if let Some(item) = self.get_item(&key) {
                return Ok(item);
            }
        }
        let item = fetch().await?;
        self.set_item(key, item.clone());
        Ok(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiError;
    use crate::models::Goal;

    fn goal(id: &str, title: &str) -> Goal {
        serde_json::from_value(serde_json::json!({ "id": id, "title": title })).unwrap()
    }

    #[test]
    fn test_key_prefix_matching() {
        let list = keys::quest_templates();
        let detail = list.clone().with("abc");
        assert!(detail.starts_with(&list));
        assert!(!list.starts_with(&detail));
        assert!(!keys::quest_template("abc").starts_with(&list));
        assert_eq!(detail.to_string(), "[questTemplates, abc]");
    }

    #[test]
    fn test_list_and_item_are_distinct() {
        let cache = QueryCache::new();
        cache.set_list(keys::goals(), vec![goal("g1", "Run")]);
        cache.set_item(keys::goal("g1"), goal("g1", "Run"));

        assert_eq!(cache.get_list(&keys::goals()).unwrap().len(), 1);
        assert!(cache.get_item(&keys::goals()).is_none());
        assert_eq!(cache.get_item(&keys::goal("g1")).unwrap().title, "Run");
        assert!(cache.get_list(&keys::goal("g1")).is_none());
    }

    #[test]
    fn test_invalidate_marks_prefix_stale() {
        let cache = QueryCache::new();
        cache.set_list(keys::goals(), vec![]);
        cache.set_list(keys::goals().with("archived"), vec![]);
        cache.set_item(keys::goal("g1"), goal("g1", "Run"));

        assert_eq!(cache.invalidate(&keys::goals()), 2);
        assert!(cache.is_stale(&keys::goals()));
        assert!(!cache.is_stale(&keys::goal("g1")));
        assert!(cache.is_stale(&QueryKey::list("missing")));
    }

    #[test]
    fn test_writes_bump_revision() {
        let cache: QueryCache<Goal> = QueryCache::new();
        let rx = cache.subscribe();
        cache.set_list(keys::goals(), vec![]);
        assert!(rx.has_changed().unwrap());
        assert!(cache.remove(&keys::goals()));
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_list_uses_fresh_entry() {
        let cache = QueryCache::new();
        let first = cache
            .fetch_list(keys::goals(), || async { Ok(vec![goal("g1", "Run")]) })
            .await
            .unwrap();
        assert_eq!(first.len(), 1);

        let cached = cache
            .fetch_list(keys::goals(), || async { Err(ApiError::EmptyResponse) })
            .await
            .unwrap();
        assert_eq!(cached, first);

        cache.invalidate(&keys::goals());
        let refetched = cache
            .fetch_list(keys::goals(), || async { Ok(vec![]) })
            .await
            .unwrap();
        assert!(refetched.is_empty());
        assert!(!cache.is_stale(&keys::goals()));
    }

    #[tokio::test]
    async fn test_fetch_error_leaves_entry_untouched() {
        let cache = QueryCache::new();
        cache.set_item(keys::goal("g1"), goal("g1", "Run"));
        cache.invalidate(&keys::goal("g1"));

        let err = cache
            .fetch_item(keys::goal("g1"), || async { Err(ApiError::http(500, "boom")) })
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(500));
        assert_eq!(cache.get_item(&keys::goal("g1")).unwrap().title, "Run");
    }
}
