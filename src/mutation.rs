//! Optimistic Mutations
//!
//! Create, update and delete against a cached collection. The expected end
//! state is written to the cache before the network call settles; success
//! swaps in the server's entity, failure undoes this mutation's own change
//! and nothing else.
//!
//! Mutations on the same entity id wait for each other. Different entities
//! proceed concurrently. A mutation whose future is dropped before the call
//! settles is rolled back as if the call had failed.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{watch, OwnedMutexGuard};
use tracing::{debug, warn};

use crate::api::{ApiError, ApiResult};
use crate::cache::{CacheData, CacheEntry, Entries, QueryCache, QueryKey};
use crate::domain::{is_temp_id, new_temp_id, DomainError, Entity, Patchable};

type DetailKeyFn = Arc<dyn Fn(&str) -> QueryKey + Send + Sync>;
type LockMap = HashMap<String, Arc<tokio::sync::Mutex<()>>>;

/// Snapshot of a failed mutation, safe to clone into UI state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationError {
    pub status: Option<u16>,
    pub message: String,
}

impl From<&ApiError> for MutationError {
    fn from(err: &ApiError) -> Self {
        Self {
            status: err.status(),
            message: err.user_message(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutationState {
    pub in_flight: usize,
    /// Cleared by the next successful mutation
    pub last_error: Option<MutationError>,
}

impl MutationState {
    pub fn is_pending(&self) -> bool {
        self.in_flight > 0
    }
}

fn list_mut<'a, T>(entries: &'a mut Entries<T>, key: &QueryKey) -> Option<&'a mut Vec<T>> {
    match entries.get_mut(key) {
        Some(CacheEntry {
            data: CacheData::List(items),
            ..
        }) => Some(items),
        _ => None,
    }
}

fn item_mut<'a, T>(entries: &'a mut Entries<T>, key: &QueryKey) -> Option<&'a mut T> {
    match entries.get_mut(key) {
        Some(CacheEntry {
            data: CacheData::Item(item),
            ..
        }) => Some(item),
        _ => None,
    }
}

fn position<T: Entity>(items: &[T], id: &str) -> Option<usize> {
    items.iter().position(|item| item.id() == id)
}

/// Put `entity` in place of the entry with id `target`, dropping any other
/// copy of the entity's own id so a refetch that raced the call leaves no
/// duplicate.
fn replace_in_list<T: Entity>(items: &mut Vec<T>, target: &str, entity: T) {
    let Some(index) = position(items, target) else {
        return;
    };
    let server_id = entity.id().to_string();
    items[index] = entity;
    let mut seen = false;
    items.retain(|item| {
        if item.id() != server_id {
            return true;
        }
        let keep = !seen;
        seen = true;
        keep
    });
}

/// Pre-mutation copies of one entity
struct Snapshot<T> {
    listed: Option<T>,
    detail: Option<T>,
}

/// How to take back one optimistic edit
enum Undo<T> {
    RemovePlaceholder { temp_id: String },
    Reinsert { id: String, removed: Option<(usize, T)> },
    Restore { id: String, detail: QueryKey, snapshot: Snapshot<T> },
}

/// An optimistic edit awaiting its call. Dropped unsettled, it rolls the
/// edit back and releases its in-flight slot.
struct InFlight<'a, T: Entity> {
    collection: &'a OptimisticCollection<T>,
    undo: Option<Undo<T>>,
}

impl<T: Entity> InFlight<'_, T> {
    fn settle(mut self) -> Option<Undo<T>> {
        self.undo.take()
    }
}

impl<T: Entity> Drop for InFlight<'_, T> {
    fn drop(&mut self) {
        let Some(undo) = self.undo.take() else {
            return;
        };
        let collection = self.collection;
        warn!(list = %collection.list_key, "mutation abandoned before settling, rolling back");
        collection.rollback(undo);
        collection
            .state
            .send_modify(|state| state.in_flight = state.in_flight.saturating_sub(1));
    }
}

/// Holds the per-id lock and drops the map entry once nobody else wants it
struct EntityLock<'a> {
    locks: &'a Mutex<LockMap>,
    id: String,
    lock: Arc<tokio::sync::Mutex<()>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl<'a> EntityLock<'a> {
    async fn acquire(locks: &'a Mutex<LockMap>, id: &str) -> EntityLock<'a> {
        let lock = locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(id.to_string())
            .or_default()
            .clone();
        let mut slot = EntityLock {
            locks,
            id: id.to_string(),
            lock,
            guard: None,
        };
        slot.guard = Some(slot.lock.clone().lock_owned().await);
        slot
    }
}

impl Drop for EntityLock<'_> {
    fn drop(&mut self) {
        self.guard.take();
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // the map and this slot hold the only references
        let idle = locks
            .get(&self.id)
            .is_some_and(|l| Arc::ptr_eq(l, &self.lock) && Arc::strong_count(l) == 2);
        if idle {
            locks.remove(&self.id);
        }
    }
}

/// A cached collection with optimistic writes
pub struct OptimisticCollection<T: Entity> {
    cache: Arc<QueryCache<T>>,
    list_key: QueryKey,
    detail_key: DetailKeyFn,
    invalidate_on_success: Vec<QueryKey>,
    locks: Mutex<LockMap>,
    state: watch::Sender<MutationState>,
}

impl<T: Entity> OptimisticCollection<T> {
    pub fn new<F>(cache: Arc<QueryCache<T>>, list_key: QueryKey, detail_key: F) -> Self
    where
        F: Fn(&str) -> QueryKey + Send + Sync + 'static,
    {
        let (state, _) = watch::channel(MutationState::default());
        Self {
            cache,
            list_key,
            detail_key: Arc::new(detail_key),
            invalidate_on_success: Vec::new(),
            locks: Mutex::new(HashMap::new()),
            state,
        }
    }

    /// Mark entries under `prefix` stale after every successful mutation
    pub fn invalidate_on_success(mut self, prefix: QueryKey) -> Self {
        self.invalidate_on_success.push(prefix);
        self
    }

    pub fn cache(&self) -> &Arc<QueryCache<T>> {
        &self.cache
    }

    pub fn list_key(&self) -> &QueryKey {
        &self.list_key
    }

    pub fn detail_key(&self, id: &str) -> QueryKey {
        (self.detail_key)(id)
    }

    pub fn items(&self) -> Option<Vec<T>> {
        self.cache.get_list(&self.list_key)
    }

    pub fn state(&self) -> MutationState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<MutationState> {
        self.state.subscribe()
    }

    // ========================
    // Bookkeeping
    // ========================

    fn begin(&self, undo: Undo<T>) -> InFlight<'_, T> {
        self.state.send_modify(|state| state.in_flight += 1);
        InFlight {
            collection: self,
            undo: Some(undo),
        }
    }

    fn rollback(&self, undo: Undo<T>) {
        self.cache.edit(|entries| match undo {
            Undo::RemovePlaceholder { temp_id } => {
                if let Some(items) = list_mut(entries, &self.list_key) {
                    items.retain(|item| item.id() != temp_id);
                }
            }
            Undo::Reinsert {
                id,
                removed: Some((index, entity)),
            } => {
                if let Some(items) = list_mut(entries, &self.list_key) {
                    if position(items, &id).is_none() {
                        let index = index.min(items.len());
                        items.insert(index, entity);
                    }
                }
            }
            Undo::Reinsert { removed: None, .. } => {}
            Undo::Restore {
                id,
                detail,
                snapshot,
            } => {
                if let Some(before) = snapshot.listed {
                    if let Some(items) = list_mut(entries, &self.list_key) {
                        if let Some(index) = position(items, &id) {
                            items[index] = before;
                        }
                    }
                }
                if let Some(before) = snapshot.detail {
                    if let Some(item) = item_mut(entries, &detail) {
                        *item = before;
                    }
                }
            }
        });
    }

    fn finish<R>(&self, result: &ApiResult<R>) {
        self.state.send_modify(|state| {
            state.in_flight = state.in_flight.saturating_sub(1);
            match result {
                Ok(_) => state.last_error = None,
                Err(err) => state.last_error = Some(err.into()),
            }
        });
        if result.is_ok() {
            for prefix in &self.invalidate_on_success {
                self.cache.invalidate(prefix);
            }
        }
    }

    #[cfg(test)]
    fn locks(&self) -> std::sync::MutexGuard<'_, LockMap> {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `fut` while holding the async lock for `id`.
    async fn serialized<R>(&self, id: &str, fut: impl Future<Output = R>) -> R {
        let _slot = EntityLock::acquire(&self.locks, id).await;
        fut.await
    }

    fn reject_temp_id(id: &str) -> ApiResult<()> {
        if is_temp_id(id) {
            return Err(DomainError::Conflict(format!(
                "{id} has not been confirmed by the server yet"
            ))
            .into());
        }
        Ok(())
    }

    // ========================
    // Create
    // ========================

    /// Prepend `draft` under a fresh temporary id, then await `call`.
    ///
    /// Nothing is inserted if the list has not been loaded yet; the server
    /// entity is still written to its detail key on success.
    pub async fn create<Fut>(&self, mut draft: T, call: Fut) -> ApiResult<T>
    where
        Fut: Future<Output = ApiResult<T>>,
    {
        let temp_id = new_temp_id();
        draft.set_id(temp_id.clone());

        let inserted = self.cache.edit(|entries| match list_mut(entries, &self.list_key) {
            Some(items) => {
                items.insert(0, draft);
                true
            }
            None => false,
        });
        debug!(list = %self.list_key, %temp_id, inserted, "optimistic create");
        let pending = self.begin(Undo::RemovePlaceholder {
            temp_id: temp_id.clone(),
        });

        let result = call.await;
        let undo = pending.settle();
        match &result {
            Ok(created) => {
                let detail = self.detail_key(created.id());
                self.cache.edit(|entries| {
                    if let Some(items) = list_mut(entries, &self.list_key) {
                        replace_in_list(items, &temp_id, created.clone());
                    }
                    entries.insert(detail, CacheEntry::fresh(CacheData::Item(created.clone())));
                });
            }
            Err(err) => {
                warn!(list = %self.list_key, %temp_id, "create failed, removing placeholder: {err}");
                if let Some(undo) = undo {
                    self.rollback(undo);
                }
            }
        }
        self.finish(&result);
        result
    }

    // ========================
    // Delete
    // ========================

    /// Remove `id` from the list, then await `call`. Failure puts it back at
    /// its former position.
    pub async fn delete<Fut>(&self, id: &str, call: Fut) -> ApiResult<()>
    where
        Fut: Future<Output = ApiResult<()>>,
    {
        Self::reject_temp_id(id)?;
        self.serialized(id, async {
            let removed = self.cache.edit(|entries| {
                let items = list_mut(entries, &self.list_key)?;
                let index = position(items, id)?;
                Some((index, items.remove(index)))
            });
            let pending = self.begin(Undo::Reinsert {
                id: id.to_string(),
                removed,
            });

            let result = call.await;
            let undo = pending.settle();
            match &result {
                Ok(()) => {
                    self.cache.remove(&self.detail_key(id));
                }
                Err(err) => {
                    warn!(list = %self.list_key, id, "delete failed, restoring entity: {err}");
                    if let Some(undo) = undo {
                        self.rollback(undo);
                    }
                }
            }
            self.finish(&result);
            result
        })
        .await
    }
}

impl<T: Patchable> OptimisticCollection<T> {
    // ========================
    // Update
    // ========================

    /// Merge `patch` into the cached entity, then await `call`.
    pub async fn update<Fut>(&self, id: &str, patch: T::Patch, call: Fut) -> ApiResult<T>
    where
        Fut: Future<Output = ApiResult<T>>,
    {
        Self::reject_temp_id(id)?;
        let detail = self.detail_key(id);
        self.serialized(id, async {
            let snapshot = self.cache.edit(|entries| {
                let listed = list_mut(entries, &self.list_key)
                    .and_then(|items| items.iter_mut().find(|item| item.id() == id))
                    .map(|item| {
                        let before = item.clone();
                        item.apply_patch(&patch);
                        before
                    });
                let detailed = item_mut(entries, &detail).map(|item| {
                    let before = item.clone();
                    item.apply_patch(&patch);
                    before
                });
                Snapshot {
                    listed,
                    detail: detailed,
                }
            });
            let pending = self.begin(Undo::Restore {
                id: id.to_string(),
                detail: detail.clone(),
                snapshot,
            });

            let result = call.await;
            let undo = pending.settle();
            match &result {
                Ok(updated) => {
                    self.cache.edit(|entries| {
                        if let Some(items) = list_mut(entries, &self.list_key) {
                            replace_in_list(items, id, updated.clone());
                        }
                        entries.insert(detail.clone(), CacheEntry::fresh(CacheData::Item(updated.clone())));
                    });
                }
                Err(err) => {
                    warn!(list = %self.list_key, id, "update failed, restoring snapshot: {err}");
                    if let Some(undo) = undo {
                        self.rollback(undo);
                    }
                }
            }
            self.finish(&result);
            result
        })
        .await
    }
}
