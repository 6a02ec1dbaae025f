//! Cancellable Background Tasks
//!
//! Debounce timers, polling loops and the carousel all run as tokio tasks
//! behind a [`TaskHandle`]. [`KeyedTasks`] keeps at most one outstanding task
//! per logical key: scheduling a new one cancels its predecessor.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::task::AbortHandle;

/// Owned handle to a spawned task. Dropping it cancels the task.
#[derive(Debug)]
pub struct TaskHandle {
    abort: AbortHandle,
}

impl TaskHandle {
    /// Spawn `future` on the current tokio runtime.
    pub fn spawn<F>(future: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Self {
            abort: tokio::spawn(future).abort_handle(),
        }
    }

    pub fn cancel(&self) {
        self.abort.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.abort.is_finished()
    }
}

impl Drop for TaskHandle {
    fn drop(&mut self) {
        self.abort.abort();
    }
}

/// One task slot per key
#[derive(Debug)]
pub struct KeyedTasks<K> {
    slots: Mutex<HashMap<K, TaskHandle>>,
}

impl<K: Eq + Hash> Default for KeyedTasks<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash> KeyedTasks<K> {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Store `handle` under `key`, cancelling whatever was there.
    pub fn replace(&self, key: K, handle: TaskHandle) {
        let previous = self.lock().insert(key, handle);
        drop(previous);
    }

    /// Cancel and forget the task under `key`. Returns whether one existed.
    pub fn cancel(&self, key: &K) -> bool {
        self.lock().remove(key).is_some()
    }

    pub fn cancel_all(&self) {
        let drained: Vec<TaskHandle> = self.lock().drain().map(|(_, handle)| handle).collect();
        drop(drained);
    }

    /// Keys whose task has not finished yet
    pub fn active_count(&self) -> usize {
        self.lock().values().filter(|handle| !handle.is_finished()).count()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<K, TaskHandle>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
