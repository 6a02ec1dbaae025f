//! Active Goals Poller
//!
//! One repeating background fetch of the active-goals count per poller.
//! Consecutive failures stretch the delay exponentially up to a cap; `retry`
//! replaces the running loop instead of adding a second one.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::api::{ApiClient, ApiResult};
use crate::tasks::TaskHandle;

pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_MAX_BACKOFF_SECS: u64 = 600;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PollingConfig {
    pub interval_secs: u64,
    pub max_backoff_secs: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            max_backoff_secs: DEFAULT_MAX_BACKOFF_SECS,
        }
    }
}

impl PollingConfig {
    pub fn new(interval_secs: u64, max_backoff_secs: u64) -> Self {
        Self {
            interval_secs,
            max_backoff_secs,
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// `interval * 2^failures`, never above the backoff cap (or the interval
    /// itself when the cap is smaller).
    pub fn delay_after(&self, failures: u32) -> Duration {
        let factor = 1u64.checked_shl(failures.min(32)).unwrap_or(u64::MAX);
        let secs = self
            .interval_secs
            .saturating_mul(factor)
            .min(self.max_backoff_secs.max(self.interval_secs));
        Duration::from_secs(secs)
    }
}

#[async_trait]
pub trait CountSource: Send + Sync {
    async fn fetch_count(&self) -> ApiResult<u64>;
}

#[async_trait]
impl CountSource for ApiClient {
    async fn fetch_count(&self) -> ApiResult<u64> {
        self.active_goals_count().await
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollState {
    pub count: Option<u64>,
    pub loading: bool,
    pub error: Option<String>,
    pub consecutive_failures: u32,
    pub last_updated: Option<DateTime<Utc>>,
}

struct PollerInner {
    source: Arc<dyn CountSource>,
    config: PollingConfig,
    state: watch::Sender<PollState>,
}

impl PollerInner {
    fn next_delay(&self) -> Duration {
        self.config.delay_after(self.state.borrow().consecutive_failures)
    }
}

async fn poll_loop(weak: Weak<PollerInner>) {
    loop {
        let source = {
            let Some(inner) = weak.upgrade() else { return };
            inner.state.send_modify(|state| state.loading = true);
            inner.source.clone()
        };

        let result = source.fetch_count().await;

        let delay = {
            let Some(inner) = weak.upgrade() else { return };
            inner.state.send_modify(|state| {
                state.loading = false;
                match result {
                    Ok(count) => {
                        state.count = Some(count);
                        state.error = None;
                        state.consecutive_failures = 0;
                        state.last_updated = Some(Utc::now());
                    }
                    Err(err) => {
                        state.consecutive_failures = state.consecutive_failures.saturating_add(1);
                        warn!(failures = state.consecutive_failures, "active goals poll failed: {err}");
                        state.error = Some(err.user_message());
                    }
                }
            });
            inner.next_delay()
        };
        debug!(?delay, "next active goals poll scheduled");
        tokio::time::sleep(delay).await;
    }
}

pub struct ActiveGoalsPoller {
    inner: Arc<PollerInner>,
    task: Mutex<Option<TaskHandle>>,
}

impl ActiveGoalsPoller {
    pub fn new(source: Arc<dyn CountSource>, config: PollingConfig) -> Self {
        let (state, _) = watch::channel(PollState::default());
        Self {
            inner: Arc::new(PollerInner {
                source,
                config,
                state,
            }),
            task: Mutex::new(None),
        }
    }

    pub fn for_client(client: ApiClient, config: PollingConfig) -> Self {
        Self::new(Arc::new(client), config)
    }

    fn task(&self) -> MutexGuard<'_, Option<TaskHandle>> {
        self.task.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Begin polling with an immediate fetch. No-op while already running.
    pub fn start(&self) {
        let mut task = self.task();
        if task.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return;
        }
        *task = Some(TaskHandle::spawn(poll_loop(Arc::downgrade(&self.inner))));
    }

    /// Replace the running loop with a fresh one and clear error and backoff.
    pub fn retry(&self) {
        let mut task = self.task();
        task.take();
        self.inner.state.send_modify(|state| {
            state.error = None;
            state.consecutive_failures = 0;
            state.loading = false;
        });
        *task = Some(TaskHandle::spawn(poll_loop(Arc::downgrade(&self.inner))));
    }

    pub fn stop(&self) {
        self.task().take();
        self.inner.state.send_modify(|state| state.loading = false);
    }

    pub fn is_running(&self) -> bool {
        self.task().as_ref().is_some_and(|handle| !handle.is_finished())
    }

    pub fn state(&self) -> PollState {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PollState> {
        self.inner.state.subscribe()
    }
}
