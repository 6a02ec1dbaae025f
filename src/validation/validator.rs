//! Debounced Field Validator
//!
//! Every `validate_field` call bumps the field's generation and restarts its
//! timer. Only the run whose generation is still current may write state, so
//! superseded timers and late remote responses are dropped.
//!
//! Must be driven from inside a tokio runtime.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, warn};

use super::availability::{Availability, AvailabilityCheck};
use super::schema::SchemaRegistry;
use crate::tasks::{KeyedTasks, TaskHandle};

pub const DEFAULT_DEBOUNCE_MS: u64 = 500;

const UNREGISTERED_MESSAGE: &str = "No validation rule is registered for this field";

/// What to do when a field without a schema is validated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UnregisteredPolicy {
    /// Treat the value as valid and log a warning
    #[default]
    AlwaysValid,
    /// Mark the field invalid
    Reject,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ValidatorConfig {
    pub debounce_ms: u64,
    pub unregistered: UnregisteredPolicy,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            unregistered: UnregisteredPolicy::default(),
        }
    }
}

impl ValidatorConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn with_debounce_ms(mut self, debounce_ms: u64) -> Self {
        self.debounce_ms = debounce_ms;
        self
    }

    pub fn with_unregistered(mut self, policy: UnregisteredPolicy) -> Self {
        self.unregistered = policy;
        self
    }
}

/// Per-field status read by form consumers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldValidationState {
    pub error: Option<String>,
    /// Timer running or remote check in flight
    pub pending: bool,
    /// `None` until the first run settles
    pub valid: Option<bool>,
    pub last_validated_value: Option<String>,
    pub availability: Availability,
}

#[derive(Debug, Default)]
struct FieldSlot {
    generation: u64,
    state: FieldValidationState,
}

struct Outcome {
    valid: bool,
    error: Option<String>,
    availability: Availability,
}

impl Outcome {
    fn valid(availability: Availability) -> Self {
        Self {
            valid: true,
            error: None,
            availability,
        }
    }

    fn invalid(message: String, availability: Availability) -> Self {
        Self {
            valid: false,
            error: Some(message),
            availability,
        }
    }
}

enum LocalResult {
    Settled(Outcome),
    NeedsRemote(AvailabilityCheck),
}

struct ValidatorInner {
    schemas: SchemaRegistry,
    config: ValidatorConfig,
    fields: Mutex<HashMap<String, FieldSlot>>,
    tasks: KeyedTasks<String>,
    revision: watch::Sender<u64>,
}

impl ValidatorInner {
    fn lock(&self) -> MutexGuard<'_, HashMap<String, FieldSlot>> {
        self.fields.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self) {
        self.revision.send_modify(|rev| *rev = rev.wrapping_add(1));
    }

    fn is_current(&self, field: &str, generation: u64) -> bool {
        self.lock()
            .get(field)
            .is_some_and(|slot| slot.generation == generation)
    }

    fn local_result(&self, field: &str, value: &str) -> LocalResult {
        let Some(schema) = self.schemas.get(field) else {
            return LocalResult::Settled(match self.config.unregistered {
                UnregisteredPolicy::AlwaysValid => {
                    warn!(field, "validated a field with no registered schema");
                    Outcome::valid(Availability::NotChecked)
                }
                UnregisteredPolicy::Reject => {
                    Outcome::invalid(UNREGISTERED_MESSAGE.to_string(), Availability::NotChecked)
                }
            });
        };
        if let Err(message) = schema.check(value) {
            return LocalResult::Settled(Outcome::invalid(message, Availability::NotChecked));
        }
        match schema.availability() {
            Some(check) if !value.trim().is_empty() => LocalResult::NeedsRemote(check.clone()),
            _ => LocalResult::Settled(Outcome::valid(Availability::NotChecked)),
        }
    }

    fn mark_checking(&self, field: &str, generation: u64) {
        let changed = match self.lock().get_mut(field) {
            Some(slot) if slot.generation == generation => {
                slot.state.availability = Availability::Checking;
                true
            }
            _ => false,
        };
        if changed {
            self.notify();
        }
    }

    /// Write the outcome if `generation` is still the field's latest.
    fn settle(&self, field: &str, generation: u64, value: String, outcome: Outcome) -> bool {
        let applied = match self.lock().get_mut(field) {
            Some(slot) if slot.generation == generation => {
                slot.state = FieldValidationState {
                    error: outcome.error,
                    pending: false,
                    valid: Some(outcome.valid),
                    last_validated_value: Some(value),
                    availability: outcome.availability,
                };
                true
            }
            _ => false,
        };
        if applied {
            self.notify();
        } else {
            debug!(field, generation, "discarding superseded validation result");
        }
        applied
    }
}

async fn run_validation(weak: Weak<ValidatorInner>, field: String, value: String, generation: u64) {
    let check = {
        let Some(inner) = weak.upgrade() else { return };
        if !inner.is_current(&field, generation) {
            return;
        }
        match inner.local_result(&field, &value) {
            LocalResult::Settled(outcome) => {
                inner.settle(&field, generation, value, outcome);
                return;
            }
            LocalResult::NeedsRemote(check) => {
                inner.mark_checking(&field, generation);
                check
            }
        }
    };

    // No strong reference is held while the probe is in flight.
    let result = check.probe().is_available(&value).await;

    let Some(inner) = weak.upgrade() else { return };
    let outcome = match result {
        Ok(true) => Outcome::valid(Availability::Available),
        Ok(false) => Outcome::invalid(check.taken_message().to_string(), Availability::Taken),
        Err(err) => {
            warn!(field = %field, "availability check failed, treating as unknown: {err}");
            Outcome::valid(Availability::Unknown)
        }
    };
    inner.settle(&field, generation, value, outcome);
}

/// Debounced validator for one form instance
#[derive(Clone)]
pub struct FieldValidator {
    inner: Arc<ValidatorInner>,
}

impl FieldValidator {
    pub fn new(schemas: SchemaRegistry, config: ValidatorConfig) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            inner: Arc::new(ValidatorInner {
                schemas,
                config,
                fields: Mutex::new(HashMap::new()),
                tasks: KeyedTasks::new(),
                revision,
            }),
        }
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.inner.config
    }

    pub fn schemas(&self) -> &SchemaRegistry {
        &self.inner.schemas
    }

    fn begin(&self, name: &str) -> u64 {
        let generation = {
            let mut fields = self.inner.lock();
            let slot = fields.entry(name.to_string()).or_default();
            slot.generation += 1;
            slot.state.pending = true;
            slot.generation
        };
        self.inner.notify();
        generation
    }

    /// Schedule validation of `value` after the debounce window, superseding
    /// any earlier call for the same field.
    pub fn validate_field(&self, name: &str, value: impl Into<String>) {
        let value = value.into();
        let generation = self.begin(name);
        let weak = Arc::downgrade(&self.inner);
        let field = name.to_string();
        let delay = self.inner.config.debounce();

        let handle = TaskHandle::spawn(async move {
            tokio::time::sleep(delay).await;
            run_validation(weak, field, value, generation).await;
        });
        self.inner.tasks.replace(name.to_string(), handle);
    }

    /// Validate immediately (e.g. on submit), cancelling any pending timer.
    pub async fn validate_field_now(&self, name: &str, value: impl Into<String>) -> FieldValidationState {
        let generation = self.begin(name);
        self.inner.tasks.cancel(&name.to_string());
        run_validation(
            Arc::downgrade(&self.inner),
            name.to_string(),
            value.into(),
            generation,
        )
        .await;
        self.field_state(name).unwrap_or_default()
    }

    /// Cancel the field's timer and forget its state.
    pub fn clear_field_validation(&self, name: &str) {
        self.inner.tasks.cancel(&name.to_string());
        let removed = self.inner.lock().remove(name).is_some();
        if removed {
            self.inner.notify();
        }
    }

    /// Cancel every timer and forget all state.
    pub fn reset(&self) {
        self.inner.tasks.cancel_all();
        self.inner.lock().clear();
        self.inner.notify();
    }

    pub fn is_field_validating(&self, name: &str) -> bool {
        self.inner
            .lock()
            .get(name)
            .is_some_and(|slot| slot.state.pending)
    }

    pub fn get_field_error(&self, name: &str) -> Option<String> {
        self.inner
            .lock()
            .get(name)
            .and_then(|slot| slot.state.error.clone())
    }

    pub fn is_field_valid(&self, name: &str) -> Option<bool> {
        self.inner.lock().get(name).and_then(|slot| slot.state.valid)
    }

    pub fn availability(&self, name: &str) -> Availability {
        self.inner
            .lock()
            .get(name)
            .map(|slot| slot.state.availability)
            .unwrap_or_default()
    }

    pub fn field_state(&self, name: &str) -> Option<FieldValidationState> {
        self.inner.lock().get(name).map(|slot| slot.state.clone())
    }

    /// True when nothing is pending, no field is invalid, and every required
    /// registered field has settled as valid. Untouched optional fields pass.
    pub fn is_form_valid(&self) -> bool {
        let fields = self.inner.lock();
        let settled = fields
            .values()
            .all(|slot| !slot.state.pending && slot.state.valid != Some(false));
        settled
            && self.inner.schemas.field_names().all(|name| match fields.get(name) {
                Some(slot) => slot.state.valid == Some(true),
                None => self
                    .inner
                    .schemas
                    .get(name)
                    .is_some_and(|schema| !schema.is_required()),
            })
    }

    /// Revision counter bumped on every state change
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.revision.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::{FieldSchema, ValidationMessages};

    fn validator(config: ValidatorConfig) -> FieldValidator {
        let messages = ValidationMessages::default();
        let schemas = SchemaRegistry::new()
            .with_field("email", FieldSchema::email(&messages))
            .with_field("nickname", FieldSchema::nickname(&messages))
            .with_field("bio", FieldSchema::new().max_len(10, "{max} max"));
        FieldValidator::new(schemas, config)
    }

    async fn advance(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_value_sets_error_after_window() {
        let v = validator(ValidatorConfig::default());
        v.validate_field("email", "not-an-email");

        assert!(v.is_field_validating("email"));
        assert_eq!(v.is_field_valid("email"), None);

        advance(499).await;
        assert!(v.is_field_validating("email"));

        advance(2).await;
        assert!(!v.is_field_validating("email"));
        assert_eq!(v.is_field_valid("email"), Some(false));
        assert_eq!(
            v.get_field_error("email").as_deref(),
            Some(ValidationMessages::default().invalid_email)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_valid_value_clears_error() {
        let v = validator(ValidatorConfig::default());
        v.validate_field("email", "hero@quest.io");
        advance(600).await;

        assert_eq!(v.is_field_valid("email"), Some(true));
        assert_eq!(v.get_field_error("email"), None);
        assert_eq!(
            v.field_state("email").unwrap().last_validated_value.as_deref(),
            Some("hero@quest.io")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_calls_within_window_coalesce_to_last() {
        let v = validator(ValidatorConfig::default());
        let revisions = v.subscribe();

        v.validate_field("email", "bad");
        advance(300).await;
        v.validate_field("email", "good@quest.io");

        // The first timer would have fired here had it not been superseded.
        advance(300).await;
        assert!(v.is_field_validating("email"));
        assert_eq!(v.is_field_valid("email"), None);

        advance(300).await;
        assert_eq!(v.is_field_valid("email"), Some(true));
        assert_eq!(
            v.field_state("email").unwrap().last_validated_value.as_deref(),
            Some("good@quest.io")
        );
        assert!(revisions.has_changed().unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fields_do_not_interfere() {
        let v = validator(ValidatorConfig::default());
        v.validate_field("email", "bad");
        advance(400).await;
        v.validate_field("nickname", "ok_name");

        advance(150).await;
        assert_eq!(v.is_field_valid("email"), Some(false));
        assert!(v.is_field_validating("nickname"));

        advance(400).await;
        assert_eq!(v.is_field_valid("nickname"), Some(true));
        assert_eq!(v.is_field_valid("email"), Some(false));
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_cancels_pending_timer() {
        let v = validator(ValidatorConfig::default());
        v.validate_field("email", "bad");
        v.clear_field_validation("email");

        assert!(!v.is_field_validating("email"));
        advance(1000).await;
        assert_eq!(v.field_state("email"), None);
        assert_eq!(v.get_field_error("email"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_configurable_window() {
        let v = validator(ValidatorConfig::default().with_debounce_ms(50));
        v.validate_field("bio", "far too long for this");
        advance(60).await;
        assert_eq!(v.get_field_error("bio").as_deref(), Some("10 max"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unregistered_policy() {
        let lenient = validator(ValidatorConfig::default());
        lenient.validate_field("mystery", "anything");
        advance(600).await;
        assert_eq!(lenient.is_field_valid("mystery"), Some(true));

        let strict = validator(ValidatorConfig::default().with_unregistered(UnregisteredPolicy::Reject));
        strict.validate_field("mystery", "anything");
        advance(600).await;
        assert_eq!(strict.is_field_valid("mystery"), Some(false));
        assert_eq!(strict.get_field_error("mystery").as_deref(), Some(UNREGISTERED_MESSAGE));
    }

    #[tokio::test(start_paused = true)]
    async fn test_form_validity() {
        let v = validator(ValidatorConfig::default());
        assert!(!v.is_form_valid());

        v.validate_field("email", "hero@quest.io");
        v.validate_field("nickname", "hero");
        assert!(!v.is_form_valid());

        advance(600).await;
        // `bio` is optional and untouched
        assert!(v.is_form_valid());

        v.validate_field("bio", "this is way past ten");
        advance(600).await;
        assert!(!v.is_form_valid());
    }

    #[tokio::test(start_paused = true)]
    async fn test_validate_now_skips_the_window() {
        let v = validator(ValidatorConfig::default());
        v.validate_field("nickname", "x");
        let state = v.validate_field_now("nickname", "valid_name").await;

        assert_eq!(state.valid, Some(true));
        assert!(!state.pending);
        advance(1000).await;
        assert_eq!(
            v.field_state("nickname").unwrap().last_validated_value.as_deref(),
            Some("valid_name")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_validator_cancels_timers() {
        let v = validator(ValidatorConfig::default());
        let revisions = v.subscribe();
        v.validate_field("email", "bad");
        drop(v);
        advance(1000).await;
        assert!(revisions.has_changed().is_err());
    }

    mod remote {
        use super::*;
        use std::sync::atomic::{AtomicUsize, Ordering};

        use async_trait::async_trait;

        use crate::api::{ApiError, ApiResult};
        use crate::validation::{AvailabilityCheck, AvailabilityProbe};

        /// Values starting with `slow` answer after 1s, others after 50ms.
        #[derive(Default)]
        struct ScriptedProbe {
            calls: AtomicUsize,
            fail: bool,
        }

        #[async_trait]
        impl AvailabilityProbe for ScriptedProbe {
            async fn is_available(&self, value: &str) -> ApiResult<bool> {
                self.calls.fetch_add(1, Ordering::SeqCst);
                let delay = if value.starts_with("slow") { 1000 } else { 50 };
                tokio::time::sleep(Duration::from_millis(delay)).await;
                if self.fail {
                    return Err(ApiError::EmptyResponse);
                }
                Ok(!value.contains("taken"))
            }
        }

        fn with_probe(probe: Arc<ScriptedProbe>) -> FieldValidator {
            let schema = FieldSchema::nickname(&ValidationMessages::default())
                .with_availability(AvailabilityCheck::new(probe, "Nickname is taken"));
            FieldValidator::new(
                SchemaRegistry::new().with_field("nickname", schema),
                ValidatorConfig::default(),
            )
        }

        #[tokio::test(start_paused = true)]
        async fn test_taken_value_is_invalid() {
            let probe = Arc::new(ScriptedProbe::default());
            let v = with_probe(probe.clone());
            v.validate_field("nickname", "taken_name");

            advance(520).await;
            assert!(v.is_field_validating("nickname"));
            assert_eq!(v.availability("nickname"), Availability::Checking);

            advance(100).await;
            assert_eq!(v.is_field_valid("nickname"), Some(false));
            assert_eq!(v.availability("nickname"), Availability::Taken);
            assert_eq!(v.get_field_error("nickname").as_deref(), Some("Nickname is taken"));
        }

        #[tokio::test(start_paused = true)]
        async fn test_late_response_for_old_value_is_ignored() {
            let probe = Arc::new(ScriptedProbe::default());
            let v = with_probe(probe.clone());

            v.validate_field("nickname", "slow_taken");
            advance(600).await;
            v.validate_field("nickname", "fast_name");

            advance(600).await;
            assert_eq!(v.is_field_valid("nickname"), Some(true));

            advance(1000).await;
            let state = v.field_state("nickname").unwrap();
            assert_eq!(state.valid, Some(true));
            assert_eq!(state.availability, Availability::Available);
            assert_eq!(state.last_validated_value.as_deref(), Some("fast_name"));
            assert_eq!(probe.calls.load(Ordering::SeqCst), 2);
        }

        #[tokio::test(start_paused = true)]
        async fn test_format_failure_skips_probe() {
            let probe = Arc::new(ScriptedProbe::default());
            let v = with_probe(probe.clone());
            v.validate_field("nickname", "no spaces allowed");
            advance(600).await;

            assert_eq!(v.is_field_valid("nickname"), Some(false));
            assert_eq!(v.availability("nickname"), Availability::NotChecked);
            assert_eq!(probe.calls.load(Ordering::SeqCst), 0);
        }

        #[tokio::test(start_paused = true)]
        async fn test_probe_failure_does_not_block() {
            let probe = Arc::new(ScriptedProbe {
                fail: true,
                ..Default::default()
            });
            let v = with_probe(probe);
            v.validate_field("nickname", "some_name");
            advance(600).await;

            assert_eq!(v.is_field_valid("nickname"), Some(true));
            assert_eq!(v.availability("nickname"), Availability::Unknown);
            assert!(v.is_form_valid());
        }
    }
}
