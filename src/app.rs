//! Application State
//!
//! Wires the configured client, the local store and one optimistic
//! collection per cached entity type. A UI shell holds one `AppState` and
//! builds validators and pollers from it per screen.

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::api::{ApiClient, ApiResult};
use crate::cache::{keys, QueryCache};
use crate::config::ClientConfig;
use crate::models::{
    AuthTokens, CreateGoalInput, CreateQuestInput, CreateTemplateInput, Goal, GoalUpdate,
    LoginInput, Quest, QuestTemplate, QuestUpdate, TemplateUpdate,
};
use crate::mutation::OptimisticCollection;
use crate::polling::ActiveGoalsPoller;
use crate::storage::{LocalStore, StorageError};
use crate::validation::{
    AvailabilityCheck, FieldSchema, FieldValidator, SchemaRegistry, ValidationMessages,
};

pub const STORE_FILE_NAME: &str = "questline.json";

pub struct AppState {
    pub config: ClientConfig,
    pub client: ApiClient,
    pub templates: OptimisticCollection<QuestTemplate>,
    pub quests: OptimisticCollection<Quest>,
    pub goals: OptimisticCollection<Goal>,
}

impl AppState {
    pub fn new(config: ClientConfig, store: Arc<LocalStore>) -> Self {
        let client = ApiClient::new(config.api.clone(), store);
        Self::with_client(config, client)
    }

    /// Open (or create) the local store under `data_dir`
    pub fn open(config: ClientConfig, data_dir: &Path) -> Result<Self, StorageError> {
        let store = LocalStore::open(data_dir.join(STORE_FILE_NAME))?;
        info!(base_url = %config.api.base_url, "client state ready");
        Ok(Self::new(config, Arc::new(store)))
    }

    pub fn with_client(config: ClientConfig, client: ApiClient) -> Self {
        let templates = OptimisticCollection::new(
            Arc::new(QueryCache::new()),
            keys::quest_templates(),
            keys::quest_template,
        );
        let quests = OptimisticCollection::new(Arc::new(QueryCache::new()), keys::quests(), keys::quest)
            .invalidate_on_success(keys::active_quests());
        let goals = OptimisticCollection::new(Arc::new(QueryCache::new()), keys::goals(), keys::goal);

        Self {
            config,
            client,
            templates,
            quests,
            goals,
        }
    }

    pub fn store(&self) -> &Arc<LocalStore> {
        self.client.store()
    }

    /// Validation text in the persisted language
    pub fn messages(&self) -> &'static ValidationMessages {
        ValidationMessages::for_language(self.store().language())
    }

    // ========================
    // Forms
    // ========================

    pub fn signup_validator(&self) -> FieldValidator {
        let messages = self.messages();
        let schemas = SchemaRegistry::new()
            .with_field(
                "email",
                FieldSchema::email(messages)
                    .with_availability(AvailabilityCheck::email(self.client.clone(), messages)),
            )
            .with_field(
                "nickname",
                FieldSchema::nickname(messages)
                    .with_availability(AvailabilityCheck::nickname(self.client.clone(), messages)),
            )
            .with_field("password", FieldSchema::password(messages));
        FieldValidator::new(schemas, self.config.validator.clone())
    }

    pub fn login_validator(&self) -> FieldValidator {
        let messages = self.messages();
        let schemas = SchemaRegistry::new()
            .with_field("email", FieldSchema::email(messages))
            .with_field("password", FieldSchema::new().required(messages.required));
        FieldValidator::new(schemas, self.config.validator.clone())
    }

    pub fn active_goals_poller(&self) -> ActiveGoalsPoller {
        ActiveGoalsPoller::for_client(self.client.clone(), self.config.polling.clone())
    }

    // ========================
    // Session
    // ========================

    pub async fn login(&self, input: &LoginInput) -> ApiResult<AuthTokens> {
        self.client.login(input).await
    }

    /// Clear the token and every cached collection. Local state is wiped
    /// even when the server call fails.
    pub async fn logout(&self) -> ApiResult<()> {
        let remote = self.client.logout().await;
        self.templates.cache().clear();
        self.quests.cache().clear();
        self.goals.cache().clear();
        remote
    }

    // ========================
    // Quest Templates
    // ========================

    pub async fn load_templates(&self) -> ApiResult<Vec<QuestTemplate>> {
        self.templates
            .cache()
            .fetch_list(keys::quest_templates(), || self.client.list_templates())
            .await
    }

    pub async fn create_template(&self, input: &CreateTemplateInput) -> ApiResult<QuestTemplate> {
        self.templates
            .create(QuestTemplate::draft(input), self.client.create_template(input))
            .await
    }

    pub async fn update_template(&self, id: &str, patch: TemplateUpdate) -> ApiResult<QuestTemplate> {
        let call = self.client.update_template(id, &patch);
        self.templates.update(id, patch.clone(), call).await
    }

    pub async fn delete_template(&self, id: &str) -> ApiResult<()> {
        self.templates
            .delete(id, self.client.delete_template(id))
            .await
    }

    // ========================
    // Quests
    // ========================

    pub async fn load_quests(&self) -> ApiResult<Vec<Quest>> {
        self.quests
            .cache()
            .fetch_list(keys::quests(), || self.client.list_quests())
            .await
    }

    pub async fn load_active_quests(&self) -> ApiResult<Vec<Quest>> {
        self.quests
            .cache()
            .fetch_list(keys::active_quests(), || self.client.list_active_quests())
            .await
    }

    /// Rejects invalid input before anything is cached.
    pub async fn create_quest(&self, input: &CreateQuestInput) -> ApiResult<Quest> {
        input.validate()?;
        self.quests
            .create(Quest::draft(input), self.client.create_quest(input))
            .await
    }

    pub async fn update_quest(&self, id: &str, patch: QuestUpdate) -> ApiResult<Quest> {
        let call = self.client.update_quest(id, &patch);
        self.quests.update(id, patch.clone(), call).await
    }

    pub async fn delete_quest(&self, id: &str) -> ApiResult<()> {
        self.quests.delete(id, self.client.delete_quest(id)).await
    }

    // ========================
    // Goals
    // ========================

    pub async fn load_goals(&self) -> ApiResult<Vec<Goal>> {
        self.goals
            .cache()
            .fetch_list(keys::goals(), || self.client.list_goals())
            .await
    }

    pub async fn create_goal(&self, input: &CreateGoalInput) -> ApiResult<Goal> {
        self.goals
            .create(Goal::draft(input), self.client.create_goal(input))
            .await
    }

    pub async fn update_goal(&self, id: &str, patch: GoalUpdate) -> ApiResult<Goal> {
        let call = self.client.update_goal(id, &patch);
        self.goals.update(id, patch.clone(), call).await
    }

    pub async fn delete_goal(&self, id: &str) -> ApiResult<()> {
        self.goals.delete(id, self.client.delete_goal(id)).await
    }
}
