//! Wire Models
//!
//! Data structures matching backend payloads. Fields are camelCase on the
//! wire; snake_case spellings are accepted on input so the rest of the crate
//! only ever sees one representation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{DomainError, DomainResult, Entity, Patchable};

macro_rules! impl_entity {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl Entity for $ty {
                fn id(&self) -> &str {
                    &self.id
                }

                fn set_id(&mut self, id: String) {
                    self.id = id;
                }
            }
        )+
    };
}

// ========================
// Quests
// ========================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum QuestKind {
    /// Completed by finishing linked goals and tasks
    #[default]
    Linked,
    /// Completed by reaching a count within a rolling period
    Quantitative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestPeriod {
    Daily,
    Weekly,
    Monthly,
}

impl QuestPeriod {
    pub fn days(&self) -> i64 {
        match self {
            QuestPeriod::Daily => 1,
            QuestPeriod::Weekly => 7,
            QuestPeriod::Monthly => 30,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum QuestStatus {
    #[default]
    Draft,
    Active,
    Completed,
    Cancelled,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quest {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub kind: QuestKind,
    #[serde(default)]
    pub status: QuestStatus,
    #[serde(default, alias = "target_count")]
    pub target_count: Option<u32>,
    #[serde(default)]
    pub period: Option<QuestPeriod>,
    #[serde(default, alias = "linked_goal_ids")]
    pub linked_goal_ids: Vec<String>,
    #[serde(default, alias = "linked_task_ids")]
    pub linked_task_ids: Vec<String>,
    #[serde(default, alias = "user_id")]
    pub user_id: Option<String>,
    #[serde(default, alias = "reward_xp")]
    pub reward_xp: u32,
    #[serde(default, alias = "created_at")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, alias = "updated_at")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Quest {
    /// A local draft used as an optimistic placeholder before creation.
    pub fn draft(input: &CreateQuestInput) -> Self {
        Self {
            id: String::new(),
            title: input.title.clone(),
            description: input.description.clone(),
            kind: input.kind,
            status: QuestStatus::Draft,
            target_count: input.target_count,
            period: input.period,
            linked_goal_ids: input.linked_goal_ids.clone(),
            linked_task_ids: input.linked_task_ids.clone(),
            user_id: None,
            reward_xp: input.reward_xp,
            created_at: None,
            updated_at: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuestInput {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub kind: QuestKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<QuestPeriod>,
    pub linked_goal_ids: Vec<String>,
    pub linked_task_ids: Vec<String>,
    pub reward_xp: u32,
}

impl CreateQuestInput {
    /// Reject shapes the server would refuse before any request is made.
    pub fn validate(&self) -> DomainResult<()> {
        if self.title.trim().is_empty() {
            return Err(DomainError::InvalidInput("quest title is required".into()));
        }
        match self.kind {
            QuestKind::Quantitative => {
                if self.target_count.unwrap_or(0) == 0 {
                    return Err(DomainError::InvalidInput(
                        "quantitative quests need a target count above zero".into(),
                    ));
                }
                if self.period.is_none() {
                    return Err(DomainError::InvalidInput(
                        "quantitative quests need a period".into(),
                    ));
                }
            }
            QuestKind::Linked => {
                if self.linked_goal_ids.is_empty() && self.linked_task_ids.is_empty() {
                    return Err(DomainError::InvalidInput(
                        "linked quests need at least one goal or task".into(),
                    ));
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<QuestStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<QuestPeriod>,
}

impl Patchable for Quest {
    type Patch = QuestUpdate;

    fn apply_patch(&mut self, patch: &QuestUpdate) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(description) = &patch.description {
            self.description = Some(description.clone());
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(target) = patch.target_count {
            self.target_count = Some(target);
        }
        if let Some(period) = patch.period {
            self.period = Some(period);
        }
    }
}

/// One recorded unit of progress on a quantitative quest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestContribution {
    pub id: String,
    #[serde(alias = "quest_id")]
    pub quest_id: String,
    #[serde(default, alias = "user_id")]
    pub user_id: Option<String>,
    #[serde(alias = "created_at")]
    pub created_at: DateTime<Utc>,
}

// ========================
// Quest Templates
// ========================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Privacy {
    #[default]
    Private,
    Followers,
    Public,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestTemplate {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub kind: QuestKind,
    #[serde(default, alias = "target_count")]
    pub target_count: Option<u32>,
    #[serde(default)]
    pub period: Option<QuestPeriod>,
    #[serde(default)]
    pub privacy: Privacy,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, alias = "reward_xp")]
    pub reward_xp: u32,
    #[serde(default, alias = "user_id")]
    pub user_id: Option<String>,
}

impl QuestTemplate {
    pub fn draft(input: &CreateTemplateInput) -> Self {
        Self {
            id: String::new(),
            title: input.title.clone(),
            description: input.description.clone(),
            category: input.category.clone(),
            kind: input.kind,
            target_count: input.target_count,
            period: input.period,
            privacy: input.privacy,
            tags: input.tags.clone(),
            reward_xp: input.reward_xp,
            user_id: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTemplateInput {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub kind: QuestKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<QuestPeriod>,
    pub privacy: Privacy,
    pub tags: Vec<String>,
    pub reward_xp: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub privacy: Option<Privacy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl Patchable for QuestTemplate {
    type Patch = TemplateUpdate;

    fn apply_patch(&mut self, patch: &TemplateUpdate) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(description) = &patch.description {
            self.description = Some(description.clone());
        }
        if let Some(category) = &patch.category {
            self.category = Some(category.clone());
        }
        if let Some(privacy) = patch.privacy {
            self.privacy = privacy;
        }
        if let Some(tags) = &patch.tags {
            self.tags = tags.clone();
        }
    }
}

// ========================
// Goals & Tasks
// ========================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GoalStatus {
    #[default]
    Active,
    Paused,
    Completed,
    Archived,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: GoalStatus,
    #[serde(default)]
    pub deadline: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, alias = "user_id")]
    pub user_id: Option<String>,
}

impl Goal {
    pub fn draft(input: &CreateGoalInput) -> Self {
        Self {
            id: String::new(),
            title: input.title.clone(),
            description: input.description.clone(),
            status: GoalStatus::Active,
            deadline: input.deadline.clone(),
            tags: input.tags.clone(),
            user_id: None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == GoalStatus::Completed
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGoalInput {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<String>,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<GoalStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<String>,
}

impl Patchable for Goal {
    type Patch = GoalUpdate;

    fn apply_patch(&mut self, patch: &GoalUpdate) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(description) = &patch.description {
            self.description = Some(description.clone());
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(deadline) = &patch.deadline {
            self.deadline = Some(deadline.clone());
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Active,
    Completed,
    Archived,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalTask {
    pub id: String,
    #[serde(alias = "goal_id")]
    pub goal_id: String,
    pub title: String,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default, alias = "due_at")]
    pub due_at: Option<String>,
}

impl GoalTask {
    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskInput {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_at: Option<String>,
}

// ========================
// Guilds
// ========================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GuildType {
    #[default]
    Public,
    Private,
    Approval,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Guild {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, alias = "guild_type")]
    pub guild_type: GuildType,
    #[serde(default, alias = "member_count")]
    pub member_count: u32,
    #[serde(default, alias = "owner_id")]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGuildInput {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub guild_type: GuildType,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GuildUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guild_type: Option<GuildType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GuildRole {
    Owner,
    Moderator,
    #[default]
    Member,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuildMember {
    #[serde(alias = "user_id")]
    pub user_id: String,
    pub username: String,
    #[serde(default)]
    pub role: GuildRole,
    #[serde(default, alias = "joined_at")]
    pub joined_at: Option<DateTime<Utc>>,
}

// ========================
// Collaboration
// ========================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Goal,
    Quest,
    Task,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Goal => "goal",
            ResourceType::Quest => "quest",
            ResourceType::Task => "task",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum InviteStatus {
    #[default]
    Pending,
    Accepted,
    Declined,
    Expired,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invite {
    pub id: String,
    #[serde(alias = "resource_type")]
    pub resource_type: ResourceType,
    #[serde(alias = "resource_id")]
    pub resource_id: String,
    #[serde(alias = "inviter_id")]
    pub inviter_id: String,
    #[serde(alias = "invitee_id")]
    pub invitee_id: String,
    #[serde(default)]
    pub status: InviteStatus,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInviteInput {
    pub resource_type: ResourceType,
    pub resource_id: String,
    pub invitee_identifier: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collaborator {
    #[serde(alias = "user_id")]
    pub user_id: String,
    pub username: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default, alias = "avatar_url")]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    #[serde(alias = "resource_type")]
    pub resource_type: ResourceType,
    #[serde(alias = "resource_id")]
    pub resource_id: String,
    #[serde(alias = "user_id")]
    pub user_id: String,
    #[serde(default)]
    pub username: Option<String>,
    pub text: String,
    #[serde(default, alias = "parent_id")]
    pub parent_id: Option<String>,
    #[serde(default, alias = "created_at")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentInput {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

// ========================
// Subscriptions
// ========================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanTier {
    Free,
    Initiate,
    Journeyman,
    Sage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub id: String,
    pub tier: PlanTier,
    pub name: String,
    #[serde(alias = "price_cents")]
    pub price_cents: u32,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub interval: Option<String>,
}

fn default_currency() -> String {
    "usd".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Trialing,
    PastDue,
    Canceled,
    Incomplete,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: String,
    #[serde(alias = "plan_tier")]
    pub plan_tier: PlanTier,
    pub status: SubscriptionStatus,
    #[serde(default, alias = "current_period_end")]
    pub current_period_end: Option<DateTime<Utc>>,
    #[serde(default, alias = "cancel_at_period_end")]
    pub cancel_at_period_end: bool,
}

/// Redirect target returned by checkout and billing-portal endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedirectSession {
    pub url: String,
}

// ========================
// Auth
// ========================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthTokens {
    #[serde(alias = "access_token")]
    pub access_token: String,
    #[serde(default, alias = "id_token")]
    pub id_token: Option<String>,
    #[serde(default, alias = "refresh_token")]
    pub refresh_token: Option<String>,
    #[serde(default = "default_token_type", alias = "token_type")]
    pub token_type: String,
    #[serde(default, alias = "expires_in")]
    pub expires_in: Option<u64>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default, alias = "full_name")]
    pub full_name: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupInput {
    pub email: String,
    pub password: String,
    pub nickname: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

impl_entity!(Quest, QuestTemplate, Goal, GoalTask, Guild, Invite, Comment);
