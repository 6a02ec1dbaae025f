//! Quest Endpoints

use reqwest::Method;
use serde::Deserialize;

use super::client::{segment, ApiClient};
use super::error::ApiResult;
use crate::models::{CreateQuestInput, Quest, QuestContribution, QuestUpdate};

#[derive(Deserialize)]
struct CountResponse {
    count: u64,
}

impl ApiClient {
    pub async fn list_quests(&self) -> ApiResult<Vec<Quest>> {
        self.get_json("/quests").await
    }

    /// Quests the current user has started and not yet finished
    pub async fn list_active_quests(&self) -> ApiResult<Vec<Quest>> {
        self.get_json("/quests/active").await
    }

    pub async fn get_quest(&self, id: &str) -> ApiResult<Quest> {
        self.get_json(&format!("/quests/{}", segment(id))).await
    }

    /// Validates the input locally before sending it.
    pub async fn create_quest(&self, input: &CreateQuestInput) -> ApiResult<Quest> {
        input.validate()?;
        self.post_json("/quests", input).await
    }

    pub async fn update_quest(&self, id: &str, patch: &QuestUpdate) -> ApiResult<Quest> {
        self.put_json(&format!("/quests/{}", segment(id)), patch).await
    }

    pub async fn delete_quest(&self, id: &str) -> ApiResult<()> {
        self.delete(&format!("/quests/{}", segment(id))).await
    }

    pub async fn start_quest(&self, id: &str) -> ApiResult<Quest> {
        self.request_json(&format!("/quests/{}/start", segment(id)), Method::POST.into())
            .await
    }

    pub async fn cancel_quest(&self, id: &str) -> ApiResult<Quest> {
        self.request_json(&format!("/quests/{}/cancel", segment(id)), Method::POST.into())
            .await
    }

    pub async fn list_contributions(&self, quest_id: &str) -> ApiResult<Vec<QuestContribution>> {
        self.get_json(&format!("/quests/{}/contributions", segment(quest_id)))
            .await
    }

    /// Record one unit of progress on a quantitative quest
    pub async fn record_contribution(&self, quest_id: &str) -> ApiResult<QuestContribution> {
        self.request_json(
            &format!("/quests/{}/contributions", segment(quest_id)),
            Method::POST.into(),
        )
        .await
    }

    /// Number of goals currently in the `active` state
    pub async fn active_goals_count(&self) -> ApiResult<u64> {
        let response: CountResponse = self.get_json("/goals/active/count").await?;
        Ok(response.count)
    }
}
