//! Quest Template Endpoints

use super::client::{segment, ApiClient};
use super::error::ApiResult;
use crate::models::{CreateTemplateInput, QuestTemplate, TemplateUpdate};

impl ApiClient {
    pub async fn list_templates(&self) -> ApiResult<Vec<QuestTemplate>> {
        self.get_json("/quests/templates").await
    }

    pub async fn get_template(&self, id: &str) -> ApiResult<QuestTemplate> {
        self.get_json(&format!("/quests/templates/{}", segment(id)))
            .await
    }

    pub async fn create_template(&self, input: &CreateTemplateInput) -> ApiResult<QuestTemplate> {
        self.post_json("/quests/templates", input).await
    }

    pub async fn update_template(&self, id: &str, patch: &TemplateUpdate) -> ApiResult<QuestTemplate> {
        self.put_json(&format!("/quests/templates/{}", segment(id)), patch)
            .await
    }

    pub async fn delete_template(&self, id: &str) -> ApiResult<()> {
        self.delete(&format!("/quests/templates/{}", segment(id)))
            .await
    }
}
