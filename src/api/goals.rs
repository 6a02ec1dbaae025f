//! Goal and Task Endpoints

use super::client::{segment, ApiClient};
use super::error::ApiResult;
use crate::models::{CreateGoalInput, CreateTaskInput, Goal, GoalTask, GoalUpdate, TaskUpdate};

impl ApiClient {
    pub async fn list_goals(&self) -> ApiResult<Vec<Goal>> {
        self.get_json("/goals").await
    }

    pub async fn get_goal(&self, id: &str) -> ApiResult<Goal> {
        self.get_json(&format!("/goals/{}", segment(id))).await
    }

    pub async fn create_goal(&self, input: &CreateGoalInput) -> ApiResult<Goal> {
        self.post_json("/goals", input).await
    }

    pub async fn update_goal(&self, id: &str, patch: &GoalUpdate) -> ApiResult<Goal> {
        self.put_json(&format!("/goals/{}", segment(id)), patch).await
    }

    pub async fn delete_goal(&self, id: &str) -> ApiResult<()> {
        self.delete(&format!("/goals/{}", segment(id))).await
    }

    pub async fn list_tasks(&self, goal_id: &str) -> ApiResult<Vec<GoalTask>> {
        self.get_json(&format!("/goals/{}/tasks", segment(goal_id)))
            .await
    }

    pub async fn create_task(&self, goal_id: &str, input: &CreateTaskInput) -> ApiResult<GoalTask> {
        self.post_json(&format!("/goals/{}/tasks", segment(goal_id)), input)
            .await
    }

    pub async fn update_task(&self, task_id: &str, patch: &TaskUpdate) -> ApiResult<GoalTask> {
        self.put_json(&format!("/tasks/{}", segment(task_id)), patch)
            .await
    }

    pub async fn delete_task(&self, task_id: &str) -> ApiResult<()> {
        self.delete(&format!("/tasks/{}", segment(task_id))).await
    }
}
