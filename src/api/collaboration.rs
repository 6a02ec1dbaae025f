//! Collaboration Endpoints
//!
//! Invites, collaborators and comment threads on goals, quests and tasks.

use reqwest::Method;

use super::client::{segment, ApiClient};
use super::error::ApiResult;
use crate::models::{Collaborator, Comment, CreateCommentInput, CreateInviteInput, Invite, ResourceType};

fn resource_path(resource_type: ResourceType, resource_id: &str) -> String {
    format!(
        "/collaborations/{}/{}",
        resource_type.as_str(),
        segment(resource_id)
    )
}

impl ApiClient {
    // ========================
    // Invites
    // ========================

    pub async fn create_invite(&self, input: &CreateInviteInput) -> ApiResult<Invite> {
        self.post_json("/collaborations/invites", input).await
    }

    /// Invites addressed to the current user
    pub async fn list_invites(&self) -> ApiResult<Vec<Invite>> {
        self.get_json("/collaborations/invites").await
    }

    pub async fn accept_invite(&self, invite_id: &str) -> ApiResult<()> {
        self.send(
            Method::POST,
            &format!("/collaborations/invites/{}/accept", segment(invite_id)),
        )
        .await
    }

    pub async fn decline_invite(&self, invite_id: &str) -> ApiResult<()> {
        self.send(
            Method::POST,
            &format!("/collaborations/invites/{}/decline", segment(invite_id)),
        )
        .await
    }

    // ========================
    // Collaborators
    // ========================

    pub async fn list_collaborators(
        &self,
        resource_type: ResourceType,
        resource_id: &str,
    ) -> ApiResult<Vec<Collaborator>> {
        self.get_json(&format!(
            "{}/collaborators",
            resource_path(resource_type, resource_id)
        ))
        .await
    }

    pub async fn remove_collaborator(
        &self,
        resource_type: ResourceType,
        resource_id: &str,
        user_id: &str,
    ) -> ApiResult<()> {
        self.delete(&format!(
            "{}/collaborators/{}",
            resource_path(resource_type, resource_id),
            segment(user_id)
        ))
        .await
    }

    // ========================
    // Comments
    // ========================

    pub async fn list_comments(
        &self,
        resource_type: ResourceType,
        resource_id: &str,
    ) -> ApiResult<Vec<Comment>> {
        self.get_json(&format!(
            "{}/comments",
            resource_path(resource_type, resource_id)
        ))
        .await
    }

    pub async fn create_comment(
        &self,
        resource_type: ResourceType,
        resource_id: &str,
        input: &CreateCommentInput,
    ) -> ApiResult<Comment> {
        self.post_json(
            &format!("{}/comments", resource_path(resource_type, resource_id)),
            input,
        )
        .await
    }

    pub async fn delete_comment(&self, comment_id: &str) -> ApiResult<()> {
        self.delete(&format!("/collaborations/comments/{}", segment(comment_id)))
            .await
    }
}
