//! Guild Endpoints
//!
//! CRUD, membership and moderation.

use reqwest::Method;
use serde::Serialize;

use super::client::{segment, ApiClient};
use super::error::ApiResult;
use crate::models::{CreateGuildInput, Guild, GuildMember, GuildRole, GuildUpdate};

#[derive(Serialize)]
struct RoleArgs {
    role: GuildRole,
}

#[derive(Serialize)]
struct BanArgs<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<&'a str>,
}

fn guild_path(id: &str) -> String {
    format!("/guilds/{}", segment(id))
}

fn member_path(guild_id: &str, user_id: &str) -> String {
    format!("{}/members/{}", guild_path(guild_id), segment(user_id))
}

impl ApiClient {
    // ========================
    // CRUD
    // ========================

    pub async fn list_guilds(&self) -> ApiResult<Vec<Guild>> {
        self.get_json("/guilds").await
    }

    pub async fn get_guild(&self, id: &str) -> ApiResult<Guild> {
        self.get_json(&guild_path(id)).await
    }

    pub async fn create_guild(&self, input: &CreateGuildInput) -> ApiResult<Guild> {
        self.post_json("/guilds", input).await
    }

    pub async fn update_guild(&self, id: &str, patch: &GuildUpdate) -> ApiResult<Guild> {
        self.put_json(&guild_path(id), patch).await
    }

    pub async fn delete_guild(&self, id: &str) -> ApiResult<()> {
        self.delete(&guild_path(id)).await
    }

    // ========================
    // Membership
    // ========================

    pub async fn join_guild(&self, id: &str) -> ApiResult<()> {
        self.send(Method::POST, &format!("{}/join", guild_path(id)))
            .await
    }

    pub async fn leave_guild(&self, id: &str) -> ApiResult<()> {
        self.send(Method::POST, &format!("{}/leave", guild_path(id)))
            .await
    }

    pub async fn list_guild_members(&self, id: &str) -> ApiResult<Vec<GuildMember>> {
        self.get_json(&format!("{}/members", guild_path(id))).await
    }

    // ========================
    // Moderation
    // ========================

    pub async fn remove_guild_member(&self, guild_id: &str, user_id: &str) -> ApiResult<()> {
        self.delete(&member_path(guild_id, user_id)).await
    }

    pub async fn set_guild_member_role(
        &self,
        guild_id: &str,
        user_id: &str,
        role: GuildRole,
    ) -> ApiResult<GuildMember> {
        self.put_json(&format!("{}/role", member_path(guild_id, user_id)), &RoleArgs { role })
            .await
    }

    pub async fn ban_guild_member(
        &self,
        guild_id: &str,
        user_id: &str,
        reason: Option<&str>,
    ) -> ApiResult<()> {
        self.send_json(
            Method::POST,
            &format!("{}/ban", member_path(guild_id, user_id)),
            &BanArgs { reason },
        )
        .await
    }

    pub async fn unban_guild_member(&self, guild_id: &str, user_id: &str) -> ApiResult<()> {
        self.delete(&format!("{}/bans/{}", guild_path(guild_id), segment(user_id)))
            .await
    }
}
