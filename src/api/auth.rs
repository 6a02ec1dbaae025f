//! Auth Endpoints
//!
//! Signup, login, password reset and the uniqueness probes used while the
//! signup form is being filled in.

use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::client::{query_value, ApiClient};
use super::error::ApiResult;
use crate::models::{AuthTokens, LoginInput, SignupInput, UserProfile};

// ========================
// Argument Structs
// ========================

#[derive(Serialize)]
struct EmailArgs<'a> {
    email: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ResetConfirmArgs<'a> {
    token: &'a str,
    new_password: &'a str,
}

#[derive(Deserialize)]
struct ExistsResponse {
    exists: bool,
}

// ========================
// Commands
// ========================

impl ApiClient {
    pub async fn signup(&self, input: &SignupInput) -> ApiResult<()> {
        self.send_json(Method::POST, "/auth/signup", input).await
    }

    /// Log in and keep the returned tokens in the local store.
    pub async fn login(&self, input: &LoginInput) -> ApiResult<AuthTokens> {
        let tokens: AuthTokens = self.post_json("/auth/login", input).await?;
        self.store().set_auth_tokens(tokens.clone())?;
        info!("login succeeded");
        Ok(tokens)
    }

    /// Drop local credentials. The server call is best-effort.
    pub async fn logout(&self) -> ApiResult<()> {
        let remote = self.send(Method::POST, "/auth/logout").await;
        self.store().clear_auth()?;
        remote
    }

    pub async fn request_password_reset(&self, email: &str) -> ApiResult<()> {
        self.send_json(Method::POST, "/auth/password-reset", &EmailArgs { email })
            .await
    }

    pub async fn confirm_password_reset(&self, token: &str, new_password: &str) -> ApiResult<()> {
        self.send_json(
            Method::POST,
            "/auth/password-reset/confirm",
            &ResetConfirmArgs {
                token,
                new_password,
            },
        )
        .await
    }

    pub async fn current_user(&self) -> ApiResult<UserProfile> {
        self.get_json("/auth/me").await
    }

    /// `true` when no account uses `email` yet
    pub async fn is_email_available(&self, email: &str) -> ApiResult<bool> {
        let endpoint = format!("/auth/email-exists?email={}", query_value(email));
        let response: ExistsResponse = self.get_json(&endpoint).await?;
        Ok(!response.exists)
    }

    /// `true` when no account uses `nickname` yet
    pub async fn is_nickname_available(&self, nickname: &str) -> ApiResult<bool> {
        let endpoint = format!("/auth/nickname-exists?nickname={}", query_value(nickname));
        let response: ExistsResponse = self.get_json(&endpoint).await?;
        Ok(!response.exists)
    }
}
