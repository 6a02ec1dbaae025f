//! Subscription and Billing Endpoints

use reqwest::Method;
use serde::Serialize;

use super::client::ApiClient;
use super::error::ApiResult;
use crate::models::{Plan, RedirectSession, Subscription};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CheckoutArgs<'a> {
    plan_id: &'a str,
    success_url: &'a str,
    cancel_url: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PortalArgs<'a> {
    return_url: &'a str,
}

impl ApiClient {
    pub async fn list_plans(&self) -> ApiResult<Vec<Plan>> {
        self.get_json("/subscriptions/plans").await
    }

    /// `None` when the user has never subscribed (empty 2xx body)
    pub async fn current_subscription(&self) -> ApiResult<Option<Subscription>> {
        self.get_optional("/subscriptions/current").await
    }

    pub async fn create_checkout_session(
        &self,
        plan_id: &str,
        success_url: &str,
        cancel_url: &str,
    ) -> ApiResult<RedirectSession> {
        self.post_json(
            "/subscriptions/checkout",
            &CheckoutArgs {
                plan_id,
                success_url,
                cancel_url,
            },
        )
        .await
    }

    pub async fn cancel_subscription(&self) -> ApiResult<()> {
        self.send(Method::POST, "/subscriptions/cancel").await
    }

    pub async fn billing_portal(&self, return_url: &str) -> ApiResult<RedirectSession> {
        self.post_json("/subscriptions/portal", &PortalArgs { return_url })
            .await
    }
}
