use async_trait::async_trait;
use serde::Deserialize;

use super::{BillingApi, FetchError};
use crate::models::subscription::SubscriptionStatus;
use crate::services::http::AuthenticatedHttp;

pub struct LiveBillingApi {
    http: AuthenticatedHttp,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct BillingErrorBody {
    error: Option<String>,
    message: Option<String>,
    detail: Option<String>,
}

impl LiveBillingApi {
    pub fn new(http: AuthenticatedHttp, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    fn status_url(&self) -> String {
        format!(
            "{}/subscription-status",
            self.base_url.trim_end_matches('/')
        )
    }
}

fn error_message(body: &str, status: u16) -> String {
    let parsed = serde_json::from_str::<BillingErrorBody>(body).ok();
    parsed
        .and_then(|err| err.error.or(err.detail).or(err.message))
        .map(|msg| msg.trim().to_string())
        .filter(|msg| !msg.is_empty())
        .or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
        .unwrap_or_else(|| format!("subscription status request failed with {}", status))
}

#[async_trait]
impl BillingApi for LiveBillingApi {
    async fn fetch_subscription_status(
        &self,
        user_id: &str,
    ) -> Result<SubscriptionStatus, FetchError> {
        let request = self
            .http
            .get(&self.status_url())
            .query(&[("userId", user_id)]);
        let response = self.http.send(request).await?;
        let status = response.status();

        let body = response
            .text()
            .await
            .map_err(|err| FetchError::Network(err.to_string()))?;

        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                message: error_message(&body, status.as_u16()),
            });
        }

        serde_json::from_str::<SubscriptionStatus>(&body)
            .map_err(|err| FetchError::InvalidResponse(err.to_string()))
    }

    fn is_backend_network_cooldown_active(&self) -> bool {
        self.http.is_network_cooldown_active()
    }

    fn report_backend_unreachable(&self) {
        self.http.arm_network_cooldown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::subscription::SubscriptionTier;
    use crate::services::http::{SessionCredentials, CSRF_HEADER};
    use serde_json::json;

    fn api(server: &httpmock::MockServer) -> LiveBillingApi {
        let http = AuthenticatedHttp::new(
            reqwest::Client::new(),
            SessionCredentials {
                access_token: Some("token-1".into()),
                csrf_token: Some("csrf-1".into()),
            },
        );
        LiveBillingApi::new(http, server.url("/"))
    }

    #[tokio::test]
    async fn fetches_status_with_user_query_and_credentials() {
        let server = httpmock::MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(httpmock::Method::GET)
                .path("/subscription-status")
                .query_param("userId", "user-42")
                .header("authorization", "Bearer token-1")
                .header(CSRF_HEADER, "csrf-1");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({
                    "tier": "professional",
                    "tierName": "Professional",
                    "status": "active",
                    "assessmentsAvailable": 20,
                    "assessmentsUsed": 3,
                    "jobPostingsAvailable": 7
                }));
        });

        let status = api(&server)
            .fetch_subscription_status("user-42")
            .await
            .expect("status");

        mock.assert();
        assert_eq!(status.tier, SubscriptionTier::Professional);
        assert_eq!(status.assessments_used, 3);
        assert_eq!(status.job_postings_available, 7);
    }

    #[tokio::test]
    async fn error_status_carries_backend_message() {
        let server = httpmock::MockServer::start();
        server.mock(|when, then| {
            when.path("/subscription-status");
            then.status(404)
                .json_body(json!({ "detail": "User not found" }));
        });

        let err = api(&server)
            .fetch_subscription_status("ghost")
            .await
            .expect_err("404");

        match err {
            FetchError::Status { status, message } => {
                assert_eq!(status, 404);
                assert_eq!(message, "User not found");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_body_is_invalid_response() {
        let server = httpmock::MockServer::start();
        server.mock(|when, then| {
            when.path("/subscription-status");
            then.status(200).body("<html>maintenance</html>");
        });

        let err = api(&server)
            .fetch_subscription_status("user-1")
            .await
            .expect_err("not json");

        assert!(matches!(err, FetchError::InvalidResponse(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn error_message_falls_back_to_raw_body_then_status() {
        assert_eq!(error_message("upstream exploded", 502), "upstream exploded");
        assert_eq!(
            error_message("", 500),
            "subscription status request failed with 500"
        );
    }
}
