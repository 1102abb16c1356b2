use async_trait::async_trait;

use crate::models::subscription::SubscriptionStatus;
use crate::services::http::TransportError;

#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    #[error("billing request timed out")]
    Timeout,
    #[error("billing backend unreachable: {0}")]
    Network(String),
    #[error("billing backend responded with status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("billing backend returned an invalid response: {0}")]
    InvalidResponse(String),
    #[error("billing request could not be built: {0}")]
    Request(String),
}

impl FetchError {
    /// Transport failures, timeouts and 5xx responses are worth another try.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Timeout | FetchError::Network(_) => true,
            FetchError::Status { status, .. } => (500..600).contains(status),
            FetchError::InvalidResponse(_) | FetchError::Request(_) => false,
        }
    }

    /// Failures that suggest the backend as a whole is unavailable.
    pub fn is_network_class(&self) -> bool {
        self.is_retryable()
    }
}

impl From<TransportError> for FetchError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Timeout => FetchError::Timeout,
            TransportError::Network(msg) => FetchError::Network(msg),
            TransportError::Builder(msg) => FetchError::Request(msg),
        }
    }
}

/// The billing backend as seen by the subscription client.
#[async_trait]
pub trait BillingApi: Send + Sync {
    /// One attempt against the status endpoint. Retrying is the caller's job.
    async fn fetch_subscription_status(
        &self,
        user_id: &str,
    ) -> Result<SubscriptionStatus, FetchError>;

    /// Whether the request layer currently considers the backend unreachable.
    fn is_backend_network_cooldown_active(&self) -> bool {
        false
    }

    /// Called once the caller has exhausted its retries on a network-class
    /// failure, so the request layer can start its own cooldown.
    fn report_backend_unreachable(&self) {}
}

mod live;
mod mock;

pub use live::LiveBillingApi;
pub use mock::MockBillingApi;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_server_side_statuses_are_retryable() {
        let server = FetchError::Status {
            status: 502,
            message: "bad gateway".into(),
        };
        let client = FetchError::Status {
            status: 404,
            message: "not found".into(),
        };
        assert!(server.is_retryable());
        assert!(server.is_network_class());
        assert!(!client.is_retryable());
        assert!(!client.is_network_class());
    }

    #[test]
    fn transport_failures_are_retryable() {
        assert!(FetchError::Timeout.is_retryable());
        assert!(FetchError::Network("connection refused".into()).is_retryable());
        assert!(!FetchError::InvalidResponse("eof".into()).is_retryable());
        assert!(!FetchError::Request("bad url".into()).is_network_class());
    }
}
