use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response};
use tokio::time::Instant;
use tracing::debug;

pub const CSRF_HEADER: &str = "x-csrf-token";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_NETWORK_COOLDOWN: Duration = Duration::from_secs(60);

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,
    #[error("network error: {0}")]
    Network(String),
    #[error("request could not be built: {0}")]
    Builder(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_builder() {
            TransportError::Builder(err.to_string())
        } else {
            TransportError::Network(err.to_string())
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SessionCredentials {
    pub access_token: Option<String>,
    pub csrf_token: Option<String>,
}

/// Wraps a `reqwest::Client` so every call carries the session credentials
/// and the anti-forgery token, and tracks whether the backend looked
/// unreachable recently.
///
/// The cooldown signal is only armed through [`arm_network_cooldown`] once a
/// caller has given up on the backend; a single failed attempt never arms it.
/// Any response that makes it back clears it.
///
/// [`arm_network_cooldown`]: AuthenticatedHttp::arm_network_cooldown
#[derive(Clone)]
pub struct AuthenticatedHttp {
    client: Client,
    credentials: Arc<RwLock<SessionCredentials>>,
    cooldown_until: Arc<Mutex<Option<Instant>>>,
    cooldown_window: Duration,
    timeout: Duration,
}

impl AuthenticatedHttp {
    pub fn new(client: Client, credentials: SessionCredentials) -> Self {
        Self {
            client,
            credentials: Arc::new(RwLock::new(credentials)),
            cooldown_until: Arc::new(Mutex::new(None)),
            cooldown_window: DEFAULT_NETWORK_COOLDOWN,
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_cooldown_window(mut self, window: Duration) -> Self {
        self.cooldown_window = window;
        self
    }

    pub fn set_credentials(&self, credentials: SessionCredentials) {
        if let Ok(mut guard) = self.credentials.write() {
            *guard = credentials;
        }
    }

    pub fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let mut builder = self
            .client
            .request(method, url)
            .timeout(self.timeout)
            .header(reqwest::header::ACCEPT, "application/json");

        if let Ok(credentials) = self.credentials.read() {
            if let Some(token) = credentials.access_token.as_deref() {
                builder = builder.bearer_auth(token);
            }
            if let Some(csrf) = credentials.csrf_token.as_deref() {
                builder = builder.header(CSRF_HEADER, csrf);
            }
        }

        builder
    }

    pub fn get(&self, url: &str) -> RequestBuilder {
        self.request(Method::GET, url)
    }

    pub async fn send(&self, request: RequestBuilder) -> Result<Response, TransportError> {
        match request.send().await {
            Ok(response) => {
                self.clear_network_cooldown();
                Ok(response)
            }
            Err(err) => {
                let err = TransportError::from(err);
                debug!(?err, "backend request failed at the transport layer");
                Err(err)
            }
        }
    }

    pub fn is_network_cooldown_active(&self) -> bool {
        self.cooldown_until
            .lock()
            .ok()
            .and_then(|guard| *guard)
            .is_some_and(|until| Instant::now() < until)
    }

    pub fn arm_network_cooldown(&self) {
        if let Ok(mut guard) = self.cooldown_until.lock() {
            *guard = Some(Instant::now() + self.cooldown_window);
        }
    }

    fn clear_network_cooldown(&self) {
        if let Ok(mut guard) = self.cooldown_until.lock() {
            *guard = None;
        }
    }
}
