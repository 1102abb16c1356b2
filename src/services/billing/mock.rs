use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use super::{BillingApi, FetchError};
use crate::models::subscription::SubscriptionStatus;

/// Scripted billing backend. Responses are consumed in order; once the
/// script runs dry every call gets `fallback`.
#[derive(Clone)]
pub struct MockBillingApi {
    pub responses: Arc<Mutex<VecDeque<Result<SubscriptionStatus, FetchError>>>>,
    pub fallback: Arc<Mutex<Result<SubscriptionStatus, FetchError>>>,
    pub calls: Arc<Mutex<Vec<(String, Instant)>>>,
    pub latency: Duration,
    pub backend_cooldown: Arc<AtomicBool>,
    pub unreachable_reports: Arc<AtomicUsize>,
}

impl Default for MockBillingApi {
    fn default() -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::new())),
            fallback: Arc::new(Mutex::new(Err(FetchError::Network(
                "mock backend has no scripted response".into(),
            )))),
            calls: Arc::new(Mutex::new(Vec::new())),
            latency: Duration::ZERO,
            backend_cooldown: Arc::new(AtomicBool::new(false)),
            unreachable_reports: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl MockBillingApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn push_response(&self, response: Result<SubscriptionStatus, FetchError>) {
        self.responses.lock().unwrap().push_back(response);
    }

    pub fn set_fallback(&self, response: Result<SubscriptionStatus, FetchError>) {
        *self.fallback.lock().unwrap() = response;
    }

    pub fn set_backend_cooldown(&self, active: bool) {
        self.backend_cooldown.store(active, Ordering::SeqCst);
    }

    pub fn unreachable_reports(&self) -> usize {
        self.unreachable_reports.load(Ordering::SeqCst)
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn call_times(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().iter().map(|(_, at)| *at).collect()
    }
}

#[async_trait]
impl BillingApi for MockBillingApi {
    async fn fetch_subscription_status(
        &self,
        user_id: &str,
    ) -> Result<SubscriptionStatus, FetchError> {
        self.calls
            .lock()
            .unwrap()
            .push((user_id.to_string(), Instant::now()));

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let scripted = self.responses.lock().unwrap().pop_front();
        match scripted {
            Some(response) => response,
            None => self.fallback.lock().unwrap().clone(),
        }
    }

    fn is_backend_network_cooldown_active(&self) -> bool {
        self.backend_cooldown.load(Ordering::SeqCst)
    }

    fn report_backend_unreachable(&self) {
        self.unreachable_reports.fetch_add(1, Ordering::SeqCst);
    }
}
