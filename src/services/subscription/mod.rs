//! Subscription status lookups with a last-known cache, a network cooldown
//! and per-user request coalescing.
//!
//! `SubscriptionClient::get_status` never fails. When the billing backend
//! cannot be reached the caller gets the cached status for that user, or
//! [`SubscriptionStatus::free`] when there is none.

pub mod cache;
pub mod retry;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::models::subscription::{SubscriptionStatus, MOCK_COMPANY_USER_ID};
use crate::services::billing::{BillingApi, FetchError};

pub use cache::{CacheRecord, StatusCache};
pub use retry::{AttemptOutcome, RetryPolicy, RetryState};

pub const DEFAULT_COOLDOWN_WINDOW: Duration = Duration::from_secs(60);
pub const DEFAULT_WARN_INTERVAL: Duration = Duration::from_secs(15);

/// Handle every concurrent caller for the same user awaits.
pub type SharedStatus = Shared<BoxFuture<'static, SubscriptionStatus>>;

#[derive(Debug, Clone, Copy)]
pub struct ClientSettings {
    pub retry: RetryPolicy,
    pub cooldown_window: Duration,
    pub warn_interval: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            cooldown_window: DEFAULT_COOLDOWN_WINDOW,
            warn_interval: DEFAULT_WARN_INTERVAL,
        }
    }
}

#[derive(Clone)]
pub struct SubscriptionClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    api: Arc<dyn BillingApi>,
    cache: StatusCache,
    settings: ClientSettings,
    cooldown_until: Mutex<Option<Instant>>,
    last_warned_at: Mutex<Option<Instant>>,
    in_flight: DashMap<String, SharedStatus>,
}

/// Removes the in-flight entry however the fetch task ends.
struct InFlightGuard {
    inner: Arc<ClientInner>,
    user_id: String,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.inner.in_flight.remove(&self.user_id);
    }
}

impl SubscriptionClient {
    pub fn new(api: Arc<dyn BillingApi>, cache: StatusCache) -> Self {
        Self::with_settings(api, cache, ClientSettings::default())
    }

    pub fn with_settings(
        api: Arc<dyn BillingApi>,
        cache: StatusCache,
        settings: ClientSettings,
    ) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                api,
                cache,
                settings,
                cooldown_until: Mutex::new(None),
                last_warned_at: Mutex::new(None),
                in_flight: DashMap::new(),
            }),
        }
    }

    pub async fn get_status(&self, user_id: &str) -> SubscriptionStatus {
        self.status_future(user_id).await
    }

    /// Joins the pending lookup for `user_id`, or starts one.
    ///
    /// The lookup runs on its own task, so it finishes and updates the cache
    /// even if every caller drops its handle.
    pub fn status_future(&self, user_id: &str) -> SharedStatus {
        match self.inner.in_flight.entry(user_id.to_string()) {
            Entry::Occupied(entry) => {
                debug!(user_id, "joining in-flight subscription status request");
                entry.get().clone()
            }
            Entry::Vacant(entry) => {
                let inner = Arc::clone(&self.inner);
                let key = user_id.to_string();
                // The guard is built on first poll so nothing touches the map
                // while this entry still holds its shard lock.
                let task = tokio::spawn(async move {
                    let guard = InFlightGuard { inner, user_id: key };
                    guard.inner.resolve(&guard.user_id).await
                });

                let shared = async move {
                    task.await.unwrap_or_else(|err| {
                        warn!(?err, "subscription status task aborted");
                        SubscriptionStatus::free()
                    })
                }
                .boxed()
                .shared();

                entry.insert(shared.clone());
                shared
            }
        }
    }

    pub fn cached_status(&self, user_id: &str) -> Option<SubscriptionStatus> {
        self.inner.cache.read(user_id)
    }

    pub fn is_cooling_down(&self) -> bool {
        self.inner.cooldown_active()
    }

    pub fn in_flight_count(&self) -> usize {
        self.inner.in_flight.len()
    }
}

impl ClientInner {
    async fn resolve(&self, user_id: &str) -> SubscriptionStatus {
        if self.cooldown_active() || self.api.is_backend_network_cooldown_active() {
            debug!(user_id, "billing backend cooling down; serving cached status");
            return self.fallback(user_id).await;
        }

        if user_id == MOCK_COMPANY_USER_ID {
            let status = SubscriptionStatus::mock_professional();
            self.remember(user_id, &status).await;
            return status;
        }

        let result = self
            .settings
            .retry
            .run(user_id, || self.api.fetch_subscription_status(user_id))
            .await;

        match result {
            Ok(status) => {
                self.remember(user_id, &status).await;
                status
            }
            Err(err) => {
                if err.is_network_class() {
                    self.arm_cooldown();
                    self.api.report_backend_unreachable();
                }
                self.warn_failure(user_id, &err);
                self.fallback(user_id).await
            }
        }
    }

    // Cache access goes through the store, which may be file backed.
    async fn fallback(&self, user_id: &str) -> SubscriptionStatus {
        let cache = self.cache.clone();
        let key = user_id.to_string();
        tokio::task::spawn_blocking(move || cache.read(&key))
            .await
            .ok()
            .flatten()
            .unwrap_or_else(SubscriptionStatus::free)
    }

    async fn remember(&self, user_id: &str, status: &SubscriptionStatus) {
        let cache = self.cache.clone();
        let key = user_id.to_string();
        let status = status.clone();
        match tokio::task::spawn_blocking(move || cache.write(&key, &status)).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => warn!(user_id, ?err, "failed to cache subscription status"),
            Err(err) => warn!(user_id, ?err, "subscription cache write did not complete"),
        }
    }

    fn cooldown_active(&self) -> bool {
        self.cooldown_until
            .lock()
            .ok()
            .and_then(|guard| *guard)
            .is_some_and(|until| Instant::now() < until)
    }

    fn arm_cooldown(&self) {
        if let Ok(mut guard) = self.cooldown_until.lock() {
            *guard = Some(Instant::now() + self.settings.cooldown_window);
        }
    }

    /// At most one failure warning per `warn_interval`, whatever the cause.
    fn warn_failure(&self, user_id: &str, err: &FetchError) {
        let now = Instant::now();
        let due = match self.last_warned_at.lock() {
            Ok(mut last) => {
                let due = last
                    .map(|at| now.duration_since(at) >= self.settings.warn_interval)
                    .unwrap_or(true);
                if due {
                    *last = Some(now);
                }
                due
            }
            Err(_) => false,
        };

        if !due {
            debug!(user_id, %err, "subscription status lookup failed");
        } else if err.is_network_class() {
            warn!(
                user_id,
                %err,
                cooldown_secs = self.settings.cooldown_window.as_secs(),
                "billing backend unreachable; serving cached subscription status"
            );
        } else {
            warn!(
                user_id,
                %err,
                "subscription status request rejected; serving cached status"
            );
        }
    }
}
