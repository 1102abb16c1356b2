use crate::config::Config;
use crate::services::billing::LiveBillingApi;
use crate::services::consent::ConsentManager;
use crate::services::http::{AuthenticatedHttp, SessionCredentials};
use crate::services::saved_filters::{PostgrestSavedFilterRepository, SavedFilterRepository};
use crate::services::subscription::{StatusCache, SubscriptionClient};
use crate::storage::{FileStore, LocalStore};
use reqwest::Client;
use std::sync::Arc;

/// One instance per process; handed to whatever needs a service.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn LocalStore>,
    pub http: AuthenticatedHttp,
    pub subscriptions: SubscriptionClient,
    pub consent: ConsentManager,
    pub saved_filters: Option<Arc<dyn SavedFilterRepository>>,
}

impl AppState {
    pub fn from_config(config: Config) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        let store = Arc::new(FileStore::new(config.storage_path.clone())) as Arc<dyn LocalStore>;
        Ok(Self::with_parts(config, client, store))
    }

    pub fn with_parts(config: Config, client: Client, store: Arc<dyn LocalStore>) -> Self {
        let http = AuthenticatedHttp::new(
            client.clone(),
            SessionCredentials {
                access_token: config.session_token.clone(),
                csrf_token: config.csrf_token.clone(),
            },
        )
        .with_timeout(config.request_timeout);

        let billing = Arc::new(LiveBillingApi::new(
            http.clone(),
            config.billing_backend_url.clone(),
        ));
        let subscriptions = SubscriptionClient::new(billing, StatusCache::new(store.clone()));

        let saved_filters = config.supabase.as_ref().map(|supabase| {
            Arc::new(PostgrestSavedFilterRepository::new(
                client.clone(),
                supabase.url.clone(),
                supabase.anon_key.clone(),
                config.session_token.clone(),
            )) as Arc<dyn SavedFilterRepository>
        });

        Self {
            consent: ConsentManager::new(store.clone()),
            config: Arc::new(config),
            store,
            http,
            subscriptions,
            saved_filters,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SupabaseSettings;
    use crate::storage::MemoryStore;
    use serde_json::json;
    use std::time::Duration;

    fn config(billing_url: String, supabase: Option<SupabaseSettings>) -> Config {
        Config {
            billing_backend_url: billing_url,
            supabase,
            session_token: Some("session-1".into()),
            csrf_token: Some("csrf-1".into()),
            storage_path: std::env::temp_dir().join("unused.json"),
            request_timeout: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn wired_client_fetches_and_caches_through_live_backend() {
        let server = httpmock::MockServer::start();
        let mock = server.mock(|when, then| {
            when.path("/subscription-status")
                .query_param("userId", "user-9")
                .header("authorization", "Bearer session-1")
                .header("x-csrf-token", "csrf-1");
            then.status(200).json_body(json!({
                "tier": "enterprise",
                "tierName": "Enterprise",
                "status": "active",
                "jobPostingsAvailable": 50
            }));
        });

        let store = MemoryStore::new();
        let state = AppState::with_parts(
            config(server.base_url(), None),
            Client::new(),
            Arc::new(store.clone()),
        );

        let status = state.subscriptions.get_status("user-9").await;

        mock.assert();
        assert_eq!(status.job_postings_available, 50);
        assert_eq!(state.subscriptions.cached_status("user-9"), Some(status));
        assert!(state.saved_filters.is_none());
    }

    #[tokio::test]
    async fn recovered_timeout_does_not_shut_out_other_users() {
        let server = httpmock::MockServer::start();
        let enterprise = json!({
            "tier": "enterprise",
            "tierName": "Enterprise",
            "status": "active"
        });
        let mut slow = server.mock(|when, then| {
            when.path("/subscription-status").query_param("userId", "user-1");
            then.status(200)
                .delay(Duration::from_millis(800))
                .json_body(enterprise.clone());
        });

        let mut settings = config(server.base_url(), None);
        settings.request_timeout = Duration::from_millis(200);
        let state = AppState::with_parts(settings, Client::new(), Arc::new(MemoryStore::new()));

        // first attempt times out; the retry after the backoff finds a healthy backend
        let subscriptions = state.subscriptions.clone();
        let first = tokio::spawn(async move { subscriptions.get_status("user-1").await });
        tokio::time::sleep(Duration::from_millis(600)).await;
        slow.delete();
        let fast_user_1 = server.mock(|when, then| {
            when.path("/subscription-status").query_param("userId", "user-1");
            then.status(200).json_body(enterprise.clone());
        });

        let status = first.await.unwrap();
        fast_user_1.assert();
        assert_eq!(status.tier.as_str(), "enterprise");
        assert!(!state.http.is_network_cooldown_active());

        let user_2 = server.mock(|when, then| {
            when.path("/subscription-status").query_param("userId", "user-2");
            then.status(200).json_body(enterprise.clone());
        });
        let status = state.subscriptions.get_status("user-2").await;

        user_2.assert();
        assert_eq!(status.tier.as_str(), "enterprise");
        assert!(!state.subscriptions.is_cooling_down());
    }

    #[test]
    fn saved_filters_enabled_only_with_supabase_settings() {
        let state = AppState::with_parts(
            config(
                "https://billing.example.test".into(),
                Some(SupabaseSettings {
                    url: "https://db.example.test".into(),
                    anon_key: "anon".into(),
                }),
            ),
            Client::new(),
            Arc::new(MemoryStore::new()),
        );
        assert!(state.saved_filters.is_some());
    }
}
