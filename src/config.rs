use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::services::http::DEFAULT_REQUEST_TIMEOUT;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{key} is invalid: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct SupabaseSettings {
    pub url: String,
    pub anon_key: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub billing_backend_url: String,
    pub supabase: Option<SupabaseSettings>,
    pub session_token: Option<String>,
    pub csrf_token: Option<String>,
    pub storage_path: PathBuf,
    pub request_timeout: Duration,
}

fn optional_env_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn default_storage_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("jobshaman")
        .join("storage.json")
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok(); // Load .env file

        let billing_backend_url = optional_env_var("BILLING_BACKEND_URL")
            .ok_or(ConfigError::Missing("BILLING_BACKEND_URL"))?;
        if !billing_backend_url.starts_with("http://") && !billing_backend_url.starts_with("https://")
        {
            return Err(ConfigError::Invalid {
                key: "BILLING_BACKEND_URL",
                reason: "expected an http(s) URL".into(),
            });
        }

        let supabase = match (
            optional_env_var("SUPABASE_URL"),
            optional_env_var("SUPABASE_ANON_KEY"),
        ) {
            (Some(url), Some(anon_key)) => Some(SupabaseSettings { url, anon_key }),
            (Some(_), None) => return Err(ConfigError::Missing("SUPABASE_ANON_KEY")),
            _ => None,
        };

        let request_timeout = match optional_env_var("JOBSHAMAN_REQUEST_TIMEOUT_SECS") {
            Some(raw) => raw
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .ok_or_else(|| ConfigError::Invalid {
                    key: "JOBSHAMAN_REQUEST_TIMEOUT_SECS",
                    reason: format!("expected a positive number of seconds, got {raw:?}"),
                })?,
            None => DEFAULT_REQUEST_TIMEOUT,
        };

        Ok(Config {
            billing_backend_url,
            supabase,
            session_token: optional_env_var("JOBSHAMAN_SESSION_TOKEN"),
            csrf_token: optional_env_var("JOBSHAMAN_CSRF_TOKEN"),
            storage_path: optional_env_var("JOBSHAMAN_STORAGE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(default_storage_path),
            request_timeout,
        })
    }
}
