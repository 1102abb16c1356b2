use anyhow::{anyhow, bail, Context, Result};
use futures::future::join_all;
use jobshaman_client::config::Config;
use jobshaman_client::services::saved_filters::SavedFilterRepository;
use jobshaman_client::utils::tier_badge::badge_for_tier;
use jobshaman_client::AppState;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

const USAGE: &str = "usage:
  jobshaman status <user_id>...
  jobshaman badge <tier>
  jobshaman consent show|accept-all|reject-all|export|delete
  jobshaman filters list <user_id>
  jobshaman filters create <user_id> <name> <filters_json>
  jobshaman filters rename <id> <name>
  jobshaman filters delete <id>";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first().map(String::as_str) else {
        bail!(USAGE);
    };

    // badge needs no configuration at all
    if command == "badge" {
        let tier = args.get(1).ok_or_else(|| anyhow!(USAGE))?;
        let badge = badge_for_tier(tier);
        print_json(&json!({ "label": badge.label, "color": badge.color }))?;
        return Ok(());
    }

    let config = Config::from_env().context("failed to load configuration")?;
    let state = AppState::from_config(config).context("failed to build http client")?;
    info!(storage = %state.config.storage_path.display(), "jobshaman client ready");

    match command {
        "status" => run_status(&state, &args[1..]).await,
        "consent" => run_consent(&state, args.get(1).map(String::as_str)),
        "filters" => {
            let repo = state
                .saved_filters
                .clone()
                .context("SUPABASE_URL and SUPABASE_ANON_KEY must be set for saved filters")?;
            run_filters(repo, &args[1..]).await
        }
        _ => bail!(USAGE),
    }
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run_status(state: &AppState, user_ids: &[String]) -> Result<()> {
    if user_ids.is_empty() {
        bail!(USAGE);
    }

    let lookups = user_ids
        .iter()
        .map(|user_id| state.subscriptions.get_status(user_id));
    let statuses = join_all(lookups).await;

    for (user_id, status) in user_ids.iter().zip(statuses) {
        let badge = badge_for_tier(status.tier.as_str());
        print_json(&json!({
            "userId": user_id,
            "badge": badge.label,
            "status": status,
        }))?;
    }
    Ok(())
}

fn run_consent(state: &AppState, action: Option<&str>) -> Result<()> {
    let consent = &state.consent;
    match action {
        Some("show") => {
            let prefs = consent.load().context("failed to read consent")?;
            print_json(&serde_json::to_value(prefs)?)
        }
        Some("accept-all") => print_json(&serde_json::to_value(consent.accept_all()?)?),
        Some("reject-all") => print_json(&serde_json::to_value(consent.reject_all()?)?),
        Some("export") => print_json(&consent.export_user_data()?),
        Some("delete") => {
            let removed = consent
                .delete_user_data()
                .context("failed to delete local data")?;
            print_json(&json!({ "removed": removed }))
        }
        _ => bail!(USAGE),
    }
}

async fn run_filters(repo: Arc<dyn SavedFilterRepository>, args: &[String]) -> Result<()> {
    let arg = |index: usize| args.get(index).ok_or_else(|| anyhow!(USAGE));

    match args.first().map(String::as_str) {
        Some("list") => {
            let rows = repo.list(arg(1)?).await?;
            print_json(&serde_json::to_value(rows)?)
        }
        Some("create") => {
            let filters: Value =
                serde_json::from_str(arg(3)?).context("filters must be valid JSON")?;
            let row = repo.create(arg(1)?, arg(2)?, filters).await?;
            print_json(&serde_json::to_value(row)?)
        }
        Some("rename") => {
            let id = Uuid::parse_str(arg(1)?).context("invalid filter set id")?;
            let row = repo.rename(id, arg(2)?).await?;
            print_json(&serde_json::to_value(row)?)
        }
        Some("delete") => {
            let id = Uuid::parse_str(arg(1)?).context("invalid filter set id")?;
            repo.delete(id).await?;
            print_json(&json!({ "deleted": id }))
        }
        _ => bail!(USAGE),
    }
}
