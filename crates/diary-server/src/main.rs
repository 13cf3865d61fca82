//! Incident diary server.
//!
//! Receives alert events and Slack interactivity callbacks and keeps one
//! Slack thread per incident.

use anyhow::{Context, Result};
use clap::Parser;
use diary::{AckWorkflow, CauseMenu, IncidentDispatcher, IncidentStore, MemoryStore};
use diary_notify::SlackGateway;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use diary_server::{run_server, AppState};

/// Incident diary - one Slack thread per incident, with acknowledgments
#[derive(Parser)]
#[command(name = "diary-server")]
#[command(about = "Incident diary - one Slack thread per incident, with acknowledgments")]
#[command(version)]
struct Cli {
    /// Address to listen on
    #[arg(long, env = "DIARY_ADDR", default_value = "0.0.0.0:8080")]
    addr: String,

    /// Slack bot token
    #[arg(long, env = "SLACK_BOT_TOKEN", hide_env_values = true)]
    slack_token: String,

    /// Slack Web API base URL
    #[arg(long, env = "SLACK_API_URL", default_value = "https://slack.com/api")]
    slack_api_url: String,

    /// YAML file mapping alert conditions to root causes
    #[arg(long, env = "DIARY_CAUSES_FILE")]
    causes: Option<PathBuf>,

    /// Postgres connection URL (in-memory store when unset)
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: Option<String>,

    /// Log output format
    #[arg(long, env = "DIARY_LOG_FORMAT", default_value = "json")]
    log_format: LogFormat,
}

#[derive(Clone, Copy, Default, clap::ValueEnum)]
enum LogFormat {
    #[default]
    Json,
    Text,
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("diary=info,diary_notify=info,diary_server=info,warn"));

    match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .init(),
        LogFormat::Text => tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .init(),
    }
}

#[cfg(feature = "postgres")]
async fn open_store(database_url: Option<&str>) -> Result<Arc<dyn IncidentStore>> {
    match database_url {
        Some(url) => {
            let store = diary::PgStore::connect(url)
                .await
                .context("failed to connect to Postgres")?;
            info!("Using Postgres incident store");
            Ok(Arc::new(store))
        }
        None => {
            warn!("DATABASE_URL not set, incidents are kept in memory");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

#[cfg(not(feature = "postgres"))]
#[allow(clippy::unused_async)]
async fn open_store(database_url: Option<&str>) -> Result<Arc<dyn IncidentStore>> {
    if database_url.is_some() {
        warn!("Built without the postgres feature, ignoring DATABASE_URL");
    }
    warn!("Incidents are kept in memory");
    Ok(Arc::new(MemoryStore::new()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let causes = match &cli.causes {
        Some(path) => CauseMenu::load(path)
            .with_context(|| format!("failed to load cause menu from {}", path.display()))?,
        None => CauseMenu::default(),
    };
    info!(conditions = causes.len(), "Loaded cause menu");

    let store = open_store(cli.database_url.as_deref()).await?;
    let gateway = Arc::new(SlackGateway::new(cli.slack_token).with_base_url(cli.slack_api_url));

    let state = Arc::new(AppState {
        dispatcher: IncidentDispatcher::new(store.clone(), gateway.clone()),
        ack: AckWorkflow::new(store, gateway, causes),
    });

    run_server(state, &cli.addr).await
}
