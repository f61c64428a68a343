//! bidstaged - live song-request session daemon.
//!
//! `bidstaged [config.toml]` runs the WebSocket gateway. The `deposit` and
//! `patron` subcommands are offline operator tools, see [`bidstage::admin`].

use anyhow::{Context as _, bail};
use bidstage::admin::AdminCommand;
use bidstage::auth::{Authenticator, StaticTokenAuthenticator};
use bidstage::config::{Config, LogFormat, validation};
use bidstage::db::Database;
use bidstage::ledger::{CountryCache, LedgerService, StaticCountryConfig};
use bidstage::network::Gateway;
use bidstage::state::Hub;
use bidstage::{http, metrics};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(true)
            .init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    if let Some(command) = AdminCommand::parse(&args)? {
        init_tracing(LogFormat::Pretty);
        return command.run().await;
    }

    // Load configuration
    let config_path = args
        .first()
        .cloned()
        .unwrap_or_else(|| "config.toml".to_string());
    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {config_path}"))?;

    init_tracing(config.server.log_format);

    if let Err(errors) = validation::validate(&config) {
        for e in &errors {
            error!(error = %e, "Invalid configuration");
        }
        bail!("{} configuration error(s) in {config_path}", errors.len());
    }

    info!(server = %config.server.name, "Starting bidstaged");

    metrics::init();

    // metrics_port = 0 disables the HTTP endpoint.
    let metrics_port = config.server.metrics_port.unwrap_or(9090);
    if metrics_port == 0 {
        info!("Metrics endpoint disabled");
    } else {
        tokio::spawn(async move {
            http::run_http_server(metrics_port).await;
        });
    }

    // Initialize database
    let db = Database::new(config.database_path()).await?;

    let countries = Arc::new(CountryCache::new(
        Arc::new(StaticCountryConfig::new(config.countries.clone())),
        Duration::from_secs(config.country_cache.ttl_secs),
    ));
    info!(countries = config.countries.len(), "Country tables loaded");

    let ledger = LedgerService::new(db, countries);
    let hub = Arc::new(Hub::new(ledger, config.limits.clone()));
    let auth: Arc<dyn Authenticator> =
        Arc::new(StaticTokenAuthenticator::from_config(&config.auth));

    let gateway = Gateway::bind(config.listen.clone(), hub, auth).await?;
    info!(address = %gateway.local_addr()?, "bidstaged ready");

    tokio::select! {
        result = gateway.run() => result?,
        _ = tokio::signal::ctrl_c() => info!("Shutdown requested"),
    }

    Ok(())
}
