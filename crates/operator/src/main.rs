use anyhow::Context;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use autoheal_operator::{
    config::Config,
    kubernetes::KubeClusterClient,
    recovery::{
        spawn_counter_logger, CooldownGuard, ExecutorOptions, RecoveryCounters, RecoveryEngine,
        RecoveryExecutor,
    },
    server::Server,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = Config::load().context("failed to load configuration")?;
    info!("Loaded configuration: {:?}", config);

    // No usable cluster client means nothing to do
    let cluster = KubeClusterClient::try_default()
        .await
        .context("failed to create Kubernetes client")?;

    let counters = Arc::new(RecoveryCounters::new().context("failed to register counters")?);
    let cooldown = Arc::new(CooldownGuard::new(config.recovery.cooldown_window));
    let executor = RecoveryExecutor::new(
        Arc::new(cluster),
        ExecutorOptions::from(&config.recovery),
    );
    let engine = Arc::new(RecoveryEngine::new(executor, cooldown, counters.clone()));

    if let Some(period) = config.recovery.counter_log_interval {
        spawn_counter_logger(counters, period);
    }

    let server = Server::new(&config, engine);

    info!("Starting server on {}", config.server.addr);
    server
        .start(&config.server.addr)
        .await
        .context("server failed")?;

    Ok(())
}
