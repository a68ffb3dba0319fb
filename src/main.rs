//! docker-api-notifier daemon entry point.

use std::sync::Arc;
use std::time::Duration;

use log::{error, info};
use tokio::signal;

mod agent;
mod config;
mod dispatch;
mod notifiers;
mod resolver;
mod retry;
mod runtime;
mod types;

use config::Config;
use dispatch::{ArmingTable, Dispatcher};
use notifiers::{DashboardClient, DnsClient};
use retry::RetryPolicy;
use runtime::DockerRuntime;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration first so the log level comes from it.
    let cfg = Config::load()?;
    init_logging(&cfg.log_level);
    info!("Starting docker-api-notifier with config: {:?}", cfg);

    let docker_host = cfg.docker_host();
    info!("Notifying on behalf of host: {}", docker_host);

    // One shared HTTP client with a bounded per-request timeout, so a hung
    // endpoint cannot stall the loop that triggered the call.
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(cfg.request_timeout_seconds))
        .build()?;
    let retry = RetryPolicy::default();
    let dns = DnsClient::new(
        cfg.dns_server_url.clone(),
        cfg.dns_server_api_token.clone(),
        http.clone(),
        retry,
    );
    let dashboard = DashboardClient::new(
        cfg.service_tracker_url.clone(),
        cfg.service_tracker_api_token.clone(),
        http,
        retry,
    );
    let arming = ArmingTable::with_overrides(cfg.dns_triggers.clone(), cfg.dashboard_triggers.clone());
    let dispatcher = Arc::new(Dispatcher::new(docker_host, arming, dns, dashboard));

    // No runtime, no agent: connect failure at startup is fatal.
    let runtime = Arc::new(DockerRuntime::connect()?);

    // Reconcile current state before the live sources start layering on top.
    agent::boot_scan(runtime.as_ref(), dispatcher.as_ref()).await?;

    let refresh_handle = tokio::spawn(agent::run_refresh_loop(
        Arc::clone(&runtime),
        Arc::clone(&dispatcher),
        Duration::from_secs(cfg.std_refresh_seconds),
    ));

    let event_handle = tokio::spawn(async move {
        if let Err(e) = agent::run_event_loop(runtime, dispatcher).await {
            error!("Event loop terminated: {}", e);
        }
    });

    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Received Ctrl+C, shutting down...");
        }
        Err(err) => {
            error!("Unable to listen for shutdown signal: {}", err);
        }
    }

    refresh_handle.abort();
    event_handle.abort();

    info!("Shutdown complete.");
    Ok(())
}

fn init_logging(level: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}
