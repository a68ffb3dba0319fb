//! Agent lifecycle: the three event sources feeding the dispatcher.
//!
//! Startup order matters: the boot scan runs to completion first so the
//! external registries reflect current state before live events and
//! periodic refreshes start layering on top. After that the refresh loop
//! and the event loop run concurrently; they share only the read-only
//! runtime handle and the dispatcher, so no coordination is needed.
//!
//! Failure containment: anything that goes wrong for a single container is
//! logged and dropped at this boundary. None of the three sources may die
//! because one container misbehaved.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use log::{error, info, warn};
use tokio::sync::mpsc;
use tokio::time::sleep;

use crate::dispatch::Dispatcher;
use crate::runtime::ContainerRuntime;
use crate::types::TriggerReason;

/// List running containers once and dispatch each with the `boot` trigger.
/// A failure to list at this point is fatal; per-container failures are not.
pub async fn boot_scan<R: ContainerRuntime>(runtime: &R, dispatcher: &Dispatcher) -> Result<()> {
    let containers = runtime.running_containers().await?;
    info!("Boot scan found {} running containers", containers.len());
    for snapshot in containers {
        dispatcher.dispatch(&snapshot, TriggerReason::Boot).await;
    }
    Ok(())
}

/// One pass of the periodic refresh: re-list running containers and
/// dispatch each with the `refresh` trigger. Factored out of the loop so
/// a test can drive a single cycle without sleeping.
pub async fn refresh_cycle<R: ContainerRuntime>(runtime: &R, dispatcher: &Dispatcher) {
    match runtime.running_containers().await {
        Ok(containers) => {
            for snapshot in containers {
                dispatcher.dispatch(&snapshot, TriggerReason::Refresh).await;
            }
        }
        Err(e) => {
            warn!("Refresh cycle failed to list containers: {}", e);
        }
    }
}

/// Run refresh cycles forever, sleeping `interval` between them.
pub async fn run_refresh_loop<R: ContainerRuntime>(
    runtime: Arc<R>,
    dispatcher: Arc<Dispatcher>,
    interval: Duration,
) {
    info!("Refresh loop started (every {:?})", interval);
    loop {
        sleep(interval).await;
        refresh_cycle(runtime.as_ref(), dispatcher.as_ref()).await;
    }
}

/// Consume the live event stream: inspect each watched event's container
/// and dispatch with the event's action as the trigger. Runs until the
/// event channel closes.
pub async fn run_event_loop<R>(runtime: Arc<R>, dispatcher: Arc<Dispatcher>) -> Result<()>
where
    R: ContainerRuntime + Send + Sync + 'static,
{
    let (event_tx, mut event_rx) = mpsc::channel(128);

    let watcher = {
        let runtime = Arc::clone(&runtime);
        tokio::spawn(async move {
            if let Err(e) = runtime.watch_events(event_tx).await {
                error!("Event subscription failed: {}", e);
            }
        })
    };

    while let Some(event) = event_rx.recv().await {
        // The container may have vanished between the event and the
        // inspect (destroy/die races). Log and keep consuming.
        match runtime.snapshot(&event.container_id).await {
            Ok(snapshot) => {
                dispatcher.dispatch(&snapshot, event.trigger).await;
            }
            Err(e) => {
                warn!(
                    "Failed to handle {} event for {}: {}",
                    event.trigger, event.container_id, e
                );
            }
        }
    }

    watcher.abort();
    Err(anyhow::anyhow!("event stream closed"))
}
