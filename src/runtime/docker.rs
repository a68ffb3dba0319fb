use super::{ContainerEvent, ContainerRuntime};
use crate::types::{ContainerSnapshot, TriggerReason};
use anyhow::{Context, Result};
use async_trait::async_trait;
use bollard::container::ListContainersOptions;
use bollard::models::ContainerInspectResponse;
use bollard::system::EventsOptions;
use bollard::Docker;
use futures_util::stream::StreamExt;
use log::{debug, error, warn};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::sleep;

/// Delay before resubscribing after the event stream drops.
const RECONNECT_DELAY: Duration = Duration::from_secs(2);

pub struct DockerRuntime {
    docker: Docker,
}

impl DockerRuntime {
    /// Connect to the local Docker daemon (unix socket on Linux). Failure
    /// here is fatal to the agent; there is nothing to notify without it.
    pub fn connect() -> Result<Self> {
        let docker = Docker::connect_with_local_defaults()
            .context("failed to connect to the Docker daemon")?;
        Ok(Self { docker })
    }

    fn snapshot_from_inspect(detail: ContainerInspectResponse) -> Option<ContainerSnapshot> {
        let id = detail.id?;
        let name = detail
            .name
            .map(|n| n.trim_start_matches('/').to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| id.clone());
        let (image, labels) = detail
            .config
            .map(|c| (c.image, c.labels.unwrap_or_default()))
            .unwrap_or_default();
        let (status, started_at) = detail
            .state
            .map(|s| (s.status.map(|st| st.to_string()), s.started_at))
            .unwrap_or_default();
        Some(ContainerSnapshot { id, name, image, status, started_at, labels })
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn running_containers(&self) -> Result<Vec<ContainerSnapshot>> {
        let opts = ListContainersOptions::<String> {
            all: false,
            ..Default::default()
        };
        let containers = self
            .docker
            .list_containers(Some(opts))
            .await
            .context("failed to list running containers")?;

        let mut snapshots = Vec::with_capacity(containers.len());
        for summary in containers {
            let Some(id) = summary.id else { continue };
            // Inspect each container for the full label map and state; the
            // list response only carries a summary.
            match self.docker.inspect_container(&id, None).await {
                Ok(detail) => {
                    if let Some(snapshot) = Self::snapshot_from_inspect(detail) {
                        snapshots.push(snapshot);
                    }
                }
                Err(e) => {
                    warn!("Failed to inspect container {}: {}", id, e);
                }
            }
        }
        Ok(snapshots)
    }

    async fn snapshot(&self, id: &str) -> Result<ContainerSnapshot> {
        let detail = self
            .docker
            .inspect_container(id, None)
            .await
            .with_context(|| format!("failed to inspect container {}", id))?;
        Self::snapshot_from_inspect(detail)
            .with_context(|| format!("container {} has no id in inspect response", id))
    }

    async fn watch_events(&self, event_tx: mpsc::Sender<ContainerEvent>) -> Result<()> {
        let watched: Vec<String> = TriggerReason::WATCHED_ACTIONS
            .iter()
            .map(|t| t.to_string())
            .collect();

        loop {
            let opts = EventsOptions::<String> {
                filters: [
                    ("type".to_string(), vec!["container".to_string()]),
                    ("event".to_string(), watched.clone()),
                ]
                .into_iter()
                .collect(),
                ..Default::default()
            };

            let mut stream = self.docker.events(Some(opts));
            debug!("Listening for Docker container events...");

            while let Some(msg) = stream.next().await {
                match msg {
                    Ok(event) => {
                        let Some(action) = event.action else { continue };
                        // The server-side filter already narrows events, but
                        // the action set is re-checked at this boundary.
                        let Some(trigger) = TriggerReason::from_action(&action) else {
                            continue;
                        };
                        let Some(container_id) = event.actor.and_then(|a| a.id) else {
                            continue;
                        };
                        debug!("Container event: {} for {}", trigger, container_id);
                        if event_tx
                            .send(ContainerEvent { container_id, trigger })
                            .await
                            .is_err()
                        {
                            return Err(anyhow::anyhow!("event channel closed"));
                        }
                    }
                    Err(e) => {
                        error!("Error in Docker event stream: {}", e);
                        break;
                    }
                }
            }

            warn!(
                "Docker event stream ended. Reconnecting in {:?}...",
                RECONNECT_DELAY
            );
            sleep(RECONNECT_DELAY).await;
        }
    }
}
