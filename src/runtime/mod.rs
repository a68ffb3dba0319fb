use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::types::{ContainerSnapshot, TriggerReason};

pub mod docker;
pub use docker::DockerRuntime;

/// A watched lifecycle event for one container.
#[derive(Debug, Clone)]
pub struct ContainerEvent {
    pub container_id: String,
    pub trigger: TriggerReason,
}

/// Read-only access to the container runtime, shared by the boot scan,
/// the refresh loop and the event loop.
#[async_trait]
pub trait ContainerRuntime {
    /// Snapshot every currently running container.
    async fn running_containers(&self) -> Result<Vec<ContainerSnapshot>>;

    /// Snapshot one container by id or name.
    async fn snapshot(&self, id: &str) -> Result<ContainerSnapshot>;

    /// Subscribe to the live event stream, sending watched events to the
    /// channel until it closes. Reconnects internally on stream errors.
    async fn watch_events(&self, event_tx: mpsc::Sender<ContainerEvent>) -> Result<()>;
}
