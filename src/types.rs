//! Data structures shared across the notifier pipeline.
//!
//! Everything here is a value object: built fresh for one dispatch,
//! consumed, and dropped. No cross-call shared mutable state.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

/// Label carrying the comma-separated list of enabled notifiers.
pub const NOTIFIERS_LABEL: &str = "dockernotifier.notifiers";
/// Labels required for DNS registration.
pub const DNS_HOSTNAME_LABEL: &str = "dockernotifier.dns.containerhostname";
pub const DNS_ZONE_LABEL: &str = "dockernotifier.dns.containerzone";
pub const DNS_DOMAIN_LABEL: &str = "dockernotifier.dns.dockerdomain";
/// Compose project label used for stack-name derivation.
pub const COMPOSE_PROJECT_LABEL: &str = "com.docker.compose.project";
/// Prefix for labels forwarded verbatim (prefix stripped) to the dashboard.
pub const STD_LABEL_PREFIX: &str = "dockernotifier.std.";

/// Immutable view of one container at observation time.
#[derive(Debug, Clone)]
pub struct ContainerSnapshot {
    pub id: String,
    pub name: String,
    pub image: Option<String>,
    pub status: Option<String>,
    pub started_at: Option<String>,
    pub labels: HashMap<String, String>,
}

impl ContainerSnapshot {
    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str).filter(|v| !v.is_empty())
    }

    /// Logical stack name: the explicit compose-project label wins, else the
    /// container-name prefix up to the first `_`, else none.
    pub fn stack_name(&self) -> Option<String> {
        if let Some(project) = self.label(COMPOSE_PROJECT_LABEL) {
            return Some(project.to_string());
        }
        self.name
            .split_once('_')
            .map(|(prefix, _)| prefix.to_string())
            .filter(|p| !p.is_empty())
    }
}

/// The closed set of supported notifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotifierName {
    #[serde(rename = "dns")]
    Dns,
    #[serde(rename = "service-tracker-dashboard")]
    ServiceTrackerDashboard,
}

impl NotifierName {
    /// Exact, case-sensitive match against the label token. Unknown tokens
    /// yield `None` and are ignored by the resolver.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "dns" => Some(NotifierName::Dns),
            "service-tracker-dashboard" => Some(NotifierName::ServiceTrackerDashboard),
            _ => None,
        }
    }
}

impl fmt::Display for NotifierName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotifierName::Dns => write!(f, "dns"),
            NotifierName::ServiceTrackerDashboard => write!(f, "service-tracker-dashboard"),
        }
    }
}

/// What caused a dispatch attempt: a lifecycle event, the boot scan, or the
/// periodic refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerReason {
    Boot,
    Start,
    Stop,
    Die,
    Pause,
    Unpause,
    Destroy,
    Kill,
    Update,
    Refresh,
}

impl TriggerReason {
    /// Lifecycle actions watched on the live event stream. `Boot` and
    /// `Refresh` are scan-only and never arrive as events.
    pub const WATCHED_ACTIONS: [TriggerReason; 8] = [
        TriggerReason::Start,
        TriggerReason::Stop,
        TriggerReason::Die,
        TriggerReason::Pause,
        TriggerReason::Unpause,
        TriggerReason::Destroy,
        TriggerReason::Kill,
        TriggerReason::Update,
    ];

    pub const ALL: [TriggerReason; 10] = [
        TriggerReason::Boot,
        TriggerReason::Start,
        TriggerReason::Stop,
        TriggerReason::Die,
        TriggerReason::Pause,
        TriggerReason::Unpause,
        TriggerReason::Destroy,
        TriggerReason::Kill,
        TriggerReason::Update,
        TriggerReason::Refresh,
    ];

    pub fn from_action(action: &str) -> Option<Self> {
        let trigger = match action {
            "start" => TriggerReason::Start,
            "stop" => TriggerReason::Stop,
            "die" => TriggerReason::Die,
            "pause" => TriggerReason::Pause,
            "unpause" => TriggerReason::Unpause,
            "destroy" => TriggerReason::Destroy,
            "kill" => TriggerReason::Kill,
            "update" => TriggerReason::Update,
            _ => return None,
        };
        Some(trigger)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerReason::Boot => "boot",
            TriggerReason::Start => "start",
            TriggerReason::Stop => "stop",
            TriggerReason::Die => "die",
            TriggerReason::Pause => "pause",
            TriggerReason::Unpause => "unpause",
            TriggerReason::Destroy => "destroy",
            TriggerReason::Kill => "kill",
            TriggerReason::Update => "update",
            TriggerReason::Refresh => "refresh",
        }
    }
}

impl fmt::Display for TriggerReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved DNS registration payload. Only constructed when the hostname,
/// zone and domain labels are all present and non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsIntent {
    pub fqdn: String,
    pub zone: String,
    pub value: String,
    pub container_name: String,
    pub docker_host: String,
    pub stack_name: Option<String>,
    pub timestamp: String,
}

/// Resolved dashboard payload: fixed fields merged with every stripped
/// `dockernotifier.std.*` label. Absent optionals are simply not present,
/// so the dashboard never sees spurious empty keys.
pub type DashboardIntent = BTreeMap<String, String>;

/// Outcome of DNS resolution when the notifier is enabled: either a ready
/// intent or a recorded reason to skip this container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DnsResolution {
    Ready(DnsIntent),
    MissingLabels,
}

/// Per-container resolution result: one slot per notifier, `None` when the
/// container did not opt in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedIntents {
    pub dns: Option<DnsResolution>,
    pub dashboard: Option<DashboardIntent>,
}

impl ResolvedIntents {
    pub fn is_empty(&self) -> bool {
        self.dns.is_none() && self.dashboard.is_none()
    }
}

/// Why a notifier was skipped for a given container and trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NotArmed,
    Unconfigured,
    MissingLabels,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NotArmed => write!(f, "not-armed"),
            SkipReason::Unconfigured => write!(f, "unconfigured"),
            SkipReason::MissingLabels => write!(f, "missing-metadata"),
        }
    }
}

/// Per (container, notifier) delivery result. Logged, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationOutcome {
    pub notifier: NotifierName,
    pub status: OutcomeStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutcomeStatus {
    Delivered,
    Skipped(SkipReason),
    Failed(String),
}
