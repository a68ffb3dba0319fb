//! Dispatch: one (container, trigger) pair fanned out to the enabled
//! notifiers, with per-notifier failure isolation.
//!
//! The dispatcher never returns an error. A notifier failure after its
//! retries is logged and recorded as a failed outcome; it cannot block the
//! other notifier or propagate to the event sources. Re-dispatching the
//! same snapshot with unchanged labels produces the same external calls
//! (timestamp aside), which is what makes the boot scan and the periodic
//! refresh safe against already-registered containers.

use std::collections::HashSet;

use chrono::Utc;
use log::{info, warn};

use crate::notifiers::{DashboardClient, Delivery, DnsClient};
use crate::resolver;
use crate::types::{
    ContainerSnapshot, DnsResolution, NotificationOutcome, NotifierName, OutcomeStatus,
    SkipReason, TriggerReason,
};

/// Per-notifier set of trigger reasons it reacts to. Explicit and
/// config-overridable rather than hard-coded into each client.
#[derive(Debug, Clone)]
pub struct ArmingTable {
    dns: HashSet<TriggerReason>,
    dashboard: HashSet<TriggerReason>,
}

impl Default for ArmingTable {
    fn default() -> Self {
        Self {
            // DNS records only need (re)publishing when a container comes up
            // or on a reconciliation pass.
            dns: [TriggerReason::Boot, TriggerReason::Start, TriggerReason::Refresh]
                .into_iter()
                .collect(),
            // The dashboard tracks every lifecycle transition.
            dashboard: TriggerReason::ALL.into_iter().collect(),
        }
    }
}

impl ArmingTable {
    pub fn new(dns: HashSet<TriggerReason>, dashboard: HashSet<TriggerReason>) -> Self {
        Self { dns, dashboard }
    }

    /// Defaults with per-notifier overrides from configuration.
    pub fn with_overrides(
        dns: Option<HashSet<TriggerReason>>,
        dashboard: Option<HashSet<TriggerReason>>,
    ) -> Self {
        let default = Self::default();
        Self {
            dns: dns.unwrap_or(default.dns),
            dashboard: dashboard.unwrap_or(default.dashboard),
        }
    }

    pub fn is_armed(&self, notifier: NotifierName, trigger: TriggerReason) -> bool {
        match notifier {
            NotifierName::Dns => self.dns.contains(&trigger),
            NotifierName::ServiceTrackerDashboard => self.dashboard.contains(&trigger),
        }
    }
}

pub struct Dispatcher {
    docker_host: String,
    arming: ArmingTable,
    dns: DnsClient,
    dashboard: DashboardClient,
}

impl Dispatcher {
    pub fn new(
        docker_host: String,
        arming: ArmingTable,
        dns: DnsClient,
        dashboard: DashboardClient,
    ) -> Self {
        Self { docker_host, arming, dns, dashboard }
    }

    /// Resolve intents once and deliver to each armed notifier.
    pub async fn dispatch(
        &self,
        snapshot: &ContainerSnapshot,
        trigger: TriggerReason,
    ) -> Vec<NotificationOutcome> {
        let intents = resolver::resolve(snapshot, &self.docker_host, trigger, Utc::now());
        if intents.is_empty() {
            return Vec::new();
        }
        info!(
            "[MATCH] Container {}: {} (status: {})",
            trigger,
            snapshot.name,
            snapshot.status.as_deref().unwrap_or("unknown")
        );

        let mut outcomes = Vec::new();

        if let Some(resolution) = intents.dns {
            let status = if !self.arming.is_armed(NotifierName::Dns, trigger) {
                OutcomeStatus::Skipped(SkipReason::NotArmed)
            } else {
                match resolution {
                    DnsResolution::MissingLabels => {
                        warn!(
                            "Container {} enables dns but is missing hostname/zone/domain labels, skipping",
                            snapshot.name
                        );
                        OutcomeStatus::Skipped(SkipReason::MissingLabels)
                    }
                    DnsResolution::Ready(intent) => match self.dns.deliver(&intent).await {
                        Ok(Delivery::Delivered) => OutcomeStatus::Delivered,
                        Ok(Delivery::Unconfigured) => OutcomeStatus::Skipped(SkipReason::Unconfigured),
                        Err(err) => OutcomeStatus::Failed(err.to_string()),
                    },
                }
            };
            outcomes.push(NotificationOutcome { notifier: NotifierName::Dns, status });
        }

        if let Some(payload) = intents.dashboard {
            let status = if !self.arming.is_armed(NotifierName::ServiceTrackerDashboard, trigger) {
                OutcomeStatus::Skipped(SkipReason::NotArmed)
            } else {
                match self.dashboard.deliver(&payload).await {
                    Ok(Delivery::Delivered) => OutcomeStatus::Delivered,
                    Ok(Delivery::Unconfigured) => OutcomeStatus::Skipped(SkipReason::Unconfigured),
                    Err(err) => OutcomeStatus::Failed(err.to_string()),
                }
            };
            outcomes.push(NotificationOutcome {
                notifier: NotifierName::ServiceTrackerDashboard,
                status,
            });
        }

        for outcome in &outcomes {
            match &outcome.status {
                OutcomeStatus::Delivered => info!(
                    "Notified {} for {} ({})",
                    outcome.notifier, snapshot.name, trigger
                ),
                OutcomeStatus::Skipped(reason) => info!(
                    "Skipped {} for {} ({}): {}",
                    outcome.notifier, snapshot.name, trigger, reason
                ),
                OutcomeStatus::Failed(err) => warn!(
                    "Notifier {} failed for {} ({}): {}",
                    outcome.notifier, snapshot.name, trigger, err
                ),
            }
        }
        outcomes
    }
}
