//! Label resolution: container metadata in, typed notifier intents out.
//!
//! Pure and total. Absent or malformed labels degrade to "notifier not
//! applicable"; nothing in here performs I/O or returns an error.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::types::{
    ContainerSnapshot, DashboardIntent, DnsIntent, DnsResolution, NotifierName, ResolvedIntents,
    TriggerReason, DNS_DOMAIN_LABEL, DNS_HOSTNAME_LABEL, DNS_ZONE_LABEL, NOTIFIERS_LABEL,
    STD_LABEL_PREFIX,
};

/// Resolve one container into per-notifier intents.
///
/// `now` is the resolution timestamp; it is the only field that varies
/// between two resolutions of the same snapshot.
pub fn resolve(
    snapshot: &ContainerSnapshot,
    docker_host: &str,
    trigger: TriggerReason,
    now: DateTime<Utc>,
) -> ResolvedIntents {
    let enabled = enabled_notifiers(snapshot);
    if enabled.is_empty() {
        return ResolvedIntents::default();
    }

    let timestamp = now.to_rfc3339();
    let mut intents = ResolvedIntents::default();

    if enabled.contains(&NotifierName::Dns) {
        intents.dns = Some(resolve_dns(snapshot, docker_host, &timestamp));
    }
    if enabled.contains(&NotifierName::ServiceTrackerDashboard) {
        intents.dashboard = Some(resolve_dashboard(snapshot, docker_host, trigger, &timestamp));
    }
    intents
}

/// Parse the `dockernotifier.notifiers` label: comma-separated, trimmed,
/// empty tokens dropped, duplicates collapsed, unknown names ignored.
fn enabled_notifiers(snapshot: &ContainerSnapshot) -> HashSet<NotifierName> {
    snapshot
        .label(NOTIFIERS_LABEL)
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .filter_map(NotifierName::from_token)
                .collect()
        })
        .unwrap_or_default()
}

fn resolve_dns(snapshot: &ContainerSnapshot, docker_host: &str, timestamp: &str) -> DnsResolution {
    let hostname = snapshot.label(DNS_HOSTNAME_LABEL);
    let zone = snapshot.label(DNS_ZONE_LABEL);
    let domain = snapshot.label(DNS_DOMAIN_LABEL);

    match (hostname, zone, domain) {
        (Some(hostname), Some(zone), Some(domain)) => DnsResolution::Ready(DnsIntent {
            fqdn: format!("{}.{}", hostname, zone),
            zone: zone.to_string(),
            value: format!("{}.{}", docker_host, domain),
            container_name: snapshot.name.clone(),
            docker_host: docker_host.to_string(),
            stack_name: snapshot.stack_name(),
            timestamp: timestamp.to_string(),
        }),
        _ => DnsResolution::MissingLabels,
    }
}

fn resolve_dashboard(
    snapshot: &ContainerSnapshot,
    docker_host: &str,
    trigger: TriggerReason,
    timestamp: &str,
) -> DashboardIntent {
    let mut payload = DashboardIntent::new();
    payload.insert("host".into(), docker_host.to_string());
    payload.insert("container_name".into(), snapshot.name.clone());
    payload.insert("container_id".into(), snapshot.id.clone());
    payload.insert("docker_status".into(), trigger.to_string());
    payload.insert("timestamp".into(), timestamp.to_string());
    if let Some(image) = &snapshot.image {
        payload.insert("image".into(), image.clone());
    }
    if let Some(stack) = snapshot.stack_name() {
        payload.insert("stack_name".into(), stack);
    }
    if let Some(started_at) = &snapshot.started_at {
        payload.insert("started_at".into(), started_at.clone());
    }

    // Dynamic fields: any dockernotifier.std.* label, prefix stripped,
    // forwarded verbatim. New dashboard fields need no code change here.
    for (key, value) in &snapshot.labels {
        if let Some(stripped) = key.strip_prefix(STD_LABEL_PREFIX) {
            if !stripped.is_empty() && !value.is_empty() {
                payload.insert(stripped.to_string(), value.clone());
            }
        }
    }
    payload
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashMap;

    fn snapshot(name: &str, labels: &[(&str, &str)]) -> ContainerSnapshot {
        ContainerSnapshot {
            id: "deadbeef".into(),
            name: name.into(),
            image: Some("nginx:latest".into()),
            status: Some("running".into()),
            started_at: Some("2026-08-30T10:00:00Z".into()),
            labels: labels
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 30, 12, 0, 0).unwrap()
    }

    #[test]
    fn no_notifiers_label_resolves_to_nothing() {
        let snap = snapshot("web_1", &[]);
        let intents = resolve(&snap, "node1", TriggerReason::Start, fixed_now());
        assert!(intents.is_empty());
    }

    #[test]
    fn unknown_tokens_are_ignored_not_errors() {
        let snap = snapshot("web_1", &[(NOTIFIERS_LABEL, "slack, , pagerduty,")]);
        let intents = resolve(&snap, "node1", TriggerReason::Start, fixed_now());
        assert!(intents.is_empty());
    }

    #[test]
    fn duplicate_and_padded_tokens_collapse() {
        let snap = snapshot(
            "web_1",
            &[
                (NOTIFIERS_LABEL, " dns , dns ,service-tracker-dashboard"),
                (DNS_HOSTNAME_LABEL, "api"),
                (DNS_ZONE_LABEL, "internal.example.com"),
                (DNS_DOMAIN_LABEL, "example.com"),
            ],
        );
        let intents = resolve(&snap, "node1", TriggerReason::Start, fixed_now());
        assert!(matches!(intents.dns, Some(DnsResolution::Ready(_))));
        assert!(intents.dashboard.is_some());
    }

    #[test]
    fn dns_missing_any_label_marks_skip() {
        for missing in [DNS_HOSTNAME_LABEL, DNS_ZONE_LABEL, DNS_DOMAIN_LABEL] {
            let labels: Vec<(&str, &str)> = [
                (NOTIFIERS_LABEL, "dns"),
                (DNS_HOSTNAME_LABEL, "api"),
                (DNS_ZONE_LABEL, "internal.example.com"),
                (DNS_DOMAIN_LABEL, "example.com"),
            ]
            .into_iter()
            .filter(|(k, _)| *k != missing)
            .collect();
            let snap = snapshot("web_1", &labels);
            let intents = resolve(&snap, "node1", TriggerReason::Start, fixed_now());
            assert_eq!(intents.dns, Some(DnsResolution::MissingLabels), "missing {}", missing);
        }
    }

    #[test]
    fn dns_empty_label_value_counts_as_missing() {
        let snap = snapshot(
            "web_1",
            &[
                (NOTIFIERS_LABEL, "dns"),
                (DNS_HOSTNAME_LABEL, "api"),
                (DNS_ZONE_LABEL, ""),
                (DNS_DOMAIN_LABEL, "example.com"),
            ],
        );
        let intents = resolve(&snap, "node1", TriggerReason::Start, fixed_now());
        assert_eq!(intents.dns, Some(DnsResolution::MissingLabels));
    }

    #[test]
    fn dns_intent_builds_fqdn_and_value() {
        let snap = snapshot(
            "web_1",
            &[
                (NOTIFIERS_LABEL, "dns,service-tracker-dashboard"),
                (DNS_HOSTNAME_LABEL, "api"),
                (DNS_ZONE_LABEL, "internal.example.com"),
                (DNS_DOMAIN_LABEL, "example.com"),
            ],
        );
        let intents = resolve(&snap, "node1", TriggerReason::Start, fixed_now());
        let Some(DnsResolution::Ready(intent)) = intents.dns else {
            panic!("expected a ready DNS intent");
        };
        assert_eq!(intent.fqdn, "api.internal.example.com");
        assert_eq!(intent.zone, "internal.example.com");
        assert_eq!(intent.value, "node1.example.com");
        assert_eq!(intent.docker_host, "node1");
        assert_eq!(intent.stack_name, Some("web".to_string()));

        let dashboard = intents.dashboard.expect("dashboard enabled");
        assert_eq!(dashboard.get("container_name").map(String::as_str), Some("web_1"));
        assert_eq!(dashboard.get("host").map(String::as_str), Some("node1"));
        assert_eq!(dashboard.get("docker_status").map(String::as_str), Some("start"));
        // No std.* labels present, so no dynamic keys leak in.
        assert!(!dashboard.keys().any(|k| k.contains("url") || k.contains("health")));
    }

    #[test]
    fn dashboard_merges_stripped_std_labels() {
        let snap = snapshot(
            "myapp_web_1",
            &[
                (NOTIFIERS_LABEL, "service-tracker-dashboard"),
                ("dockernotifier.std.internalurl", "http://10.0.0.5:8080"),
                ("dockernotifier.std.internal.health", "http://10.0.0.5:8080/healthz"),
                ("dockernotifier.std.group", "frontend"),
            ],
        );
        let intents = resolve(&snap, "node1", TriggerReason::Refresh, fixed_now());
        let payload = intents.dashboard.expect("dashboard enabled");
        assert_eq!(payload.get("internalurl").map(String::as_str), Some("http://10.0.0.5:8080"));
        assert_eq!(
            payload.get("internal.health").map(String::as_str),
            Some("http://10.0.0.5:8080/healthz")
        );
        assert_eq!(payload.get("group").map(String::as_str), Some("frontend"));
        assert_eq!(payload.get("stack_name").map(String::as_str), Some("myapp"));
        assert_eq!(payload.get("docker_status").map(String::as_str), Some("refresh"));
        assert!(intents.dns.is_none());
    }

    #[test]
    fn absent_optionals_are_omitted_entirely() {
        let snap = ContainerSnapshot {
            id: "deadbeef".into(),
            name: "solo".into(),
            image: None,
            status: None,
            started_at: None,
            labels: HashMap::from([(
                NOTIFIERS_LABEL.to_string(),
                "service-tracker-dashboard".to_string(),
            )]),
        };
        let intents = resolve(&snap, "node1", TriggerReason::Boot, fixed_now());
        let payload = intents.dashboard.expect("dashboard enabled");
        assert!(!payload.contains_key("image"));
        assert!(!payload.contains_key("stack_name"));
        assert!(!payload.contains_key("started_at"));
    }

    #[test]
    fn resolution_is_deterministic_at_fixed_time() {
        let snap = snapshot(
            "web_1",
            &[
                (NOTIFIERS_LABEL, "dns,service-tracker-dashboard"),
                (DNS_HOSTNAME_LABEL, "api"),
                (DNS_ZONE_LABEL, "internal.example.com"),
                (DNS_DOMAIN_LABEL, "example.com"),
            ],
        );
        let a = resolve(&snap, "node1", TriggerReason::Start, fixed_now());
        let b = resolve(&snap, "node1", TriggerReason::Start, fixed_now());
        assert_eq!(a, b);
    }
}
