use std::collections::HashSet;

use figment::{
    providers::{Env, Format, Json, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::types::TriggerReason;

#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns_server_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns_server_api_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_tracker_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_tracker_api_token: Option<String>,
    /// Seconds between periodic refresh cycles.
    pub std_refresh_seconds: u64,
    /// Per-request timeout for outbound notifier calls, in seconds.
    pub request_timeout_seconds: u64,
    /// File holding the host's identity; falls back to the OS hostname.
    pub hostname_file: String,
    pub log_level: String,
    /// Arming overrides: which triggers each notifier reacts to. Absent
    /// means the built-in defaults. Accepts an array or a comma-separated
    /// string (the natural form for environment variables).
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "trigger_set")]
    pub dns_triggers: Option<HashSet<TriggerReason>>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "trigger_set")]
    pub dashboard_triggers: Option<HashSet<TriggerReason>>,
}

/// Deserialize a trigger set from either `["boot", "start"]` or
/// `"boot,start"`. Unknown trigger names are configuration errors, unlike
/// unknown notifier tokens in container labels.
fn trigger_set<'de, D>(deserializer: D) -> Result<Option<HashSet<TriggerReason>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        List(HashSet<TriggerReason>),
        Csv(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::List(set)) => Ok(Some(set)),
        Some(Raw::Csv(raw)) => {
            let mut set = HashSet::new();
            for token in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
                let trigger = TriggerReason::ALL
                    .into_iter()
                    .find(|t| t.as_str() == token)
                    .ok_or_else(|| {
                        serde::de::Error::custom(format!("unknown trigger: {}", token))
                    })?;
                set.insert(trigger);
            }
            Ok(Some(set))
        }
    }
}

// Manual Debug: the config is logged at startup and must not leak the API
// tokens.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("dns_server_url", &self.dns_server_url)
            .field("dns_server_api_token", &self.dns_server_api_token.as_ref().map(|_| "<redacted>"))
            .field("service_tracker_url", &self.service_tracker_url)
            .field(
                "service_tracker_api_token",
                &self.service_tracker_api_token.as_ref().map(|_| "<redacted>"),
            )
            .field("std_refresh_seconds", &self.std_refresh_seconds)
            .field("request_timeout_seconds", &self.request_timeout_seconds)
            .field("hostname_file", &self.hostname_file)
            .field("log_level", &self.log_level)
            .field("dns_triggers", &self.dns_triggers)
            .field("dashboard_triggers", &self.dashboard_triggers)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dns_server_url: None,
            dns_server_api_token: None,
            service_tracker_url: None,
            service_tracker_api_token: None,
            std_refresh_seconds: 60,
            request_timeout_seconds: 10,
            hostname_file: "/etc/host_hostname".into(),
            log_level: "info".into(),
            dns_triggers: None,
            dashboard_triggers: None,
        }
    }
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let config: Config = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file("docker-api-notifier.toml"))
            .merge(Json::file("docker-api-notifier.json"))
            .merge(Env::raw().only(&[
                "DNS_SERVER_URL",
                "DNS_SERVER_API_TOKEN",
                "SERVICE_TRACKER_URL",
                "SERVICE_TRACKER_API_TOKEN",
                "STD_REFRESH_SECONDS",
                "REQUEST_TIMEOUT_SECONDS",
                "HOSTNAME_FILE",
                "LOG_LEVEL",
                "DNS_TRIGGERS",
                "DASHBOARD_TRIGGERS",
            ]))
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;
        Ok(config)
    }

    /// Host identity: the mounted hostname file wins (the usual setup when
    /// running containerised, where the agent's own hostname is useless),
    /// then the OS-reported hostname.
    pub fn docker_host(&self) -> String {
        if let Ok(contents) = std::fs::read_to_string(&self.hostname_file) {
            let trimmed = contents.trim();
            if !trimmed.is_empty() {
                return trimmed.to_string();
            }
        }
        if let Ok(hostname) = std::env::var("HOSTNAME") {
            if !hostname.is_empty() {
                return hostname;
            }
        }
        std::fs::read_to_string("/proc/sys/kernel/hostname")
            .map(|s| s.trim().to_string())
            .unwrap_or_else(|_| "unknown-host".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = Config::default();
        assert_eq!(cfg.std_refresh_seconds, 60);
        assert_eq!(cfg.request_timeout_seconds, 10);
        assert_eq!(cfg.hostname_file, "/etc/host_hostname");
        assert!(cfg.dns_server_url.is_none());
        assert!(cfg.dns_triggers.is_none());
    }

    #[test]
    fn docker_host_reads_mounted_file_first() {
        let path = std::env::temp_dir().join("docker-api-notifier-host-test");
        std::fs::write(&path, "node1\n").unwrap();
        let cfg = Config {
            hostname_file: path.to_string_lossy().into_owned(),
            ..Config::default()
        };
        assert_eq!(cfg.docker_host(), "node1");
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn trigger_overrides_accept_comma_separated_strings() {
        let cfg: Config = serde_json::from_value(serde_json::json!({
            "dns_triggers": "boot, start",
            "dashboard_triggers": ["stop", "die"],
        }))
        .unwrap();
        assert_eq!(
            cfg.dns_triggers,
            Some([TriggerReason::Boot, TriggerReason::Start].into_iter().collect())
        );
        assert_eq!(
            cfg.dashboard_triggers,
            Some([TriggerReason::Stop, TriggerReason::Die].into_iter().collect())
        );
    }

    #[test]
    fn unknown_trigger_name_is_a_config_error() {
        let result: Result<Config, _> = serde_json::from_value(serde_json::json!({
            "dns_triggers": "boot,reboot",
        }));
        assert!(result.is_err());
    }

    #[test]
    fn debug_output_redacts_api_tokens() {
        let cfg = Config {
            dns_server_api_token: Some("dns-secret".into()),
            service_tracker_api_token: Some("tracker-secret".into()),
            ..Config::default()
        };
        let rendered = format!("{:?}", cfg);
        assert!(!rendered.contains("dns-secret"));
        assert!(!rendered.contains("tracker-secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn docker_host_falls_back_when_file_missing() {
        let cfg = Config {
            hostname_file: "/nonexistent/host_hostname".into(),
            ..Config::default()
        };
        // Some hostname always comes back, never an empty string.
        assert!(!cfg.docker_host().is_empty());
    }
}
