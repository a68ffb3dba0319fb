//! Service-tracker dashboard client.
//!
//! Registers container presence by POSTing the resolved field mapping to
//! the dashboard's `/api/register` endpoint with bearer-token auth.

use log::{debug, error, info};
use reqwest::Client;

use crate::retry::RetryPolicy;
use crate::types::DashboardIntent;

use super::{Delivery, NotifyError};

pub struct DashboardClient {
    endpoint: Option<Endpoint>,
    http: Client,
    retry: RetryPolicy,
}

struct Endpoint {
    register_url: String,
    token: String,
}

impl DashboardClient {
    pub fn new(url: Option<String>, token: Option<String>, http: Client, retry: RetryPolicy) -> Self {
        let endpoint = match (url, token) {
            (Some(url), Some(token)) if !url.is_empty() && !token.is_empty() => Some(Endpoint {
                register_url: format!("{}/api/register", url.trim_end_matches('/')),
                token,
            }),
            _ => None,
        };
        Self { endpoint, http, retry }
    }

    pub async fn deliver(&self, payload: &DashboardIntent) -> Result<Delivery, NotifyError> {
        let container = payload.get("container_name").map(String::as_str).unwrap_or("?");
        let host = payload.get("host").map(String::as_str).unwrap_or("?");

        let Some(endpoint) = &self.endpoint else {
            info!(
                "Service tracker dashboard disabled (missing SERVICE_TRACKER_URL or SERVICE_TRACKER_API_TOKEN), skipping {}",
                container
            );
            return Ok(Delivery::Unconfigured);
        };

        debug!(
            "Registering {} with payload: {}",
            container,
            serde_json::to_string(payload).unwrap_or_default()
        );

        let result = self
            .retry
            .run("dashboard registration", || {
                let request = self
                    .http
                    .post(&endpoint.register_url)
                    .bearer_auth(&endpoint.token)
                    .json(payload);
                async move {
                    let response = request.send().await?;
                    let status = response.status();
                    if !status.is_success() {
                        return Err(NotifyError::Status { status });
                    }
                    let body = response.text().await.unwrap_or_default();
                    debug!("service-tracker-dashboard response: {} {}", status, body);
                    Ok(())
                }
            })
            .await;

        match result {
            Ok(()) => {
                info!("Dashboard registration sent for {} on {}", container, host);
                Ok(Delivery::Delivered)
            }
            Err(err) => {
                error!(
                    "Failed to notify service-tracker-dashboard for {} on {}: {}",
                    container, host, err
                );
                Err(err)
            }
        }
    }
}
