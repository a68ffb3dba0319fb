//! DNS notifier client.
//!
//! Upserts a CNAME record via the provider's HTTP API (Technitium-style:
//! a GET with query parameters). Record type, TTL and overwrite semantics
//! are fixed; the comment embeds the owning container, stack and host so
//! an operator can tell where a record came from.

use log::{debug, error, info};
use reqwest::Client;

use crate::retry::RetryPolicy;
use crate::types::DnsIntent;

use super::{Delivery, NotifyError};

const RECORD_TYPE: &str = "CNAME";
const RECORD_TTL: &str = "300";

pub struct DnsClient {
    endpoint: Option<Endpoint>,
    http: Client,
    retry: RetryPolicy,
}

struct Endpoint {
    url: String,
    token: String,
}

impl DnsClient {
    /// `url`/`token` may be absent; the client then runs in no-op mode and
    /// reports every delivery as unconfigured.
    pub fn new(url: Option<String>, token: Option<String>, http: Client, retry: RetryPolicy) -> Self {
        let endpoint = match (url, token) {
            (Some(url), Some(token)) if !url.is_empty() && !token.is_empty() => {
                Some(Endpoint { url, token })
            }
            _ => None,
        };
        Self { endpoint, http, retry }
    }

    pub async fn deliver(&self, intent: &DnsIntent) -> Result<Delivery, NotifyError> {
        let Some(endpoint) = &self.endpoint else {
            info!(
                "DNS notifier disabled (missing DNS_SERVER_URL or DNS_SERVER_API_TOKEN), skipping {}",
                intent.fqdn
            );
            return Ok(Delivery::Unconfigured);
        };

        let comment = match &intent.stack_name {
            Some(stack) => format!(
                "Added by docker-api-notifier for {} (stack: {}) at {} for {}",
                intent.container_name, stack, intent.timestamp, intent.docker_host
            ),
            None => format!(
                "Added by docker-api-notifier for {} at {} for {}",
                intent.container_name, intent.timestamp, intent.docker_host
            ),
        };

        let result = self
            .retry
            .run("DNS update", || {
                let request = self
                    .http
                    .get(&endpoint.url)
                    .query(&[
                        ("token", endpoint.token.as_str()),
                        ("domain", intent.fqdn.as_str()),
                        ("zone", intent.zone.as_str()),
                        ("type", RECORD_TYPE),
                        ("ttl", RECORD_TTL),
                        ("overwrite", "true"),
                        ("value", intent.value.as_str()),
                        ("comments", comment.as_str()),
                    ]);
                async move {
                    let response = request.send().await?;
                    let status = response.status();
                    if !status.is_success() {
                        return Err(NotifyError::Status { status });
                    }
                    let body = response.text().await.unwrap_or_default();
                    debug!("DNS update response for this record: {}", body);
                    Ok(())
                }
            })
            .await;

        match result {
            Ok(()) => {
                info!(
                    "DNS record upserted: {} -> {} (container {})",
                    intent.fqdn, intent.value, intent.container_name
                );
                Ok(Delivery::Delivered)
            }
            Err(err) => {
                error!(
                    "DNS update failed for {} (container {}): {}",
                    intent.fqdn, intent.container_name, err
                );
                Err(err)
            }
        }
    }
}
