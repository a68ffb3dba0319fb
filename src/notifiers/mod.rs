//! Outbound notifier clients.
//!
//! Each client takes a typed payload resolved from container labels and
//! delivers it to its external endpoint. Clients share no state with each
//! other and report their result back to the dispatcher; they never panic
//! and never retry beyond the bounded policy.

use reqwest::StatusCode;
use thiserror::Error;

pub mod dashboard;
pub mod dns;

pub use dashboard::DashboardClient;
pub use dns::DnsClient;

/// Delivery error after the retry budget is exhausted.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("endpoint returned status {status}")]
    Status { status: StatusCode },
}

/// Result of one delivery attempt chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    /// Endpoint or token not configured; the notifier is a permanent no-op.
    Unconfigured,
}
