mod attendance;
mod rest;

pub use attendance::{decode_attendance_response, AttendanceClient};
pub use rest::{decode_assignment_rows, RestClient};

use crate::config::Config;
use anyhow::{Context, Result};

/// HTTP client shared by both collaborators, carrying the configured timeouts.
pub fn build_http_client(config: &Config) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(config.request_timeout)
        .connect_timeout(config.connect_timeout)
        .user_agent(concat!("parent-dashboard/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")
}
