//! HTTP clients for the remote services the calendar depends on.
//!
//! Each client wraps a shared `reqwest::Client` configured with the network
//! timeouts from [`NetworkConfig`], and reports failures as `anyhow` errors
//! that the calendar service turns into degraded state.

use std::time::Duration;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;

use crate::config::NetworkConfig;

pub mod geocode;
pub mod hebcal;
pub mod store;
pub mod weather;

pub use geocode::NominatimClient;
pub use hebcal::{HebcalClient, Holiday, ShabbatTimes, parse_clock_time};
pub use store::{EventCache, FirebaseStore, SseEvent, SseParser};
pub use weather::{DailyForecast, DayWeather, OpenMeteoClient, describe_weather};

/// Build an HTTP client with the configured timeouts and user agent.
pub fn http_client(network_config: &NetworkConfig, user_agent: &str) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(network_config.request_timeout_secs))
        .connect_timeout(Duration::from_secs(network_config.connect_timeout_secs))
        .user_agent(user_agent)
        .build()
        .context("Failed to create HTTP client")
}

/// Send a prepared request and decode its JSON body, failing on non-2xx.
pub(crate) async fn fetch_json<T: DeserializeOwned>(
    request: reqwest::RequestBuilder,
    service: &str,
) -> Result<T> {
    let response = request
        .send()
        .await
        .with_context(|| format!("Failed to send request to {service}"))?;

    let status = response.status();
    if !status.is_success() {
        anyhow::bail!("{} returned error status: {}", service, status);
    }

    response
        .json::<T>()
        .await
        .with_context(|| format!("Failed to parse {service} response"))
}

/// Join a base URL and a path without doubling slashes.
pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
