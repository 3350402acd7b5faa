//! Monitoring Client
//!
//! Client handle for the OCI Monitoring API, combining request signing and
//! HTTP functionality for one region.

use super::auth::RequestSigner;
use super::http::{ApiResponse, OciHttpClient};
use crate::config::OciConfig;
use anyhow::{Context, Result};
use reqwest::Url;
use serde_json::Value;

/// Monitoring API version path segment
pub const API_VERSION: &str = "20180401";

/// Regional Monitoring endpoint (commercial realm)
pub fn monitoring_endpoint(region: &str) -> String {
    format!("https://telemetry.{}.oraclecloud.com", region)
}

/// Monitoring API client bound to one region and one API key.
///
/// Building the client reads the private key but makes no network call.
#[derive(Clone)]
pub struct MonitoringClient {
    signer: RequestSigner,
    http: OciHttpClient,
    endpoint: String,
    region: String,
}

impl MonitoringClient {
    /// Create a client for the regional Monitoring endpoint
    pub fn new(config: &OciConfig) -> Result<Self> {
        Self::with_endpoint(config, &monitoring_endpoint(&config.region))
    }

    /// Create a client for an explicit endpoint (private endpoints, other realms)
    pub fn with_endpoint(config: &OciConfig, endpoint: &str) -> Result<Self> {
        let signer = RequestSigner::from_config(config)
            .context("Failed to load the API signing key")?;
        Self::from_parts(signer, endpoint, &config.region)
    }

    pub fn from_parts(signer: RequestSigner, endpoint: &str, region: &str) -> Result<Self> {
        Url::parse(endpoint).with_context(|| format!("Invalid Monitoring endpoint: {}", endpoint))?;

        tracing::debug!("Monitoring client for {} at {}", region, endpoint);

        Ok(Self {
            signer,
            http: OciHttpClient::new()?,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            region: region.to_string(),
        })
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Build the URL of a `metrics/actions/<action>` call
    pub fn metrics_action_url(&self, action: &str, query: &[(&str, String)]) -> Result<Url> {
        let base = format!("{}/{}/metrics/actions/{}", self.endpoint, API_VERSION, action);
        Url::parse_with_params(&base, query).with_context(|| format!("Invalid request URL: {}", base))
    }

    /// Make a signed POST request
    pub async fn post(&self, url: &Url, body: &Value) -> Result<ApiResponse> {
        self.http.post(url, &self.signer, body).await
    }
}
