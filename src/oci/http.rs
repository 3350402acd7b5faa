//! HTTP utilities for OCI REST API calls

use super::auth::RequestSigner;
use anyhow::{Context, Result};
use chrono::Utc;
use reqwest::{Client, Method, StatusCode, Url};
use serde_json::Value;
use thiserror::Error;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Header carrying the pagination token of list operations
pub const NEXT_PAGE_HEADER: &str = "opc-next-page";

/// Header carrying the service-side request id
pub const REQUEST_ID_HEADER: &str = "opc-request-id";

/// Sanitize response body for logging
/// Truncates long responses and strips control characters
fn sanitize_for_log(body: &str) -> String {
    let char_count = body.chars().count();
    let truncated = if char_count > MAX_LOG_BODY_LENGTH {
        format!(
            "{}... [truncated, {} bytes total]",
            body.chars().take(MAX_LOG_BODY_LENGTH).collect::<String>(),
            body.len()
        )
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// Non-2xx answer from an OCI endpoint
#[derive(Debug, Error)]
#[error("API request failed: {status}")]
pub struct ApiError {
    pub status: StatusCode,
    pub request_id: Option<String>,
}

/// Parsed response of a successful call
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub body: Value,
    /// Token for the next page, if the service truncated the result
    pub next_page: Option<String>,
    pub request_id: Option<String>,
}

/// HTTP client wrapper for signed OCI API calls
#[derive(Clone)]
pub struct OciHttpClient {
    client: Client,
}

impl OciHttpClient {
    /// Create a new HTTP client
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("oci-vpn-status/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }

    /// Make a signed POST request with a JSON body
    pub async fn post(&self, url: &Url, signer: &RequestSigner, body: &Value) -> Result<ApiResponse> {
        tracing::debug!("POST {}", url);

        let payload = serde_json::to_vec(body).context("Failed to serialize request body")?;
        let headers = signer.sign(&Method::POST, url, Some(payload.as_slice()), Utc::now())?;

        let response = self
            .client
            .post(url.clone())
            .headers(headers)
            .body(payload)
            .send()
            .await
            .context("Failed to send request")?;

        let status = response.status();
        let header = |name: &str| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(|s| s.to_string())
        };
        let next_page = header(NEXT_PAGE_HEADER);
        let request_id = header(REQUEST_ID_HEADER);

        let response_body = response
            .text()
            .await
            .context("Failed to read response body")?;

        if !status.is_success() {
            // Security: Only log sanitized/truncated error body to avoid leaking sensitive data
            tracing::error!(
                "API error: {} (opc-request-id: {}) - {}",
                status,
                request_id.as_deref().unwrap_or("-"),
                sanitize_for_log(&response_body)
            );
            return Err(ApiError { status, request_id }.into());
        }

        let body = if response_body.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&response_body).context("Failed to parse response JSON")?
        };

        Ok(ApiResponse {
            body,
            next_page,
            request_id,
        })
    }
}

/// Format an OCI API error for display
/// Security: Sanitizes error messages to avoid leaking sensitive API details
pub fn format_oci_error(error: &anyhow::Error) -> String {
    let api_error = error.chain().find_map(|e| e.downcast_ref::<ApiError>());
    if let Some(api_error) = api_error {
        return match api_error.status.as_u16() {
            401 => "Authentication failed. Check the API key, fingerprint, user and tenancy OCIDs.",
            403 => "Permission denied. Check the IAM policies for reading metrics in this compartment.",
            404 => "Not found. Check the compartment OCID and region.",
            429 => "Rate limit exceeded. Please try again later.",
            400 => "Invalid request. Check the compartment OCID and metric name.",
            500 | 503 => "OCI Monitoring temporarily unavailable. Please try again.",
            _ => "Request failed. Check your network connection and try again.",
        }
        .to_string();
    }

    let error_str = format!("{:#}", error);
    let sanitized = error_str
        .chars()
        .filter(|c| c.is_ascii_graphic() || *c == ' ')
        .take(120)
        .collect::<String>();

    if sanitized.len() < error_str.len() {
        format!("{}...", sanitized)
    } else {
        sanitized
    }
}
