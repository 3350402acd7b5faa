//! OCI Authentication
//!
//! Signs requests with an API signing key, following the OCI HTTP Signature
//! scheme (version 1, rsa-sha256).

use crate::config::OciConfig;
use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::{Method, Url};
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs1v15::SigningKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::signature::{SignatureEncoding, Signer};
use rsa::RsaPrivateKey;
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// Pseudo-header carrying the lowercase method and the path with query
pub const REQUEST_TARGET: &str = "(request-target)";

/// Content type of every signed body
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Holds the private key and key id for signing requests
#[derive(Clone)]
pub struct RequestSigner {
    key_id: String,
    signing_key: Arc<SigningKey<Sha256>>,
}

impl RequestSigner {
    /// Load the signing key referenced by the configuration
    pub fn from_config(config: &OciConfig) -> Result<Self> {
        let pem = std::fs::read_to_string(&config.key_file)
            .with_context(|| format!("Failed to read key file {}", config.key_file.display()))?;
        Self::from_pem(&config.key_id(), &pem)
    }

    /// Build a signer from a PKCS#1 or PKCS#8 PEM private key
    pub fn from_pem(key_id: &str, pem: &str) -> Result<Self> {
        if pem.contains("ENCRYPTED") {
            anyhow::bail!("Encrypted private keys are not supported, provide an unencrypted PEM key");
        }

        let private_key = match RsaPrivateKey::from_pkcs8_pem(pem) {
            Ok(key) => key,
            Err(_) => RsaPrivateKey::from_pkcs1_pem(pem)
                .map_err(|e| anyhow::anyhow!("Failed to parse RSA private key: {}", e))?,
        };

        Ok(Self {
            key_id: key_id.to_string(),
            signing_key: Arc::new(SigningKey::<Sha256>::new(private_key)),
        })
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Produce the headers authenticating a request.
    ///
    /// GET-like requests sign `date (request-target) host`; requests with a
    /// body additionally sign its length, type and SHA-256 digest.
    pub fn sign(
        &self,
        method: &Method,
        url: &Url,
        body: Option<&[u8]>,
        now: DateTime<Utc>,
    ) -> Result<HeaderMap> {
        let signed = signed_headers(method, url, body, now)?;
        let signing_string = signing_string(&signed);

        let signature = self.signing_key.sign(signing_string.as_bytes());
        let names = signed
            .iter()
            .map(|(name, _)| *name)
            .collect::<Vec<_>>()
            .join(" ");

        let authorization = format!(
            "Signature version=\"1\",keyId=\"{}\",algorithm=\"rsa-sha256\",headers=\"{}\",signature=\"{}\"",
            self.key_id,
            names,
            STANDARD.encode(signature.to_bytes())
        );

        let mut headers = HeaderMap::new();
        for (name, value) in &signed {
            if *name == REQUEST_TARGET {
                continue;
            }
            headers.insert(
                HeaderName::from_static(*name),
                HeaderValue::from_str(value).with_context(|| format!("Invalid {} header", name))?,
            );
        }
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&authorization).context("Invalid authorization header")?,
        );

        tracing::trace!("Signed {} {} with headers: {}", method, url.path(), names);

        Ok(headers)
    }
}

/// Ordered (name, value) pairs covered by the signature
pub fn signed_headers(
    method: &Method,
    url: &Url,
    body: Option<&[u8]>,
    now: DateTime<Utc>,
) -> Result<Vec<(&'static str, String)>> {
    let host = url.host_str().context("Request URL has no host")?;
    let host = match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    };

    let mut headers = vec![
        ("date", http_date(now)),
        (REQUEST_TARGET, request_target(method, url)),
        ("host", host),
    ];

    if let Some(body) = body {
        headers.push(("content-length", body.len().to_string()));
        headers.push(("content-type", JSON_CONTENT_TYPE.to_string()));
        headers.push(("x-content-sha256", content_sha256(body)));
    }

    Ok(headers)
}

/// The exact text that gets signed
pub fn signing_string(headers: &[(&str, String)]) -> String {
    headers
        .iter()
        .map(|(name, value)| format!("{}: {}", name, value))
        .collect::<Vec<_>>()
        .join("\n")
}

/// `<lowercase method> <path>[?<query>]`
pub fn request_target(method: &Method, url: &Url) -> String {
    let method = method.as_str().to_lowercase();
    match url.query() {
        Some(query) => format!("{} {}?{}", method, url.path(), query),
        None => format!("{} {}", method, url.path()),
    }
}

/// RFC 7231 date, e.g. `Mon, 19 Oct 2026 10:00:00 GMT`
pub fn http_date(now: DateTime<Utc>) -> String {
    now.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Base64 of the SHA-256 digest of the body
pub fn content_sha256(body: &[u8]) -> String {
    STANDARD.encode(Sha256::digest(body))
}
