//! OCI API interaction module
//!
//! Everything needed to talk to OCI Monitoring without an SDK: API key
//! request signing, the HTTP transport, and the Monitoring operations.
//!
//! # Module Structure
//!
//! - [`auth`] - HTTP Signature request signing with an API key
//! - [`client`] - Regional Monitoring client
//! - [`http`] - HTTP utilities for signed REST calls
//! - [`monitoring`] - ListMetrics and SummarizeMetricsData

pub mod auth;
pub mod client;
pub mod http;
pub mod monitoring;
