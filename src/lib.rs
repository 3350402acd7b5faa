//! OCI VPN tunnel status
//!
//! Queries OCI Monitoring for the metrics of the `oci_vpn` namespace in a
//! compartment, resolves the latest value of each tunnel and renders the
//! result as a single JSON document.
//!
//! # Module Structure
//!
//! - [`config`] - OCI credentials loading and validation
//! - [`oci`] - Request signing, HTTP transport and the Monitoring API calls
//! - [`report`] - Per-tunnel resolution and JSON rendering
//!
//! # Example
//!
//! ```ignore
//! use oci_vpn_status::config::{self, LoadOptions};
//! use oci_vpn_status::oci::client::MonitoringClient;
//! use oci_vpn_status::report::{self, MissingDataPolicy, QueryWindow, RunSettings};
//!
//! async fn example() -> anyhow::Result<()> {
//!     let config = config::load(&LoadOptions::for_region("sa-saopaulo-1"))?;
//!     let client = MonitoringClient::new(&config)?;
//!     let settings = RunSettings::new("ocid1.compartment.oc1..x", "TunnelState");
//!     let window = QueryWindow::last_minute(chrono::Utc::now());
//!     let report = report::collect(&client, &settings, &window).await?;
//!     println!("{}", report.to_json_line()?);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod oci;
pub mod report;

/// Process exit statuses
pub mod exit {
    /// Every listed tunnel reported (including none listed)
    pub const SUCCESS: u8 = 0;
    /// Transport, API or data error; nothing printed
    pub const FATAL: u8 = 1;
    /// Invalid or missing OCI configuration; nothing printed
    pub const CONFIG: u8 = 2;
    /// Output printed, but at least one tunnel had no data
    pub const PARTIAL: u8 = 3;
}
