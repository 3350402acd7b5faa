//! OCI Monitoring
//!
//! The two Monitoring operations the report needs: listing the metric streams
//! of a compartment and summarizing one stream over a time window.

use super::client::MonitoringClient;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Metric namespace of the Site-to-Site VPN service
pub const VPN_NAMESPACE: &str = "oci_vpn";

/// Page size requested from ListMetrics
pub const LIST_METRICS_LIMIT: u32 = 765;

/// One metric stream, as returned by ListMetrics
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricDescriptor {
    pub name: String,
    pub namespace: String,
    #[serde(default)]
    pub compartment_id: Option<String>,
    #[serde(default)]
    pub resource_group: Option<String>,
    #[serde(default)]
    pub dimensions: BTreeMap<String, String>,
}

impl MetricDescriptor {
    pub fn resource_name(&self) -> Option<&str> {
        self.dimensions.get("resourceName").map(String::as_str)
    }

    pub fn public_ip(&self) -> Option<&str> {
        self.dimensions.get("publicIp").map(String::as_str)
    }

    /// OCID of the tunnel, when the stream carries one
    pub fn resource_id(&self) -> Option<&str> {
        self.dimensions.get("resourceId").map(String::as_str)
    }
}

/// A single aggregated (timestamp, value) pair
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AggregatedDataPoint {
    pub timestamp: String,
    pub value: f64,
}

/// One aggregated series, as returned by SummarizeMetricsData
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricData {
    pub name: String,
    pub namespace: String,
    #[serde(default)]
    pub dimensions: BTreeMap<String, String>,
    #[serde(default)]
    pub resolution: Option<String>,
    #[serde(default)]
    pub aggregated_datapoints: Vec<AggregatedDataPoint>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ListMetricsDetails<'a> {
    name: &'a str,
    namespace: &'a str,
}

/// Body of a SummarizeMetricsData call
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummarizeMetricsDataDetails {
    pub namespace: String,
    pub query: String,
    pub start_time: String,
    pub end_time: String,
}

/// First page of a ListMetrics call
#[derive(Debug, Clone)]
pub struct MetricsPage {
    pub items: Vec<MetricDescriptor>,
    /// Set when more streams exist than were returned
    pub next_page: Option<String>,
}

/// List the `oci_vpn` metric streams named `metric` in exactly this compartment.
///
/// Only the first page is requested; the caller decides what to do with a
/// truncated result.
pub async fn list_metrics(
    client: &MonitoringClient,
    compartment_id: &str,
    metric: &str,
) -> Result<MetricsPage> {
    let url = client.metrics_action_url(
        "listMetrics",
        &[
            ("compartmentId", compartment_id.to_string()),
            ("compartmentIdInSubtree", "false".to_string()),
            ("limit", LIST_METRICS_LIMIT.to_string()),
        ],
    )?;

    let details = ListMetricsDetails {
        name: metric,
        namespace: VPN_NAMESPACE,
    };
    let body = serde_json::to_value(&details)?;

    let response = client
        .post(&url, &body)
        .await
        .context("Failed to list metrics")?;

    let items: Vec<MetricDescriptor> = if response.body.is_null() {
        Vec::new()
    } else {
        serde_json::from_value(response.body).context("Unexpected ListMetrics response")?
    };

    tracing::info!(
        "Listed {} {} metric streams named {} (opc-request-id: {})",
        items.len(),
        VPN_NAMESPACE,
        metric,
        response.request_id.as_deref().unwrap_or("-")
    );

    Ok(MetricsPage {
        items,
        next_page: response.next_page,
    })
}

/// Run one Monitoring query over the given window
pub async fn summarize_metrics_data(
    client: &MonitoringClient,
    compartment_id: &str,
    details: &SummarizeMetricsDataDetails,
) -> Result<Vec<MetricData>> {
    let url = client.metrics_action_url(
        "summarizeMetricsData",
        &[
            ("compartmentId", compartment_id.to_string()),
            ("compartmentIdInSubtree", "false".to_string()),
        ],
    )?;
    let body = serde_json::to_value(details)?;

    let response = client
        .post(&url, &body)
        .await
        .with_context(|| format!("Failed to summarize metrics data for query {}", details.query))?;

    if response.body.is_null() {
        return Ok(Vec::new());
    }

    let series: Vec<MetricData> =
        serde_json::from_value(response.body).context("Unexpected SummarizeMetricsData response")?;

    tracing::debug!("Query {} returned {} series", details.query, series.len());

    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_metric_descriptor_from_list_response() {
        let value = json!({
            "name": "TunnelState",
            "namespace": "oci_vpn",
            "resourceGroup": null,
            "compartmentId": "ocid1.compartment.oc1..x",
            "dimensions": {
                "resourceId": "ocid1.ipsectunnel.oc1.sa-saopaulo-1.aaa",
                "resourceName": "tunnel-a",
                "publicIp": "1.2.3.4",
                "parentResourceId": "ocid1.ipsecconnection.oc1.sa-saopaulo-1.bbb"
            }
        });

        let metric: MetricDescriptor = serde_json::from_value(value).unwrap();
        assert_eq!(metric.resource_name(), Some("tunnel-a"));
        assert_eq!(metric.public_ip(), Some("1.2.3.4"));
        assert_eq!(metric.resource_id(), Some("ocid1.ipsectunnel.oc1.sa-saopaulo-1.aaa"));
        assert_eq!(metric.compartment_id.as_deref(), Some("ocid1.compartment.oc1..x"));
        assert!(metric.resource_group.is_none());
    }

    #[test]
    fn test_metric_descriptor_without_dimensions() {
        let metric: MetricDescriptor =
            serde_json::from_value(json!({"name": "TunnelState", "namespace": "oci_vpn"})).unwrap();
        assert!(metric.resource_name().is_none());
        assert!(metric.public_ip().is_none());
        assert!(metric.resource_id().is_none());
    }

    #[test]
    fn test_metric_data_from_summarize_response() {
        let value = json!({
            "namespace": "oci_vpn",
            "name": "TunnelState",
            "dimensions": {"resourceName": "tunnel-a"},
            "metadata": {"displayName": "Tunnel State"},
            "resolution": "1m",
            "aggregatedDatapoints": [
                {"timestamp": "2026-10-19T13:05:00Z", "value": 1.0}
            ]
        });

        let data: MetricData = serde_json::from_value(value).unwrap();
        assert_eq!(data.aggregated_datapoints.len(), 1);
        assert_eq!(data.aggregated_datapoints[0].value, 1.0);
        assert_eq!(data.resolution.as_deref(), Some("1m"));
    }

    #[test]
    fn test_summarize_details_wire_format() {
        let details = SummarizeMetricsDataDetails {
            namespace: VPN_NAMESPACE.to_string(),
            query: "TunnelState[1m]{resourceName = \"tunnel-a\"}.last()".to_string(),
            start_time: "2026-10-19T13:04:09Z".to_string(),
            end_time: "2026-10-19T13:05:09Z".to_string(),
        };

        assert_eq!(
            serde_json::to_value(&details).unwrap(),
            json!({
                "namespace": "oci_vpn",
                "query": "TunnelState[1m]{resourceName = \"tunnel-a\"}.last()",
                "startTime": "2026-10-19T13:04:09Z",
                "endTime": "2026-10-19T13:05:09Z"
            })
        );
    }
}
