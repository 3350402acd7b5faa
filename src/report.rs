//! Tunnel Report
//!
//! Resolves the latest value of every listed VPN metric stream and renders
//! the result as `{"resource": [...]}` with keys sorted at every level.

use crate::exit;
use crate::oci::client::MonitoringClient;
use crate::oci::monitoring::{self, MetricData, SummarizeMetricsDataDetails, VPN_NAMESPACE};
use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::io;

/// Timestamp format of query windows (UTC, second precision)
const WINDOW_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// What to do when a listed resource has no data point in the window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum MissingDataPolicy {
    /// Log a warning and leave the resource out of the output
    #[default]
    Skip,
    /// Fail the whole run
    Abort,
}

/// Parameters of one report run
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub compartment_id: String,
    pub metric: String,
    pub on_missing: MissingDataPolicy,
}

impl RunSettings {
    pub fn new(compartment_id: &str, metric: &str) -> Self {
        Self {
            compartment_id: compartment_id.to_string(),
            metric: metric.to_string(),
            on_missing: MissingDataPolicy::default(),
        }
    }
}

/// Time window of the summarize queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl QueryWindow {
    /// The minute ending at `end`
    pub fn last_minute(end: DateTime<Utc>) -> Self {
        Self {
            start: end - Duration::minutes(1),
            end,
        }
    }

    pub fn start_str(&self) -> String {
        self.start.format(WINDOW_TIME_FORMAT).to_string()
    }

    pub fn end_str(&self) -> String {
        self.end.format(WINDOW_TIME_FORMAT).to_string()
    }
}

/// MQL query for the last one-minute value of one resource
pub fn build_query(metric: &str, resource_name: &str) -> String {
    format!("{}[1m]{{resourceName = \"{}\"}}.last()", metric, resource_name)
}

/// Value of the first data point of the first series, if any
pub fn latest_value(series: &[MetricData]) -> Option<f64> {
    series
        .first()
        .and_then(|data| data.aggregated_datapoints.first())
        .map(|point| point.value)
}

/// One line of the output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub resource_name: String,
    pub name: String,
    pub value: f64,
    pub namespace: String,
    pub public_ip: Option<String>,
}

/// Output document plus the resources that had to be left out
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub resource: Vec<ResultRecord>,
    #[serde(skip)]
    pub missing: Vec<String>,
}

impl Report {
    /// True when every listed resource produced a record
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }

    /// Exit status of a run that produced this report
    pub fn exit_status(&self) -> u8 {
        if self.is_complete() {
            exit::SUCCESS
        } else {
            exit::PARTIAL
        }
    }

    /// Render the printed form: one line, keys sorted, `", "` and `": "` separators
    pub fn to_json_line(&self) -> Result<String> {
        let value = sort_keys(serde_json::to_value(self)?);

        let mut out = Vec::new();
        let mut serializer = serde_json::Serializer::with_formatter(&mut out, SpacedFormatter);
        value.serialize(&mut serializer)?;

        Ok(String::from_utf8(out)?)
    }
}

/// Exit status of a finished [`collect`] call
pub fn exit_status(outcome: &Result<Report>) -> u8 {
    match outcome {
        Ok(report) => report.exit_status(),
        Err(_) => exit::FATAL,
    }
}

/// Rebuild every object with its keys in alphabetical order
fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut sorted = Map::new();
            for (key, value) in entries {
                sorted.insert(key, sort_keys(value));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

/// Compact JSON with a space after every `,` and `:`
struct SpacedFormatter;

impl serde_json::ser::Formatter for SpacedFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }
}

/// List the metric streams and resolve the latest value of each, one at a
/// time and in listing order.
///
/// Transport and API errors are returned as is. A resource without data is
/// recorded in [`Report::missing`], or fails the run under
/// [`MissingDataPolicy::Abort`].
pub async fn collect(
    client: &MonitoringClient,
    settings: &RunSettings,
    window: &QueryWindow,
) -> Result<Report> {
    let page = monitoring::list_metrics(client, &settings.compartment_id, &settings.metric).await?;
    if page.next_page.is_some() {
        tracing::warn!(
            "More than {} metric streams match {}; only the first page is reported",
            monitoring::LIST_METRICS_LIMIT,
            settings.metric
        );
    }

    let start_time = window.start_str();
    let end_time = window.end_str();
    let mut report = Report::default();

    for metric in &page.items {
        let Some(resource_name) = metric.resource_name() else {
            tracing::warn!(
                "Metric stream {} has no resourceName dimension, skipping",
                metric.name
            );
            let label = match metric.resource_id() {
                Some(id) => id.to_string(),
                None => format!("{} (no resourceName)", metric.name),
            };
            report.missing.push(label);
            continue;
        };

        let details = SummarizeMetricsDataDetails {
            namespace: VPN_NAMESPACE.to_string(),
            query: build_query(&settings.metric, resource_name),
            start_time: start_time.clone(),
            end_time: end_time.clone(),
        };
        let series =
            monitoring::summarize_metrics_data(client, &settings.compartment_id, &details).await?;

        let Some(value) = latest_value(&series) else {
            match settings.on_missing {
                MissingDataPolicy::Skip => {
                    tracing::warn!(
                        "No data point for {} between {} and {}, skipping",
                        resource_name,
                        start_time,
                        end_time
                    );
                    report.missing.push(resource_name.to_string());
                    continue;
                }
                MissingDataPolicy::Abort => {
                    anyhow::bail!(
                        "No data point for {} between {} and {}",
                        resource_name,
                        start_time,
                        end_time
                    );
                }
            }
        };

        tracing::debug!("{} {} = {}", resource_name, metric.name, value);

        report.resource.push(ResultRecord {
            resource_name: resource_name.to_string(),
            name: metric.name.clone(),
            value,
            namespace: metric.namespace.clone(),
            public_ip: metric.public_ip().map(str::to_string),
        });
    }

    tracing::info!(
        "Resolved {} of {} metric streams",
        report.resource.len(),
        page.items.len()
    );

    Ok(report)
}
