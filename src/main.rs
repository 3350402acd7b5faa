use anyhow::Result;
use chrono::Utc;
use clap::{Parser, ValueEnum};
use oci_vpn_status::config::{self, LoadOptions};
use oci_vpn_status::exit;
use oci_vpn_status::oci::client::MonitoringClient;
use oci_vpn_status::oci::http::format_oci_error;
use oci_vpn_status::report::{self, MissingDataPolicy, QueryWindow, RunSettings};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;

/// Report the status of the VPN tunnels of an OCI compartment and region
#[derive(Parser, Debug)]
#[command(name = "oci-vpn-status", version, about, long_about = None)]
struct Args {
    /// Compartment OCID
    #[arg(long = "compartment_id", visible_alias = "compartment-id")]
    compartment_id: String,

    /// OCI region (e.g. sa-saopaulo-1)
    #[arg(long)]
    region: String,

    /// Metric name (e.g. TunnelState)
    #[arg(long)]
    metric: String,

    /// Log level
    #[arg(long, value_enum, ignore_case = true, default_value = "error")]
    loglevel: LogLevel,

    /// Echo logs on stderr (default)
    #[arg(long, overrides_with = "no_verbose")]
    verbose: bool,

    /// Don't show any logs on screen
    #[arg(long = "no-verbose", overrides_with = "verbose")]
    no_verbose: bool,

    /// OCI config file (default: ~/.oci/config or OCI_CONFIG_FILE)
    #[arg(long)]
    config_file: Option<PathBuf>,

    /// Profile of the OCI config file (default: DEFAULT or OCI_CLI_PROFILE)
    #[arg(long)]
    profile: Option<String>,

    /// Monitoring endpoint overriding the regional one
    #[arg(long)]
    endpoint: Option<String>,

    /// What to do with tunnels that have no data in the last minute
    #[arg(long, value_enum, default_value = "skip")]
    on_missing: MissingDataPolicy,
}

impl Args {
    fn verbose(&self) -> bool {
        !self.no_verbose
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    fn to_level_filter(self) -> LevelFilter {
        match self {
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warning => LevelFilter::WARN,
            LogLevel::Error | LogLevel::Critical => LevelFilter::ERROR,
        }
    }
}

fn setup_logging(level: LogLevel, verbose: bool) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let log_path = get_log_path();

    let (file_layer, guard) = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        Ok(file) => {
            let (non_blocking, guard) = tracing_appender::non_blocking(file);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(true)
                .with_line_number(true);
            (Some(layer), Some(guard))
        }
        Err(e) => {
            eprintln!("Cannot open log file {}: {}", log_path.display(), e);
            (None, None)
        }
    };

    // stdout is reserved for the JSON document
    let stderr_layer = verbose.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(false)
            .with_target(false)
    });

    tracing_subscriber::registry()
        .with(level.to_level_filter())
        .with(file_layer)
        .with(stderr_layer)
        .init();

    tracing::info!("oci-vpn-status started with log level: {:?}", level);
    tracing::info!("Log file: {:?}", log_path);

    guard
}

/// `<tmp>/<program name>.log`
fn get_log_path() -> PathBuf {
    let program = std::env::args_os()
        .next()
        .and_then(|arg0| {
            Path::new(&arg0)
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
        })
        .unwrap_or_else(|| "oci-vpn-status".to_string());

    std::env::temp_dir().join(format!("{}.log", program))
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let _log_guard = setup_logging(args.loglevel, args.verbose());

    match run(&args).await {
        Ok(code) => code,
        Err(err) => {
            tracing::error!("{:#}", err);
            if !args.verbose() {
                eprintln!("Error: {}", format_oci_error(&err));
            }
            ExitCode::from(exit::FATAL)
        }
    }
}

async fn run(args: &Args) -> Result<ExitCode> {
    let options = LoadOptions {
        config_file: args.config_file.clone(),
        profile: args.profile.clone(),
        region: Some(args.region.clone()),
    };

    let Some(config) = config::initialize(&options) else {
        tracing::error!("Failed to initialize the OCI configuration. See the errors above for details.");
        return Ok(ExitCode::from(exit::CONFIG));
    };

    let client = match &args.endpoint {
        Some(endpoint) => MonitoringClient::with_endpoint(&config, endpoint),
        None => MonitoringClient::new(&config),
    };
    let client = match client {
        Ok(client) => client,
        Err(e) => {
            tracing::error!("Failed to create the Monitoring client: {:#}", e);
            return Ok(ExitCode::from(exit::CONFIG));
        }
    };

    tracing::info!(
        "Querying {} in {} for compartment {}",
        args.metric,
        client.region(),
        args.compartment_id
    );

    let settings = RunSettings {
        compartment_id: args.compartment_id.clone(),
        metric: args.metric.clone(),
        on_missing: args.on_missing,
    };
    let window = QueryWindow::last_minute(Utc::now());

    let outcome = report::collect(&client, &settings, &window).await;
    let status = report::exit_status(&outcome);
    let report = outcome?;
    println!("{}", report.to_json_line()?);

    if !report.is_complete() {
        tracing::warn!(
            "{} tunnel(s) without data: {}",
            report.missing.len(),
            report.missing.join(", ")
        );
    }
    Ok(ExitCode::from(status))
}
