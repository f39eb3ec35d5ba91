/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

use std::io;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{error, info, warn};

use aquasmart_ctl::channel::DeviceLink;
use aquasmart_ctl::codec;
use aquasmart_ctl::config::{DeploymentConfig, DeviceConfig};
use aquasmart_ctl::export::ScheduleExporter;
use aquasmart_ctl::params::ParameterSet;
use aquasmart_ctl::protocol::{DeliveryProtocol, RelaySink, TracingSink};
use aquasmart_ctl::resolver::ScheduleResolver;

// ── CLI argument definition ───────────────────────────────────────────────────

/// AquaSmart irrigation controller.
///
/// Example:
///   aquasmart run -i parametros.txt -c aquasmart.yaml
///   aquasmart run -i parametros.txt --scale 0.00001 --simulate --events
#[derive(Debug, Parser)]
#[command(
    name = "aquasmart",
    about = "AquaSmart irrigation controller – day-by-day water delivery",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Deliver a parameter file to the device day by day, then export it.
    Run(RunArgs),
    /// Print the dimensions of a parameter file and its resolved volumes.
    Inspect(InspectArgs),
    /// Re-emit a parameter file limited to its first days.
    Truncate(TruncateArgs),
}

#[derive(Debug, Args)]
struct SourceArgs {
    /// Parameter file to deliver.
    #[arg(short = 'i', long = "params")]
    params: PathBuf,

    /// YAML deployment configuration.
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Volume scale factor; overrides `delivery.volume_scale`.
    #[arg(short = 's', long = "scale")]
    scale: Option<f64>,
}

#[derive(Debug, Args)]
struct RunArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Use the in-process simulated device instead of the configured link.
    #[arg(long = "simulate", default_value_t = false)]
    simulate: bool,

    /// Write relay events as JSON lines on stdout (logs go to stderr).
    #[arg(long = "events", default_value_t = false)]
    events: bool,
}

#[derive(Debug, Args)]
struct InspectArgs {
    #[command(flatten)]
    source: SourceArgs,
}

#[derive(Debug, Args)]
struct TruncateArgs {
    /// Parameter file to truncate.
    #[arg(short = 'i', long = "params")]
    params: PathBuf,

    /// Number of days to keep.
    #[arg(short = 'd', long = "days")]
    days: usize,

    /// Output file; stdout when absent.
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    // Level is controlled by the RUST_LOG env-var (e.g. RUST_LOG=debug).
    // Logs go to stderr so stdout stays free for relay events and reports.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Run(args) => run(args).await,
        Command::Inspect(args) => inspect(args),
        Command::Truncate(args) => truncate(args),
    };

    if let Err(e) = result {
        error!("{:#}", e);
        process::exit(1);
    }
}

// ── run ───────────────────────────────────────────────────────────────────────

async fn run(args: RunArgs) -> Result<()> {
    let mut relay = args.events.then(|| RelaySink::new(io::stdout()));

    let result = deliver(&args, relay.as_mut()).await;
    if let (Err(e), Some(relay)) = (&result, relay.as_mut()) {
        relay.report_error(format!("{e:#}"));
    }
    result
}

async fn deliver(args: &RunArgs, relay: Option<&mut RelaySink<io::Stdout>>) -> Result<()> {
    info!("AquaSmart controller starting up...");

    let params = load_params(&args.source.params)?;
    let mut config = load_config(args.source.config.as_deref())?;
    if args.simulate {
        info!("Simulation forced from the command line");
        config.device = DeviceConfig::simulated(config.advance);
    }
    let scale = config.volume_scale(args.source.scale)?;

    for (zone, day) in config
        .rationing
        .out_of_range(params.num_zones(), params.num_days())
    {
        warn!(zone, day, "rationing entry outside the schedule is ignored");
    }

    // Every day is resolved before the device sees a single command.
    let params = Arc::new(params);
    let resolver = ScheduleResolver::new(Arc::clone(&params), config.rationing.clone(), scale);
    let commands = resolver
        .resolve_all()
        .context("Cannot resolve the delivery schedule")?;

    let link = DeviceLink::open(&config.device).await?;
    let mut protocol = DeliveryProtocol::new(link, commands, config.protocol_options());
    let report = protocol.run((TracingSink, relay)).await;

    let exporter = ScheduleExporter::from(&config.output);
    exporter
        .export(&params, &report.outcome)
        .context("Cannot write the schedule artifacts")?;

    if let Some(e) = report.error {
        return Err(anyhow::Error::new(e).context(format!("Delivery ended early: {}", report.outcome)));
    }

    info!(outcome = %report.outcome, days_sent = report.days_sent.len(), "Run complete");
    Ok(())
}

// ── inspect ───────────────────────────────────────────────────────────────────

fn inspect(args: InspectArgs) -> Result<()> {
    let params = load_params(&args.source.params)?;
    let config = load_config(args.source.config.as_deref())?;

    println!(
        "zones: {}  days: {}  categories: {}",
        params.num_zones(),
        params.num_days(),
        params.schedule().num_categories()
    );
    let model = params.model();
    println!(
        "p = {}  n_0 = {}  e = {}  m = {}",
        model.p, model.n0, model.e, model.m
    );

    let scale = match config.volume_scale(args.source.scale) {
        Ok(scale) => scale,
        Err(e) => {
            warn!("{:#}; resolved volumes not shown", e);
            return Ok(());
        }
    };

    let resolver = ScheduleResolver::new(Arc::new(params), config.rationing.clone(), scale);
    for command in resolver.resolve_all()? {
        let rationed = if command.rationed.is_empty() {
            String::new()
        } else {
            format!("  rationed: {:?}", command.rationed)
        };
        println!("{}{}", command, rationed);
    }
    Ok(())
}

// ── truncate ──────────────────────────────────────────────────────────────────

fn truncate(args: TruncateArgs) -> Result<()> {
    let params = load_params(&args.params)?;
    let text = codec::encode(&params, args.days)?;

    match &args.output {
        Some(path) => {
            std::fs::write(path, text)
                .with_context(|| format!("Cannot write {}", path.display()))?;
            info!(days = args.days, path = %path.display(), "Truncated parameter file written");
        }
        None => print!("{text}"),
    }
    Ok(())
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn load_params(path: &Path) -> Result<ParameterSet> {
    info!("Loading parameter file from: {}", path.display());
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot open parameter file: {}", path.display()))?;
    let params = codec::decode(&text)
        .with_context(|| format!("Invalid parameter file: {}", path.display()))?;

    info!(
        zones = params.num_zones(),
        days = params.num_days(),
        categories = params.schedule().num_categories(),
        "Parameter file loaded"
    );
    Ok(params)
}

fn load_config(path: Option<&Path>) -> Result<DeploymentConfig> {
    match path {
        Some(path) => DeploymentConfig::load_from_file(path),
        None => {
            warn!("No deployment configuration file provided, using default settings");
            Ok(DeploymentConfig::default())
        }
    }
}
