//! ==============================================================================
//! main.rs - asset monitor entry point
//! ==============================================================================
//!
//! purpose:
//!     the process that hosts the simulated asset. it loads the failure model,
//!     runs the periodic simulation tick and serves the dashboard.
//!
//! responsibilities:
//!     - parse the command line (serve / predict / generate-dataset /
//!       generate-sensor-data)
//!     - load configuration and set up logging
//!     - load the failure model artifact (fatal if missing)
//!     - spawn the tick scheduler
//!     - serve the web dashboard until ctrl-c, then stop the scheduler
//!
//! architecture:
//!
//!     ┌─────────────────────────────────────────────────────────────┐
//!     │                      asset-monitor                          │
//!     │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────┐  │
//!     │  │ scheduler   │  │ web server  │  │ model hot reload    │  │
//!     │  │ (2s tick)   │  │ (port 5000) │  │ (file timestamps)   │  │
//!     │  └──────┬──────┘  └──────┬──────┘  └──────────┬──────────┘  │
//!     │         │                │                    │             │
//!     │         └────────────────┼────────────────────┘             │
//!     │                          │                                  │
//!     │                    ┌─────┴─────┐                            │
//!     │                    │   store   │ <- store.rs                │
//!     │                    └─────┬─────┘                            │
//!     │      (one lock around the state and the simulator)          │
//!     └──────────────────────────┼──────────────────────────────────┘
//!                                │
//!                    ┌───────────┴───────────┐
//!                    ▼                       ▼
//!             ┌─────────────┐         ┌─────────────┐
//!             │  scorer +   │         │  decision   │
//!             │  model      │         │  policy     │
//!             └─────────────┘         └─────────────┘
//!
//! ==============================================================================

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use asset_monitor::api::{self, AppContext};
use asset_monitor::config::MonitorConfig;
use asset_monitor::domain::{DamageAccumulators, SensorReading};
use asset_monitor::model::{FailureModel, ModelHandle};
use asset_monitor::scheduler::Scheduler;
use asset_monitor::simulator::{self, Simulator};
use asset_monitor::store::StateStore;
use asset_monitor::sensor_data::{self, SeriesOptions};
use asset_monitor::{dataset, scorer};

// ==============================================================================
// command line
// ==============================================================================

/// Simulated asset health monitor
#[derive(Parser, Debug)]
#[command(name = "asset-monitor")]
#[command(author, version, about = "Asset health monitoring dashboard with failure prediction")]
struct Cli {
    /// Path to monitor.toml (default: config/monitor.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the simulator and serve the dashboard (default)
    Serve,

    /// Score a single reading against a fresh asset and print the decision
    Predict(PredictArgs),

    /// Write a synthetic labelled training dataset as CSV
    GenerateDataset {
        /// Number of rows to generate
        #[arg(long, default_value_t = 2000)]
        rows: usize,

        /// RNG seed
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Output file
        #[arg(long, default_value = "data/training_data.csv")]
        output: PathBuf,
    },

    /// Write a raw sensor time series with injected anomalies as CSV
    GenerateSensorData(SensorDataArgs),
}

#[derive(Args, Debug)]
struct SensorDataArgs {
    /// Number of 10-minute samples
    #[arg(long, default_value_t = 1000)]
    rows: usize,

    /// RNG seed
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Leave out spike/drift/stuck/noise anomalies
    #[arg(long)]
    no_anomalies: bool,

    /// Write the fixed 8-row example table instead of a generated series
    #[arg(long, conflicts_with_all = ["rows", "seed", "no_anomalies"])]
    small: bool,

    /// Output file
    #[arg(long, default_value = "data/sensor_data.csv")]
    output: PathBuf,
}

#[derive(Args, Debug)]
struct PredictArgs {
    #[arg(long, default_value_t = 385.0)]
    temperature: f64,
    #[arg(long, default_value_t = 18.6)]
    pressure: f64,
    #[arg(long, default_value_t = 0.65)]
    load: f64,
    #[arg(long, default_value_t = 0.15)]
    vibration_x: f64,
    #[arg(long, default_value_t = 0.10)]
    vibration_y: f64,
    #[arg(long, default_value_t = 48.0)]
    ultrasonic_amplitude: f64,
    #[arg(long, default_value_t = 13.0)]
    ultrasonic_time: f64,
}

// ==============================================================================
// main entry point
// ==============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => MonitorConfig::load(path)?,
        None => MonitorConfig::load_or_default(),
    };
    init_tracing(&config.logging.level);

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Predict(args) => predict(&config, args),
        Command::GenerateDataset { rows, seed, output } => {
            let summary = dataset::write_to_path(&output, rows, seed)
                .with_context(|| format!("failed to write dataset to {}", output.display()))?;
            println!(
                "Wrote {} rows to {} ({} labelled failure_30d = 1)",
                summary.rows,
                output.display(),
                summary.failures
            );
            Ok(())
        }
        Command::GenerateSensorData(args) => generate_sensor_data(args),
    }
}

/// RUST_LOG wins; otherwise the level from the config file
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("asset_monitor={level},tower_http={level}").into());

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn load_model(config: &MonitorConfig) -> Result<Arc<ModelHandle>> {
    let path = &config.model.path;
    let model = ModelHandle::load(path).with_context(|| {
        format!(
            "failure model artifact could not be loaded from {} (set [model].path in monitor.toml)",
            path.display()
        )
    })?;
    tracing::info!(path = %model.path().display(), trees = model.tree_count(), "Failure model loaded");
    Ok(Arc::new(model))
}

// ==============================================================================
// serve
// ==============================================================================

async fn serve(config: MonitorConfig) -> Result<()> {
    // startup banner
    println!("===========================================================");
    println!("  Asset Health Monitor");
    println!("  damage model + failure prediction + maintenance policy");
    println!("===========================================================");
    config.print_summary();

    // step 1: the classifier. no model, no monitor.
    let model = load_model(&config)?;

    // step 2: shared state
    let simulation = &config.simulation;
    let store = StateStore::new(
        Simulator::new(simulation.seed, simulation.jitter),
        simulation.start_running,
    );

    // step 3: periodic tick
    let period = Duration::from_secs(simulation.interval_seconds);
    let cancel = CancellationToken::new();
    let scheduler = Scheduler::new(
        store.clone(),
        model.clone(),
        period,
        config.logging.show_sensor_data,
    );
    let scheduler_handle = tokio::spawn(scheduler.run(cancel.clone()));

    // step 4: web server until ctrl-c
    let ctx = AppContext {
        store,
        model: model as Arc<dyn FailureModel>,
        policy: config.costs,
        refresh_ms: period.as_millis() as u64,
    };
    let app = api::router(ctx);

    let address = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;
    tracing::info!(%address, "Dashboard live at http://{address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("web server error")?;

    // step 5: stop the tick and wait for it
    cancel.cancel();
    if let Err(e) = scheduler_handle.await {
        tracing::error!(error = %e, "Tick scheduler did not shut down cleanly");
    }
    tracing::info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for ctrl-c");
        return;
    }
    tracing::info!("Shutdown signal received");
}

// ==============================================================================
// predict
// ==============================================================================

fn predict(config: &MonitorConfig, args: PredictArgs) -> Result<()> {
    let model = load_model(config)?;

    let reading = SensorReading {
        temperature: args.temperature,
        pressure: args.pressure,
        load: args.load,
        vibration_x: args.vibration_x,
        vibration_y: args.vibration_y,
        ultrasonic_amplitude: args.ultrasonic_amplitude,
        ultrasonic_time: args.ultrasonic_time,
        captured_at: chrono::Utc::now(),
    };
    // first reading of a new asset: no prior load, so no load swing
    let damage = simulator::accumulate(&DamageAccumulators::ZERO, reading.load, &reading);

    let health = scorer::score(&damage);
    let probability = scorer::predict_failure_probability(model.as_ref(), &reading, &damage)?;
    let decision = config.costs.decide(probability);

    println!("PREDICTION RESULTS:");
    println!("{}", "-".repeat(50));
    println!("Health Score:           {:.3}", health);
    println!("Failure Probability:    {:.1}%", probability * 100.0);
    println!("Expected Cost:          ${:.0}", decision.expected_cost);
    println!();
    println!("Decision:               {}", decision.recommendation);
    println!("Action:                 {}", decision.recommendation.action());
    println!();
    println!("Damage Metrics:");
    println!("  Fatigue:              {:.4}", damage.fatigue);
    println!("  Creep:                {:.6}", damage.creep);
    println!("  Corrosion:            {:.4}", damage.corrosion);
    println!("  Crack Growth:         {:.4}", damage.crack_growth);
    println!("{}", "-".repeat(50));
    Ok(())
}

// ==============================================================================
// generate-sensor-data
// ==============================================================================

fn generate_sensor_data(args: SensorDataArgs) -> Result<()> {
    let output = &args.output;
    let context = || format!("failed to write sensor data to {}", output.display());

    if args.small {
        let rows = sensor_data::write_small_to_path(output).with_context(context)?;
        println!("Wrote {} rows to {} (fixed example table)", rows, output.display());
        return Ok(());
    }

    let options = SeriesOptions {
        include_anomalies: !args.no_anomalies,
        ..SeriesOptions::new(args.rows, args.seed)
    };
    let summary = sensor_data::write_to_path(output, &options).with_context(context)?;
    println!(
        "Wrote {} rows to {} ({} injected anomalies)",
        summary.rows,
        output.display(),
        summary.anomalies
    );
    Ok(())
}
