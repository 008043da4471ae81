//! ==============================================================================
//! config.rs - Runtime Configuration Loader
//! ==============================================================================
//!
//! purpose:
//!     defines the schema for `monitor.toml`.
//!     loads configuration from file or falls back to defaults.
//!
//! structure:
//!     - ServerConfig: where the dashboard listens.
//!     - SimulationConfig: tick period, jitter, rng seed, initial running flag.
//!     - ModelConfig: path of the failure-model artifact.
//!     - CostPolicy: failure / inspection / repair costs and threshold ordering.
//!     - LoggingConfig: default log filter and per-tick reading logs.
//!
//! every section is optional in the file; missing ones take the defaults below.
//!
//! ==============================================================================

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::decision::CostPolicy;
use crate::simulator::DEFAULT_JITTER;

/// Root configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct MonitorConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub costs: CostPolicy,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SimulationConfig {
    pub interval_seconds: u64,
    /// relative jitter per tick, 0.02 = +/-2%
    pub jitter: f64,
    /// fixed seed for reproducible runs; unset draws from the os
    pub seed: Option<u64>,
    pub start_running: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            interval_seconds: 2,
            jitter: DEFAULT_JITTER,
            seed: None,
            start_running: true,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ModelConfig {
    pub path: PathBuf,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("models").join("failure_model.json"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    /// used when RUST_LOG is not set
    pub level: String,
    pub show_sensor_data: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            show_sensor_data: true,
        }
    }
}

impl MonitorConfig {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| anyhow::anyhow!("Failed to read config file {}: {}", path.as_ref().display(), e))?;

        let config: MonitorConfig = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config: {}", e))?;

        if config.simulation.interval_seconds == 0 {
            anyhow::bail!("simulation.interval_seconds must be at least 1");
        }
        let jitter = config.simulation.jitter;
        if !jitter.is_finite() || !(0.0..1.0).contains(&jitter) {
            anyhow::bail!("simulation.jitter must be in [0, 1), got {jitter}");
        }

        Ok(config)
    }

    /// Load with default fallback
    ///
    /// runs before the tracing subscriber exists, so problems go to stdout.
    pub fn load_or_default() -> Self {
        let paths = [
            PathBuf::from("config").join("monitor.toml"),
            PathBuf::from("..").join("config").join("monitor.toml"),
        ];

        for path in &paths {
            if path.exists() {
                match Self::load(path) {
                    Ok(config) => {
                        println!("[CONFIG] Loaded from {}", path.display());
                        return config;
                    }
                    Err(e) => {
                        println!("[CONFIG] Warning: Failed to load {}: {}", path.display(), e);
                    }
                }
            }
        }

        println!("[CONFIG] Warning: No config file found - using defaults");
        Self::default()
    }

    /// Print configuration summary
    pub fn print_summary(&self) {
        println!("┌─────────────────────────────────────────┐");
        println!("│          MONITOR CONFIGURATION          │");
        println!("├─────────────────────────────────────────┤");
        println!("│ Listen: {}", self.server.bind_address());
        println!("│ Tick Interval: {}s", self.simulation.interval_seconds);
        println!("│ Jitter: ±{:.1}%", self.simulation.jitter * 100.0);
        println!("│ Model: {}", self.model.path.display());
        println!("│ Thresholds: {:?}", self.costs.ordering);
        println!("│ Log Level: {}", self.logging.level);
        println!("└─────────────────────────────────────────┘");
    }
}
