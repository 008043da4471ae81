//! ==============================================================================
//! dataset.rs - synthetic training data
//! ==============================================================================
//!
//! purpose:
//!     writes the labelled CSV the failure model is trained on offline. readings
//!     are drawn independently from fixed normal distributions, folded into the
//!     same damage model the live simulator uses, and labelled
//!     failure_30d = 1 once health drops below 0.35.
//!
//! relationships:
//!     - uses: simulator.rs (accumulate), scorer.rs (score)
//!     - used by: main.rs (generate-dataset command)
//!     - used by: sensor_data.rs (create_output)
//!
//! ==============================================================================

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use serde::Serialize;

use crate::domain::{DamageAccumulators, SensorReading};
use crate::error::DatasetError;
use crate::scorer;
use crate::simulator;

/// health below this is labelled as failing within 30 days
pub const FAILURE_HEALTH_THRESHOLD: f64 = 0.35;

const INITIAL_PRIOR_LOAD: f64 = 0.6;

#[derive(Debug, Serialize)]
pub struct TrainingRow {
    pub temperature: f64,
    pub pressure: f64,
    pub load: f64,
    pub vibration_x: f64,
    pub vibration_y: f64,
    pub vibration_mag: f64,
    pub ultrasonic_amplitude: f64,
    pub ultrasonic_time: f64,
    pub fatigue: f64,
    pub creep: f64,
    pub corrosion: f64,
    pub crack_growth: f64,
    pub health: f64,
    pub failure_30d: u8,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DatasetSummary {
    pub rows: usize,
    pub failures: usize,
}

struct Sampler {
    rng: StdRng,
    temperature: Normal<f64>,
    pressure: Normal<f64>,
    load: Normal<f64>,
    vibration_x: Normal<f64>,
    vibration_y: Normal<f64>,
    ultrasonic_amplitude: Normal<f64>,
    ultrasonic_time: Normal<f64>,
}

impl Sampler {
    fn new(seed: u64) -> Result<Self, DatasetError> {
        Ok(Self {
            rng: StdRng::seed_from_u64(seed),
            temperature: Normal::new(380.0, 15.0)?,
            pressure: Normal::new(18.0, 2.0)?,
            load: Normal::new(0.65, 0.15)?,
            vibration_x: Normal::new(0.15, 0.05)?,
            vibration_y: Normal::new(0.10, 0.03)?,
            ultrasonic_amplitude: Normal::new(50.0, 10.0)?,
            ultrasonic_time: Normal::new(13.0, 1.0)?,
        })
    }

    fn sample(&mut self) -> SensorReading {
        SensorReading {
            temperature: self.temperature.sample(&mut self.rng),
            pressure: self.pressure.sample(&mut self.rng),
            load: self.load.sample(&mut self.rng).clamp(0.1, 0.9),
            vibration_x: self.vibration_x.sample(&mut self.rng),
            vibration_y: self.vibration_y.sample(&mut self.rng),
            ultrasonic_amplitude: self.ultrasonic_amplitude.sample(&mut self.rng),
            ultrasonic_time: self.ultrasonic_time.sample(&mut self.rng),
            captured_at: Utc::now(),
        }
    }
}

/// write `rows` samples (plus header) to any writer
pub fn generate<W: Write>(writer: W, rows: usize, seed: u64) -> Result<DatasetSummary, DatasetError> {
    let mut sampler = Sampler::new(seed)?;
    let mut out = csv::Writer::from_writer(writer);

    let mut damage = DamageAccumulators::ZERO;
    let mut prior_load = INITIAL_PRIOR_LOAD;
    let mut failures = 0;

    for _ in 0..rows {
        let reading = sampler.sample();
        damage = simulator::accumulate(&damage, prior_load, &reading);
        prior_load = reading.load;

        let health = scorer::score(&damage);
        let failing = health < FAILURE_HEALTH_THRESHOLD;
        failures += usize::from(failing);

        out.serialize(TrainingRow {
            temperature: reading.temperature,
            pressure: reading.pressure,
            load: reading.load,
            vibration_x: reading.vibration_x,
            vibration_y: reading.vibration_y,
            vibration_mag: reading.vibration_magnitude(),
            ultrasonic_amplitude: reading.ultrasonic_amplitude,
            ultrasonic_time: reading.ultrasonic_time,
            fatigue: damage.fatigue,
            creep: damage.creep,
            corrosion: damage.corrosion,
            crack_growth: damage.crack_growth,
            health,
            failure_30d: u8::from(failing),
        })?;
    }
    out.flush().map_err(csv::Error::from)?;

    Ok(DatasetSummary { rows, failures })
}

/// create (or truncate) `path`, creating parent directories as needed
pub fn write_to_path(path: &Path, rows: usize, seed: u64) -> Result<DatasetSummary, DatasetError> {
    generate(create_output(path)?, rows, seed)
}

pub(crate) fn create_output(path: &Path) -> Result<BufWriter<File>, DatasetError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(csv::Error::from)?;
    }
    let file = File::create(path).map_err(csv::Error::from)?;
    Ok(BufWriter::new(file))
}
