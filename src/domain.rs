//! ==============================================================================
//! domain.rs - monitoring data model
//! ==============================================================================
//!
//! purpose:
//!     the plain data shared by every other module: one sensor reading, the
//!     four damage accumulators, and the process-wide monitoring record.
//!
//! relationships:
//!     - mutated by: simulator.rs (tick)
//!     - owned by: store.rs (behind the single lock)
//!     - read by: scorer.rs, api.rs
//!
//! ==============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// one simulated sample of every sensor on the asset
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    /// metal temperature in celsius
    pub temperature: f64,
    /// line pressure in bar
    pub pressure: f64,
    /// fraction of rated load (0..1)
    pub load: f64,
    /// vibration along x in g
    pub vibration_x: f64,
    /// vibration along y in g
    pub vibration_y: f64,
    /// ultrasonic echo amplitude in dB
    pub ultrasonic_amplitude: f64,
    /// ultrasonic time-of-flight in microseconds
    pub ultrasonic_time: f64,
    /// when the sample was taken
    pub captured_at: DateTime<Utc>,
}

impl SensorReading {
    pub fn vibration_magnitude(&self) -> f64 {
        self.vibration_x.hypot(self.vibration_y)
    }

    pub fn ultrasonic_energy(&self) -> f64 {
        self.ultrasonic_amplitude * self.ultrasonic_time
    }
}

impl Default for SensorReading {
    fn default() -> Self {
        Self {
            temperature: 385.0,
            pressure: 18.6,
            load: 0.65,
            vibration_x: 0.15,
            vibration_y: 0.10,
            ultrasonic_amplitude: 48.0,
            ultrasonic_time: 13.0,
            captured_at: Utc::now(),
        }
    }
}

/// cumulative degradation proxies. every field only ever grows.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DamageAccumulators {
    pub fatigue: f64,
    pub creep: f64,
    pub corrosion: f64,
    pub crack_growth: f64,
}

impl DamageAccumulators {
    /// fresh, undamaged asset
    pub const ZERO: Self = Self {
        fatigue: 0.0,
        creep: 0.0,
        corrosion: 0.0,
        crack_growth: 0.0,
    };
}

impl Default for DamageAccumulators {
    /// mid-life asset the dashboard starts from
    fn default() -> Self {
        Self {
            fatigue: 0.12,
            creep: 0.008,
            corrosion: 0.15,
            crack_growth: 0.09,
        }
    }
}

/// the single process-wide record
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MonitoringState {
    pub running: bool,
    pub reading: SensorReading,
    pub damage: DamageAccumulators,
    /// ticks applied since startup or the last reset
    pub ticks: u64,
}

impl MonitoringState {
    pub fn new(running: bool) -> Self {
        Self {
            running,
            reading: SensorReading::default(),
            damage: DamageAccumulators::default(),
            ticks: 0,
        }
    }

    /// true when everything except the capture time matches the defaults
    pub fn is_default(&self, running: bool) -> bool {
        let defaults = Self::new(running);
        let reading = SensorReading {
            captured_at: defaults.reading.captured_at,
            ..self.reading.clone()
        };
        self.running == defaults.running
            && self.damage == defaults.damage
            && self.ticks == 0
            && reading == defaults.reading
    }
}
