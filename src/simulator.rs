//! ==============================================================================
//! simulator.rs - synthetic sensor source and damage model
//! ==============================================================================
//!
//! purpose:
//!     stands in for real hardware. each tick jitters every sensor value around
//!     its previous value and folds the new reading into the damage
//!     accumulators with fixed linear increments.
//!
//! relationships:
//!     - used by: store.rs (tick under the state lock)
//!     - used by: dataset.rs, main.rs predict (accumulate only)
//!
//! damage model (per tick, every increment >= 0):
//!
//! ```text
//! fatigue      += 0.02 * |load - prior_load| + 0.01 * vibration_magnitude
//! creep        += 0.00001 * temperature
//! corrosion    += 0.001
//! crack_growth += 0.0005 * ultrasonic_amplitude + 0.001 * ultrasonic_time
//! ```
//!
//! ==============================================================================

use std::ops::RangeInclusive;

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::domain::{DamageAccumulators, MonitoringState, SensorReading};

/// default jitter: +/- 2% of the previous value per tick
pub const DEFAULT_JITTER: f64 = 0.02;

/// a factor of 1 - jitter must stay positive
pub const MAX_JITTER: f64 = 0.99;

// plausibility bands. a reading never leaves these no matter how long the walk runs.
pub const TEMPERATURE_BAND: RangeInclusive<f64> = 340.0..=440.0;
pub const PRESSURE_BAND: RangeInclusive<f64> = 14.0..=24.0;
pub const LOAD_BAND: RangeInclusive<f64> = 0.1..=0.9;
pub const VIBRATION_BAND: RangeInclusive<f64> = 0.01..=0.5;
pub const ULTRASONIC_AMPLITUDE_BAND: RangeInclusive<f64> = 20.0..=90.0;
pub const ULTRASONIC_TIME_BAND: RangeInclusive<f64> = 10.0..=18.0;

pub struct Simulator {
    rng: StdRng,
    jitter: f64,
}

impl Simulator {
    /// `seed: None` draws the seed from the os. a non-finite jitter means no
    /// jitter; anything larger than MAX_JITTER is capped.
    pub fn new(seed: Option<u64>, jitter: f64) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng,
            jitter: if jitter.is_finite() {
                jitter.abs().min(MAX_JITTER)
            } else {
                0.0
            },
        }
    }

    /// advance the state by one step: new reading, then damage from it
    pub fn tick(&mut self, state: &mut MonitoringState) {
        let next = self.next_reading(&state.reading);
        state.damage = accumulate(&state.damage, state.reading.load, &next);
        state.reading = next;
        state.ticks += 1;
    }

    /// jitter each field of `prior` and clamp it back into its band
    pub fn next_reading(&mut self, prior: &SensorReading) -> SensorReading {
        SensorReading {
            temperature: self.perturb(prior.temperature, TEMPERATURE_BAND),
            pressure: self.perturb(prior.pressure, PRESSURE_BAND),
            load: self.perturb(prior.load, LOAD_BAND),
            vibration_x: self.perturb(prior.vibration_x, VIBRATION_BAND),
            vibration_y: self.perturb(prior.vibration_y, VIBRATION_BAND),
            ultrasonic_amplitude: self.perturb(prior.ultrasonic_amplitude, ULTRASONIC_AMPLITUDE_BAND),
            ultrasonic_time: self.perturb(prior.ultrasonic_time, ULTRASONIC_TIME_BAND),
            captured_at: Utc::now(),
        }
    }

    fn perturb(&mut self, value: f64, band: RangeInclusive<f64>) -> f64 {
        let factor = if self.jitter > 0.0 {
            1.0 + self.rng.gen_range(-self.jitter..=self.jitter)
        } else {
            1.0
        };
        (value * factor).clamp(*band.start(), *band.end())
    }
}

/// fold one reading into the accumulators
///
/// `prior_load` is the load of the reading this one supersedes; pass the
/// reading's own load when there is no predecessor.
pub fn accumulate(
    damage: &DamageAccumulators,
    prior_load: f64,
    reading: &SensorReading,
) -> DamageAccumulators {
    let fatigue = 0.02 * (reading.load - prior_load).abs() + 0.01 * reading.vibration_magnitude();
    let creep = 0.00001 * reading.temperature;
    let corrosion = 0.001;
    let crack_growth = 0.0005 * reading.ultrasonic_amplitude + 0.001 * reading.ultrasonic_time;

    DamageAccumulators {
        fatigue: damage.fatigue + non_negative(fatigue),
        creep: damage.creep + non_negative(creep),
        corrosion: damage.corrosion + non_negative(corrosion),
        crack_growth: damage.crack_growth + non_negative(crack_growth),
    }
}

// NaN also maps to 0 so an accumulator can never go backwards
fn non_negative(increment: f64) -> f64 {
    if increment > 0.0 {
        increment
    } else {
        0.0
    }
}
