//! ==============================================================================
//! scorer.rs - health index and feature assembly
//! ==============================================================================
//!
//! purpose:
//!     turns the damage accumulators into a [0,1] health index and assembles
//!     the nine-feature vector the failure model was fitted on.
//!
//! relationships:
//!     - reads: domain.rs (SensorReading, DamageAccumulators)
//!     - calls: model.rs (FailureModel::predict)
//!     - used by: api.rs, main.rs predict
//!
//! ==============================================================================

use serde::Serialize;

use crate::domain::{DamageAccumulators, SensorReading};
use crate::error::ModelError;
use crate::model::FailureModel;

// weights of each mechanism in the health index. they sum to 1.
pub const FATIGUE_WEIGHT: f64 = 0.3;
pub const CREEP_WEIGHT: f64 = 0.25;
pub const CORROSION_WEIGHT: f64 = 0.2;
pub const CRACK_GROWTH_WEIGHT: f64 = 0.25;

/// column order the model artifact must declare
pub const FEATURE_NAMES: [&str; 9] = [
    "fatigue",
    "creep",
    "corrosion",
    "crack_growth",
    "health",
    "temperature",
    "load",
    "vibration_mag",
    "ultrasonic_energy",
];

/// 1 = pristine, 0 = failed
pub fn score(damage: &DamageAccumulators) -> f64 {
    let weighted = FATIGUE_WEIGHT * damage.fatigue
        + CREEP_WEIGHT * damage.creep
        + CORROSION_WEIGHT * damage.corrosion
        + CRACK_GROWTH_WEIGHT * damage.crack_growth;
    let health = 1.0 - weighted;

    if health.is_finite() {
        health.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// engineered inputs for the classifier, in `FEATURE_NAMES` order
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct FeatureVector(pub [f64; 9]);

impl FeatureVector {
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }
}

pub fn features(reading: &SensorReading, damage: &DamageAccumulators) -> FeatureVector {
    FeatureVector([
        damage.fatigue,
        damage.creep,
        damage.corrosion,
        damage.crack_growth,
        score(damage),
        reading.temperature,
        reading.load,
        reading.vibration_magnitude(),
        reading.ultrasonic_energy(),
    ])
}

/// ask the model for P(failure within 30 days), clamped to [0,1]
pub fn predict_failure_probability(
    model: &dyn FailureModel,
    reading: &SensorReading,
    damage: &DamageAccumulators,
) -> Result<f64, ModelError> {
    let probability = model.predict(&features(reading, damage))?;
    if !probability.is_finite() {
        return Err(ModelError::NonFiniteOutput(probability));
    }
    Ok(probability.clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(f64);

    impl FailureModel for Fixed {
        fn predict(&self, _features: &FeatureVector) -> Result<f64, ModelError> {
            Ok(self.0)
        }
    }

    #[test]
    fn worked_example() {
        let damage = DamageAccumulators {
            fatigue: 0.1,
            creep: 0.05,
            corrosion: 0.02,
            crack_growth: 0.1,
        };
        assert!((score(&damage) - 0.9285).abs() < 1e-12);
    }

    #[test]
    fn health_clamps_at_extremes() {
        assert_eq!(score(&DamageAccumulators::ZERO), 1.0);

        let saturated = DamageAccumulators {
            fatigue: 1.0,
            creep: 1.0,
            corrosion: 1.0,
            crack_growth: 1.0,
        };
        assert_eq!(score(&saturated), 0.0);

        let huge = DamageAccumulators {
            fatigue: 1e9,
            creep: 1e9,
            corrosion: 1e9,
            crack_growth: 1e9,
        };
        assert_eq!(score(&huge), 0.0);

        let broken = DamageAccumulators {
            fatigue: f64::INFINITY,
            ..DamageAccumulators::ZERO
        };
        assert_eq!(score(&broken), 0.0);
    }

    #[test]
    fn health_always_in_unit_interval() {
        let mut value = 0.0;
        while value < 10.0 {
            let damage = DamageAccumulators {
                fatigue: value,
                creep: value / 2.0,
                corrosion: value / 3.0,
                crack_growth: value / 4.0,
            };
            let health = score(&damage);
            assert!((0.0..=1.0).contains(&health), "health {health} for {value}");
            value += 0.05;
        }
    }

    #[test]
    fn feature_vector_order() {
        let reading = SensorReading {
            temperature: 390.0,
            load: 0.7,
            vibration_x: 0.3,
            vibration_y: 0.4,
            ultrasonic_amplitude: 50.0,
            ultrasonic_time: 10.0,
            ..SensorReading::default()
        };
        let damage = DamageAccumulators {
            fatigue: 0.1,
            creep: 0.05,
            corrosion: 0.02,
            crack_growth: 0.1,
        };
        let f = features(&reading, &damage).0;

        assert_eq!(f[0], 0.1);
        assert_eq!(f[3], 0.1);
        assert!((f[4] - 0.9285).abs() < 1e-12);
        assert_eq!(f[5], 390.0);
        assert_eq!(f[6], 0.7);
        assert!((f[7] - 0.5).abs() < 1e-12);
        assert!((f[8] - 500.0).abs() < 1e-12);
    }

    #[test]
    fn probability_is_clamped() {
        let reading = SensorReading::default();
        let damage = DamageAccumulators::default();

        let p = predict_failure_probability(&Fixed(1.7), &reading, &damage).unwrap();
        assert_eq!(p, 1.0);
        let p = predict_failure_probability(&Fixed(-0.2), &reading, &damage).unwrap();
        assert_eq!(p, 0.0);
    }

    #[test]
    fn non_finite_probability_is_an_error() {
        let result = predict_failure_probability(
            &Fixed(f64::NAN),
            &SensorReading::default(),
            &DamageAccumulators::default(),
        );
        assert!(matches!(result, Err(ModelError::NonFiniteOutput(_))));
    }
}
