//! ==============================================================================
//! sensor_data.rs - raw sensor time series for demos
//! ==============================================================================
//!
//! purpose:
//!     writes unlabelled sensor logs that look like a month of plant history:
//!     slow upward drift, a daily temperature cycle, a 12-hour load cycle, and
//!     a sprinkling of injected faults (spikes, drifts, stuck sensors, noise
//!     bursts). each row also carries the derived columns an analyst would
//!     compute first.
//!
//! relationships:
//!     - uses: dataset.rs (create_output)
//!     - used by: main.rs (generate-sensor-data command)
//!
//! the series is sampled every 10 minutes, so 144 rows are one day.
//!
//! ==============================================================================

use std::f64::consts::TAU;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Datelike, Duration, Timelike, Utc};
use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::Serialize;

use crate::dataset;
use crate::error::DatasetError;

pub const SAMPLE_INTERVAL_MINUTES: i64 = 10;

/// share of rows that start an anomaly
pub const ANOMALY_RATE: f64 = 0.02;

/// rolling statistics cover the last hour
pub const ROLLING_WINDOW: usize = 6;

const SAMPLES_PER_DAY: f64 = 144.0;
const LOAD_MIN: f64 = 0.45;
const LOAD_MAX: f64 = 0.95;

// ==============================================================================
// samples
// ==============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct SensorSample {
    pub timestamp: DateTime<Utc>,
    /// 1-based
    pub time_index: usize,
    pub temperature: f64,
    pub pressure: f64,
    pub load: f64,
    pub vibration_x: f64,
    pub vibration_y: f64,
    pub ultrasonic_amplitude: i64,
    pub ultrasonic_time: f64,
}

/// the sensors an anomaly can land on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Temperature,
    Pressure,
    Load,
    VibrationX,
    VibrationY,
}

impl Channel {
    fn value(self, sample: &SensorSample) -> f64 {
        match self {
            Self::Temperature => sample.temperature,
            Self::Pressure => sample.pressure,
            Self::Load => sample.load,
            Self::VibrationX => sample.vibration_x,
            Self::VibrationY => sample.vibration_y,
        }
    }

    fn value_mut(self, sample: &mut SensorSample) -> &mut f64 {
        match self {
            Self::Temperature => &mut sample.temperature,
            Self::Pressure => &mut sample.pressure,
            Self::Load => &mut sample.load,
            Self::VibrationX => &mut sample.vibration_x,
            Self::VibrationY => &mut sample.vibration_y,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnomalyKind {
    /// one-sample jump
    Spike,
    /// linearly growing offset over 5..20 samples
    Drift,
    /// value frozen for 6..15 samples
    Stuck,
    /// one random offset held for 4..8 samples
    Noise,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Anomaly {
    pub index: usize,
    pub kind: AnomalyKind,
    pub channel: Channel,
}

#[derive(Debug, Clone)]
pub struct SeriesOptions {
    pub rows: usize,
    pub seed: u64,
    pub include_anomalies: bool,
    pub start: DateTime<Utc>,
}

impl SeriesOptions {
    /// a month of history ending now, anomalies on
    pub fn new(rows: usize, seed: u64) -> Self {
        Self {
            rows,
            seed,
            include_anomalies: true,
            start: Utc::now() - Duration::days(30),
        }
    }
}

/// build the series and inject anomalies. returned anomalies are sorted by index.
pub fn generate_series(
    options: &SeriesOptions,
) -> Result<(Vec<SensorSample>, Vec<Anomaly>), DatasetError> {
    let n = options.rows;
    let mut rng = StdRng::seed_from_u64(options.seed);

    let temperature_noise = draw_noise(&mut rng, 1.5, n)?;
    let pressure_noise = draw_noise(&mut rng, 0.1, n)?;
    let load_noise = draw_noise(&mut rng, 0.02, n)?;
    let vibration_x_noise = draw_noise(&mut rng, 0.02, n)?;
    let vibration_y_noise = draw_noise(&mut rng, 0.015, n)?;
    let amplitude_noise = draw_noise(&mut rng, 1.5, n)?;
    let time_noise = draw_noise(&mut rng, 0.15, n)?;

    let mut samples = Vec::with_capacity(n);
    for i in 0..n {
        let t = i as f64;

        let temperature =
            375.0 + 0.08 * t + 5.0 * (TAU * t / SAMPLES_PER_DAY).sin() + temperature_noise[i];
        let pressure = 17.5 + 0.005 * t + 0.03 * (temperature - 375.0) + pressure_noise[i];
        let load = (0.55 + 0.00015 * t + 0.1 * (TAU * t / 72.0).sin() + load_noise[i])
            .clamp(LOAD_MIN, LOAD_MAX);

        let vibration_base = 0.08 + 0.0001 * t;
        let vibration_x = vibration_base + 0.15 * (load - 0.55) + vibration_x_noise[i];
        let vibration_y = vibration_base * 0.7 + 0.1 * (load - 0.55) + vibration_y_noise[i];

        let amplitude = 40.0 + 0.015 * t + 5.0 * (TAU * t / 288.0).sin() + amplitude_noise[i];
        let ultrasonic_time = 12.0 + 0.0025 * t + time_noise[i];

        samples.push(SensorSample {
            timestamp: options.start + Duration::minutes(SAMPLE_INTERVAL_MINUTES * i as i64),
            time_index: i + 1,
            temperature: round_to(temperature, 1),
            pressure: round_to(pressure, 1),
            load: round_to(load, 2),
            vibration_x: round_to(vibration_x, 2),
            vibration_y: round_to(vibration_y, 2),
            ultrasonic_amplitude: amplitude.round() as i64,
            ultrasonic_time: round_to(ultrasonic_time, 1),
        });
    }

    let anomalies = if options.include_anomalies {
        inject_anomalies(&mut samples, &mut rng)?
    } else {
        Vec::new()
    };
    Ok((samples, anomalies))
}

fn draw_noise(rng: &mut StdRng, sigma: f64, n: usize) -> Result<Vec<f64>, DatasetError> {
    Ok(Normal::new(0.0, sigma)?.sample_iter(rng).take(n).collect())
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

fn pick(rng: &mut StdRng, channels: &[Channel]) -> Channel {
    channels[rng.gen_range(0..channels.len())]
}

fn inject_anomalies(
    samples: &mut [SensorSample],
    rng: &mut StdRng,
) -> Result<Vec<Anomaly>, DatasetError> {
    use Channel::*;

    let count = (ANOMALY_RATE * samples.len() as f64) as usize;
    let starts = index::sample(rng, samples.len(), count).into_vec();
    let mut anomalies = Vec::with_capacity(count);

    for start in starts {
        let anomaly = match rng.gen_range(0..4) {
            0 => {
                let channel = pick(rng, &[Temperature, Pressure, VibrationX, VibrationY]);
                let size = if channel == Temperature {
                    rng.gen_range(10.0..50.0)
                } else {
                    rng.gen_range(5.0..20.0)
                };
                *channel.value_mut(&mut samples[start]) += size;
                Anomaly { index: start, kind: AnomalyKind::Spike, channel }
            }
            1 => {
                let length = rng.gen_range(5..20);
                let channel = pick(rng, &[Temperature, Pressure]);
                let rate = if channel == Temperature {
                    rng.gen_range(0.5..2.0)
                } else {
                    rng.gen_range(0.1..0.5)
                };
                for (i, sample) in samples[start..].iter_mut().take(length).enumerate() {
                    *channel.value_mut(sample) += rate * (i + 1) as f64;
                }
                Anomaly { index: start, kind: AnomalyKind::Drift, channel }
            }
            2 => {
                let channel = pick(rng, &[Temperature, Pressure, Load]);
                let held = channel.value(&samples[start]);
                let extra = rng.gen_range(5..15);
                for sample in samples[start..].iter_mut().take(extra + 1) {
                    *channel.value_mut(sample) = held;
                }
                Anomaly { index: start, kind: AnomalyKind::Stuck, channel }
            }
            _ => {
                let channel = pick(rng, &[VibrationX, VibrationY]);
                let level = rng.gen_range(0.1..0.3);
                let extra = rng.gen_range(3..8);
                let offset = Normal::new(0.0, level)?.sample(rng);
                for sample in samples[start..].iter_mut().take(extra + 1) {
                    *channel.value_mut(sample) += offset;
                }
                Anomaly { index: start, kind: AnomalyKind::Noise, channel }
            }
        };
        anomalies.push(anomaly);
    }

    anomalies.sort_by_key(|a| a.index);
    Ok(anomalies)
}

// ==============================================================================
// derived columns
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Shift {
    Night,
    Day,
    Evening,
}

impl Shift {
    /// hours 0-8 night, 9-16 day, 17-23 evening
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            0..=8 => Self::Night,
            9..=16 => Self::Day,
            _ => Self::Evening,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorDataRow {
    pub timestamp: DateTime<Utc>,
    pub time_index: usize,
    pub temperature: f64,
    pub pressure: f64,
    pub load: f64,
    pub vibration_x: f64,
    pub vibration_y: f64,
    pub ultrasonic_amplitude: i64,
    pub ultrasonic_time: f64,
    pub hour: u32,
    /// monday = 0
    pub day_of_week: u32,
    pub is_weekend: u8,
    pub shift: Shift,
    pub temp_pressure_ratio: f64,
    pub vibration_magnitude: f64,
    pub load_efficiency: f64,
    pub temp_change_rate: f64,
    pub pressure_change_rate: f64,
    pub temp_rolling_avg: f64,
    /// empty until the window holds two samples
    pub vibration_rolling_std: Option<f64>,
}

pub fn derive_rows(samples: &[SensorSample]) -> Vec<SensorDataRow> {
    let magnitudes: Vec<f64> = samples
        .iter()
        .map(|s| s.vibration_x.hypot(s.vibration_y))
        .collect();

    samples
        .iter()
        .enumerate()
        .map(|(i, sample)| {
            let (temp_change_rate, pressure_change_rate) = match i.checked_sub(1) {
                Some(p) => (
                    sample.temperature - samples[p].temperature,
                    sample.pressure - samples[p].pressure,
                ),
                None => (0.0, 0.0),
            };

            let from = (i + 1).saturating_sub(ROLLING_WINDOW);
            let window = &samples[from..=i];
            let temp_rolling_avg =
                window.iter().map(|s| s.temperature).sum::<f64>() / window.len() as f64;

            let day_of_week = sample.timestamp.weekday().num_days_from_monday();
            let hour = sample.timestamp.hour();

            SensorDataRow {
                timestamp: sample.timestamp,
                time_index: sample.time_index,
                temperature: sample.temperature,
                pressure: sample.pressure,
                load: sample.load,
                vibration_x: sample.vibration_x,
                vibration_y: sample.vibration_y,
                ultrasonic_amplitude: sample.ultrasonic_amplitude,
                ultrasonic_time: sample.ultrasonic_time,
                hour,
                day_of_week,
                is_weekend: u8::from(day_of_week >= 5),
                shift: Shift::from_hour(hour),
                temp_pressure_ratio: sample.temperature / sample.pressure,
                vibration_magnitude: magnitudes[i],
                load_efficiency: sample.load / (sample.temperature / 100.0),
                temp_change_rate,
                pressure_change_rate,
                temp_rolling_avg,
                vibration_rolling_std: sample_std(&magnitudes[from..=i]),
            }
        })
        .collect()
}

fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Some(variance.sqrt())
}

// ==============================================================================
// csv output
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesSummary {
    pub rows: usize,
    pub anomalies: usize,
}

pub fn generate<W: Write>(writer: W, options: &SeriesOptions) -> Result<SeriesSummary, DatasetError> {
    let (samples, anomalies) = generate_series(options)?;

    let mut out = csv::Writer::from_writer(writer);
    for row in derive_rows(&samples) {
        out.serialize(row)?;
    }
    out.flush().map_err(csv::Error::from)?;

    Ok(SeriesSummary {
        rows: samples.len(),
        anomalies: anomalies.len(),
    })
}

pub fn write_to_path(path: &Path, options: &SeriesOptions) -> Result<SeriesSummary, DatasetError> {
    generate(dataset::create_output(path)?, options)
}

// ==============================================================================
// fixed example table
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SmallRow {
    pub time: u32,
    pub temperature: f64,
    pub pressure: f64,
    pub load: f64,
    pub vibration_x: f64,
    pub vibration_y: f64,
    pub ultrasonic_amplitude: u32,
    pub ultrasonic_time: f64,
}

// temperature, pressure, load, vibration_x, vibration_y, amplitude, time
const SMALL_TABLE: [(f64, f64, f64, f64, f64, u32, f64); 8] = [
    (380.0, 18.0, 0.60, 0.12, 0.08, 45, 12.5),
    (382.0, 18.3, 0.62, 0.13, 0.09, 46, 12.7),
    (385.0, 18.6, 0.65, 0.15, 0.10, 48, 13.0),
    (387.0, 18.9, 0.67, 0.16, 0.11, 50, 13.3),
    (390.0, 19.2, 0.70, 0.18, 0.12, 53, 13.6),
    (392.0, 19.5, 0.73, 0.20, 0.14, 55, 13.9),
    (395.0, 19.8, 0.76, 0.22, 0.15, 58, 14.2),
    (398.0, 20.1, 0.80, 0.25, 0.17, 62, 14.5),
];

/// the eight hand-written readings; row 3 is the monitor's default reading
pub fn small_dataset() -> Vec<SmallRow> {
    SMALL_TABLE
        .iter()
        .zip(1..)
        .map(|(&(temperature, pressure, load, vx, vy, amplitude, time), index)| SmallRow {
            time: index,
            temperature,
            pressure,
            load,
            vibration_x: vx,
            vibration_y: vy,
            ultrasonic_amplitude: amplitude,
            ultrasonic_time: time,
        })
        .collect()
}

pub fn write_small<W: Write>(writer: W) -> Result<usize, DatasetError> {
    let rows = small_dataset();
    let mut out = csv::Writer::from_writer(writer);
    for row in &rows {
        out.serialize(row)?;
    }
    out.flush().map_err(csv::Error::from)?;
    Ok(rows.len())
}

pub fn write_small_to_path(path: &Path) -> Result<usize, DatasetError> {
    write_small(dataset::create_output(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SensorReading;
    use chrono::TimeZone;

    // a saturday
    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
    }

    fn options(rows: usize, include_anomalies: bool) -> SeriesOptions {
        SeriesOptions {
            rows,
            seed: 42,
            include_anomalies,
            start: start(),
        }
    }

    fn sample(temperature: f64, pressure: f64, vibration_x: f64, vibration_y: f64) -> SensorSample {
        SensorSample {
            timestamp: start(),
            time_index: 1,
            temperature,
            pressure,
            load: 0.6,
            vibration_x,
            vibration_y,
            ultrasonic_amplitude: 45,
            ultrasonic_time: 12.5,
        }
    }

    #[test]
    fn anomaly_count_is_two_percent() {
        let (samples, anomalies) = generate_series(&options(500, true)).unwrap();
        assert_eq!(samples.len(), 500);
        assert_eq!(anomalies.len(), 10);

        let mut indices: Vec<usize> = anomalies.iter().map(|a| a.index).collect();
        indices.dedup();
        assert_eq!(indices.len(), 10);
        assert!(indices.iter().all(|&i| i < 500));

        // fewer than 50 rows rounds down to none
        let (_, anomalies) = generate_series(&options(49, true)).unwrap();
        assert!(anomalies.is_empty());
    }

    #[test]
    fn anomalies_only_touch_their_own_neighbourhood() {
        let (clean, none) = generate_series(&options(1000, false)).unwrap();
        let (noisy, anomalies) = generate_series(&options(1000, true)).unwrap();
        assert!(none.is_empty());
        assert_eq!(anomalies.len(), 20);
        assert_ne!(clean, noisy);

        // the longest anomaly (drift) spans at most 19 samples
        for (i, (a, b)) in clean.iter().zip(&noisy).enumerate() {
            let near = anomalies.iter().any(|an| (an.index..an.index + 20).contains(&i));
            if !near {
                assert_eq!(a, b, "row {i} changed away from any anomaly");
            }
        }
    }

    #[test]
    fn clean_series_shape() {
        let (samples, _) = generate_series(&options(288, false)).unwrap();

        assert_eq!(samples[0].time_index, 1);
        assert_eq!(samples[0].timestamp, start());
        assert_eq!(samples[1].timestamp - samples[0].timestamp, Duration::minutes(10));
        assert!(samples.iter().all(|s| (LOAD_MIN..=LOAD_MAX).contains(&s.load)));

        // load and vibrations are stored to 2 decimals
        for s in &samples {
            assert!(((s.load * 100.0).round() - s.load * 100.0).abs() < 1e-9);
            assert!(((s.temperature * 10.0).round() - s.temperature * 10.0).abs() < 1e-9);
        }

        // the upward drift outweighs the daily cycle over two days
        let first_day: f64 = samples[..144].iter().map(|s| s.temperature).sum::<f64>() / 144.0;
        let second_day: f64 = samples[144..].iter().map(|s| s.temperature).sum::<f64>() / 144.0;
        assert!(second_day > first_day + 5.0);
    }

    #[test]
    fn same_seed_same_file() {
        let mut a = Vec::new();
        let mut b = Vec::new();
        generate(&mut a, &options(100, true)).unwrap();
        generate(&mut b, &options(100, true)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn derived_columns() {
        let samples = vec![
            sample(380.0, 19.0, 0.3, 0.4),
            sample(382.0, 19.5, 0.6, 0.8),
            sample(386.0, 19.0, 0.3, 0.4),
        ];
        let rows = derive_rows(&samples);

        assert_eq!(rows[0].temp_pressure_ratio, 20.0);
        assert!((rows[0].vibration_magnitude - 0.5).abs() < 1e-12);
        assert!((rows[0].load_efficiency - 0.6 / 3.8).abs() < 1e-12);
        assert_eq!(rows[0].temp_change_rate, 0.0);
        assert_eq!(rows[0].pressure_change_rate, 0.0);
        assert_eq!(rows[0].temp_rolling_avg, 380.0);
        assert_eq!(rows[0].vibration_rolling_std, None);

        assert_eq!(rows[1].temp_change_rate, 2.0);
        assert_eq!(rows[1].pressure_change_rate, 0.5);
        assert_eq!(rows[1].temp_rolling_avg, 381.0);
        // magnitudes 0.5 and 1.0: sample std = 0.5 / sqrt(2)
        let std = rows[1].vibration_rolling_std.unwrap();
        assert!((std - 0.5 / 2f64.sqrt()).abs() < 1e-12);

        assert_eq!(rows[2].pressure_change_rate, -0.5);
        assert!((rows[2].temp_rolling_avg - 382.666_666_666_666_7).abs() < 1e-9);
    }

    #[test]
    fn rolling_window_drops_old_rows() {
        let samples: Vec<SensorSample> = (0..8)
            .map(|i| sample(380.0 + i as f64, 19.0, 0.3, 0.4))
            .collect();
        let rows = derive_rows(&samples);
        // rows 2..=7 -> mean of 382..387
        assert_eq!(rows[7].temp_rolling_avg, 384.5);
        // constant vibration -> no spread
        assert!(rows[7].vibration_rolling_std.unwrap() < 1e-12);
    }

    #[test]
    fn calendar_columns() {
        let (samples, _) = generate_series(&options(200, false)).unwrap();
        let rows = derive_rows(&samples);

        // saturday midnight
        assert_eq!(rows[0].day_of_week, 5);
        assert_eq!(rows[0].is_weekend, 1);
        assert_eq!(rows[0].shift, Shift::Night);
        // 10:00 saturday
        assert_eq!(rows[60].hour, 10);
        assert_eq!(rows[60].shift, Shift::Day);
        // sunday starts one day in
        assert_eq!(rows[144].day_of_week, 6);
        assert_eq!(rows[144 + 3].is_weekend, 1);
    }

    #[test]
    fn shift_boundaries() {
        assert_eq!(Shift::from_hour(0), Shift::Night);
        assert_eq!(Shift::from_hour(8), Shift::Night);
        assert_eq!(Shift::from_hour(9), Shift::Day);
        assert_eq!(Shift::from_hour(16), Shift::Day);
        assert_eq!(Shift::from_hour(17), Shift::Evening);
        assert_eq!(Shift::from_hour(23), Shift::Evening);
    }

    #[test]
    fn csv_has_derived_header() {
        let mut buf = Vec::new();
        let summary = generate(&mut buf, &options(60, true)).unwrap();
        assert_eq!(summary, SeriesSummary { rows: 60, anomalies: 1 });

        let mut reader = csv::Reader::from_reader(buf.as_slice());
        let header = reader.headers().unwrap().clone();
        assert_eq!(header.len(), 20);
        assert_eq!(&header[0], "timestamp");
        assert_eq!(&header[12], "shift");
        assert_eq!(&header[19], "vibration_rolling_std");

        let first = reader.records().next().unwrap().unwrap();
        assert_eq!(&first[19], "");
    }

    #[test]
    fn small_table_holds_default_reading() {
        let rows = small_dataset();
        assert_eq!(rows.len(), 8);
        assert_eq!(rows[0].time, 1);
        assert_eq!(rows[7].time, 8);

        let default = SensorReading::default();
        let third = rows[2];
        assert_eq!(third.temperature, default.temperature);
        assert_eq!(third.pressure, default.pressure);
        assert_eq!(third.load, default.load);
        assert_eq!(third.vibration_x, default.vibration_x);
        assert_eq!(third.vibration_y, default.vibration_y);
        assert_eq!(f64::from(third.ultrasonic_amplitude), default.ultrasonic_amplitude);
        assert_eq!(third.ultrasonic_time, default.ultrasonic_time);

        let mut buf = Vec::new();
        assert_eq!(write_small(&mut buf).unwrap(), 8);
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("time,temperature,pressure,load,"));
        assert_eq!(text.lines().count(), 9);
    }

    #[test]
    fn writes_small_into_new_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("demo").join("sensor_data_small.csv");
        assert_eq!(write_small_to_path(&path).unwrap(), 8);
        assert!(path.exists());
    }
}
