//! asset-monitor: simulated sensor readings, damage accumulation, failure
//! prediction and cost-based maintenance decisions behind a polling web
//! dashboard.
//!
//! The binary in `main.rs` wires these modules together; integration tests
//! drive `api::router` directly.

pub mod api;
pub mod config;
pub mod dashboard;
pub mod dataset;
pub mod decision;
pub mod domain;
pub mod error;
pub mod model;
pub mod scheduler;
pub mod scorer;
pub mod sensor_data;
pub mod simulator;
pub mod store;
