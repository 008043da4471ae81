//! Periodic simulation tick.
//!
//! Spawned once at startup. Every `period` it advances the store (only while
//! monitoring is running) and checks the model artifact for a newer version.
//! Runs until `cancel` is triggered.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::model::FailureModel;
use crate::scorer;
use crate::store::StateStore;

pub struct Scheduler {
    store: StateStore,
    model: Arc<dyn FailureModel>,
    period: Duration,
    show_sensor_data: bool,
}

impl Scheduler {
    pub fn new(
        store: StateStore,
        model: Arc<dyn FailureModel>,
        period: Duration,
        show_sensor_data: bool,
    ) -> Self {
        Self {
            store,
            model,
            period,
            show_sensor_data,
        }
    }

    pub async fn run(self, cancel: CancellationToken) {
        tracing::info!(interval_secs = self.period.as_secs(), "Tick scheduler started");

        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // the first tick of an interval fires immediately; start one period in
        interval.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Tick scheduler stopping");
                    break;
                }
                _ = interval.tick() => self.step().await,
            }
        }
    }

    async fn step(&self) {
        match self.model.reload_if_changed() {
            Ok(true) => tracing::info!("Failure model reloaded"),
            Ok(false) => {}
            Err(e) => tracing::error!(error = %e, "Failure model reload failed, keeping previous model"),
        }

        let Some(state) = self.store.tick_if_running().await else {
            tracing::trace!("Monitoring stopped, tick skipped");
            return;
        };

        if self.show_sensor_data {
            let r = &state.reading;
            tracing::info!(
                tick = state.ticks,
                temperature = r.temperature,
                pressure = r.pressure,
                load = r.load,
                vibration = r.vibration_magnitude(),
                health = scorer::score(&state.damage),
                "Sensor reading"
            );
        } else {
            tracing::debug!(tick = state.ticks, "Tick applied");
        }
    }
}
