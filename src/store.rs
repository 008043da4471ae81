//! ==============================================================================
//! store.rs - the single shared monitoring record
//! ==============================================================================
//!
//! purpose:
//!     owns MonitoringState and the Simulator that mutates it. both sit behind
//!     one lock so a tick replaces the reading and the damage together and no
//!     reader ever sees half of an update.
//!
//! relationships:
//!     - written by: scheduler.rs (tick_if_running), api.rs (tick, start/stop, reset)
//!     - read by: api.rs (get)
//!
//! we use arc<rwlock<>> for thread-safe sharing:
//! - arc: reference-counted pointer, cloned into every handler and the scheduler
//! - rwlock: many concurrent readers OR one ticking writer
//!
//! ==============================================================================

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::domain::MonitoringState;
use crate::simulator::Simulator;

struct Inner {
    state: MonitoringState,
    simulator: Simulator,
}

#[derive(Clone)]
pub struct StateStore {
    inner: Arc<RwLock<Inner>>,
    /// running flag restored by reset()
    default_running: bool,
}

impl StateStore {
    pub fn new(simulator: Simulator, default_running: bool) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner {
                state: MonitoringState::new(default_running),
                simulator,
            })),
            default_running,
        }
    }

    /// consistent copy of the current record
    pub async fn get(&self) -> MonitoringState {
        self.inner.read().await.state.clone()
    }

    /// back to the startup defaults. the simulator keeps its rng position.
    pub async fn reset(&self) -> MonitoringState {
        let mut inner = self.inner.write().await;
        inner.state = MonitoringState::new(self.default_running);
        inner.state.clone()
    }

    pub async fn set_running(&self, running: bool) -> bool {
        let mut inner = self.inner.write().await;
        inner.state.running = running;
        running
    }

    /// one forced step, regardless of the running flag
    pub async fn tick(&self) -> MonitoringState {
        let mut guard = self.inner.write().await;
        let Inner { state, simulator } = &mut *guard;
        simulator.tick(state);
        state.clone()
    }

    /// scheduled step: only advances while running. returns the new state if it ticked.
    pub async fn tick_if_running(&self) -> Option<MonitoringState> {
        let mut guard = self.inner.write().await;
        let Inner { state, simulator } = &mut *guard;
        if !state.running {
            return None;
        }
        simulator.tick(state);
        Some(state.clone())
    }
}
