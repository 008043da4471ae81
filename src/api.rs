//! ==============================================================================
//! api.rs - web server routes
//! ==============================================================================
//!
//! purpose:
//!     the HTTP face of the monitor. every route is a parameterless GET.
//!
//! ```text
//! /              html dashboard (polls /api/data)
//! /api/data      current assessment, read only
//! /api/update    one forced tick, then the assessment
//! /api/start     running = true
//! /api/stop      running = false
//! /api/reset     monitoring state back to defaults
//! /health        liveness, never touches the state
//! ```
//!
//! relationships:
//!     - uses: store.rs (state), scorer.rs + model.rs (probability),
//!       decision.rs (recommendation), dashboard.rs (html)
//!
//! scoring happens on a cloned snapshot after the state lock is released.
//!
//! ==============================================================================

use std::sync::Arc;

use axum::{
    extract::State,
    response::{Html, Json},
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::dashboard;
use crate::decision::{CostPolicy, Recommendation};
use crate::domain::{DamageAccumulators, MonitoringState, SensorReading};
use crate::error::ApiResult;
use crate::model::FailureModel;
use crate::scorer;
use crate::store::StateStore;

// ==============================================================================
// shared state
// ==============================================================================

/// everything a handler needs; cheap to clone
#[derive(Clone)]
pub struct AppContext {
    pub store: StateStore,
    pub model: Arc<dyn FailureModel>,
    pub policy: CostPolicy,
    /// dashboard poll period in milliseconds
    pub refresh_ms: u64,
}

// ==============================================================================
// response bodies
// ==============================================================================

/// the combined view served by /api/data and /api/update
#[derive(Debug, Clone, Serialize)]
pub struct Assessment {
    pub timestamp: DateTime<Utc>,
    pub running: bool,
    pub ticks: u64,
    pub reading: SensorReading,
    pub damage: DamageAccumulators,
    pub health: f64,
    pub health_percent: f64,
    pub failure_probability: f64,
    pub failure_probability_percent: f64,
    pub expected_cost: f64,
    pub recommendation: Recommendation,
    pub action: &'static str,
    pub color: &'static str,
    pub vibration_magnitude: f64,
    pub ultrasonic_energy: f64,
}

impl Assessment {
    pub fn evaluate(
        state: &MonitoringState,
        model: &dyn FailureModel,
        policy: &CostPolicy,
    ) -> ApiResult<Self> {
        let health = scorer::score(&state.damage);
        let probability = scorer::predict_failure_probability(model, &state.reading, &state.damage)?;
        let decision = policy.decide(probability);

        Ok(Self {
            timestamp: Utc::now(),
            running: state.running,
            ticks: state.ticks,
            reading: state.reading.clone(),
            damage: state.damage,
            health,
            health_percent: (health * 100.0).round(),
            failure_probability: probability,
            failure_probability_percent: (probability * 1000.0).round() / 10.0,
            expected_cost: decision.expected_cost.round(),
            recommendation: decision.recommendation,
            action: decision.recommendation.action(),
            color: decision.recommendation.color(),
            vibration_magnitude: state.reading.vibration_magnitude(),
            ultrasonic_energy: state.reading.ultrasonic_energy(),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct DataResponse {
    pub status: &'static str,
    pub data: Assessment,
}

#[derive(Debug, Serialize)]
pub struct RunningResponse {
    pub status: &'static str,
    pub running: bool,
}

#[derive(Debug, Serialize)]
pub struct ResetResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub running: bool,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub timestamp: DateTime<Utc>,
}

// ==============================================================================
// router
// ==============================================================================

pub fn router(ctx: AppContext) -> Router {
    Router::new()
        .route("/", get(dashboard_handler))
        .route("/api/data", get(data_handler))
        .route("/api/update", get(update_handler))
        .route("/api/start", get(start_handler))
        .route("/api/stop", get(stop_handler))
        .route("/api/reset", get(reset_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(ctx)
}

// ==============================================================================
// handlers
// ==============================================================================

async fn dashboard_handler(State(ctx): State<AppContext>) -> Html<String> {
    Html(dashboard::render(ctx.refresh_ms))
}

/// json api endpoint for programmatic access
async fn data_handler(State(ctx): State<AppContext>) -> ApiResult<Json<DataResponse>> {
    let state = ctx.store.get().await;
    respond(&ctx, &state)
}

async fn update_handler(State(ctx): State<AppContext>) -> ApiResult<Json<DataResponse>> {
    let state = ctx.store.tick().await;
    tracing::debug!(tick = state.ticks, "Forced tick");
    respond(&ctx, &state)
}

async fn start_handler(State(ctx): State<AppContext>) -> Json<RunningResponse> {
    let running = ctx.store.set_running(true).await;
    tracing::info!("Monitoring started");
    Json(RunningResponse { status: "success", running })
}

async fn stop_handler(State(ctx): State<AppContext>) -> Json<RunningResponse> {
    let running = ctx.store.set_running(false).await;
    tracing::info!("Monitoring stopped");
    Json(RunningResponse { status: "success", running })
}

async fn reset_handler(State(ctx): State<AppContext>) -> Json<ResetResponse> {
    let state = ctx.store.reset().await;
    tracing::info!("Monitoring state reset");
    Json(ResetResponse {
        status: "success",
        message: "monitoring state reset to defaults",
        running: state.running,
    })
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: "asset-monitor",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: Utc::now(),
    })
}

fn respond(ctx: &AppContext, state: &MonitoringState) -> ApiResult<Json<DataResponse>> {
    let data = Assessment::evaluate(state, ctx.model.as_ref(), &ctx.policy)?;
    Ok(Json(DataResponse { status: "success", data }))
}
