//! Shared helpers for the HTTP integration tests.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use asset_monitor::api::{self, AppContext};
use asset_monitor::decision::CostPolicy;
use asset_monitor::error::ModelError;
use asset_monitor::model::FailureModel;
use asset_monitor::scorer::FeatureVector;
use asset_monitor::simulator::Simulator;
use asset_monitor::store::StateStore;

/// Stub classifier returning the same probability for every input.
pub struct FixedModel(pub f64);

impl FailureModel for FixedModel {
    fn predict(&self, _features: &FeatureVector) -> Result<f64, ModelError> {
        Ok(self.0)
    }
}

/// Stub classifier that always fails.
pub struct BrokenModel;

impl FailureModel for BrokenModel {
    fn predict(&self, _features: &FeatureVector) -> Result<f64, ModelError> {
        Err(ModelError::NonFiniteOutput(f64::NAN))
    }
}

/// Seeded store plus router, so tests can inspect the state behind the API.
pub fn build_test_app(model: Arc<dyn FailureModel>) -> (Router, StateStore) {
    let store = StateStore::new(Simulator::new(Some(42), 0.02), true);
    let ctx = AppContext {
        store: store.clone(),
        model,
        policy: CostPolicy::default(),
        refresh_ms: 2000,
    };
    (api::router(ctx), store)
}

pub async fn get(app: &Router, uri: &str) -> Response<Body> {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    app.clone().oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}
