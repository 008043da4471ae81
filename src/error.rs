//! Error types for model loading and the HTTP API.

use std::path::PathBuf;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Failures loading or evaluating the failure-probability model.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("failed to read model artifact {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse model artifact {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("model expects features {found:?}, monitor provides {expected:?}")]
    FeatureMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("tree {tree}: {message}")]
    InvalidTree { tree: usize, message: String },

    #[error("model returned a non-finite probability ({0})")]
    NonFiniteOutput(f64),
}

/// Failures writing the synthetic training dataset.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("csv output failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("invalid sampling distribution: {0}")]
    Distribution(#[from] rand_distr::NormalError),
}

/// API error type that converts to an HTTP response.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The classifier could not produce a probability (500)
    #[error("failure prediction unavailable: {0}")]
    Prediction(#[from] ModelError),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Prediction(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Prediction(_) => "PREDICTION_FAILED",
        }
    }
}

/// JSON error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub status: &'static str,
    pub code: &'static str,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, code = self.error_code(), "api error");

        let body = ErrorResponse {
            status: "error",
            code: self.error_code(),
            message: self.to_string(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
