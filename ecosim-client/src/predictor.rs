use std::collections::BTreeMap;

use async_trait::async_trait;
use ecosim_core::FeatureVector;
use serde::Deserialize;

use crate::error::TransportError;

pub mod http;
pub mod simulated;

pub use http::HttpPredictor;
pub use simulated::SimulatedPredictor;

/// What a predictor answered, before any validation against the class set.
#[derive(Debug, Clone, PartialEq)]
pub struct RawPrediction {
    pub prediction: String,
    /// Per-class scores, if the predictor reported any
    pub scores: Option<Vec<(String, f64)>>,
}

/// Anything that can turn a feature vector into a cover type prediction.
#[async_trait]
pub trait Predictor: Send + Sync {
    async fn predict(&self, features: &FeatureVector) -> Result<RawPrediction, TransportError>;
}

#[async_trait]
impl<P: Predictor + ?Sized> Predictor for Box<P> {
    async fn predict(&self, features: &FeatureVector) -> Result<RawPrediction, TransportError> {
        (**self).predict(features).await
    }
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    prediction: Option<String>,
    #[serde(default)]
    probabilities: Option<Probabilities>,
    #[serde(default)]
    error: Option<String>,
}

/// The service reports probabilities either as a list of records or as a map.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Probabilities {
    List(Vec<ProbabilityEntry>),
    Map(BTreeMap<String, f64>),
}

#[derive(Debug, Deserialize)]
struct ProbabilityEntry {
    #[serde(alias = "type")]
    class: String,
    probability: f64,
}

/// Parse a successful `/predict` response body.
pub fn parse_response(body: &str) -> Result<RawPrediction, TransportError> {
    let response: PredictResponse =
        serde_json::from_str(body).map_err(|e| TransportError::MalformedBody(e.to_string()))?;

    if let Some(error) = response.error {
        return Err(TransportError::Rejected(error));
    }

    let prediction = response
        .prediction
        .ok_or_else(|| TransportError::MalformedBody("missing `prediction`".to_string()))?;

    let scores = response.probabilities.and_then(|p| {
        let scores: Vec<(String, f64)> = match p {
            Probabilities::List(entries) => entries
                .into_iter()
                .map(|e| (e.class, e.probability))
                .collect(),
            Probabilities::Map(map) => map.into_iter().collect(),
        };
        // An empty list means the same as no list
        (!scores.is_empty()).then_some(scores)
    });

    Ok(RawPrediction { prediction, scores })
}

/// Pull FastAPI's `detail` out of an error body, falling back to the raw text.
pub(crate) fn error_detail(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }

    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(value) => match &value["detail"] {
            serde_json::Value::String(detail) => Some(detail.clone()),
            serde_json::Value::Null => Some(body.to_string()),
            other => Some(other.to_string()),
        },
        Err(_) => Some(body.to_string()),
    }
}
