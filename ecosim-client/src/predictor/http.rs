use std::time::Duration;

use async_trait::async_trait;
use ecosim_core::FeatureVector;
use tracing::{debug, warn};

use super::{Predictor, RawPrediction, error_detail, parse_response};
use crate::config::ClientConfig;
use crate::error::TransportError;

/// Calls a remote prediction service with `POST <base>/predict`.
#[derive(Debug, Clone)]
pub struct HttpPredictor {
    client: reqwest::Client,
    url: String,
}

impl HttpPredictor {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: format!("{}/predict", base_url.trim().trim_end_matches('/')),
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, TransportError> {
        Self::new(&config.api_url, config.request_timeout())
    }

    /// Endpoint the features are posted to.
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Predictor for HttpPredictor {
    async fn predict(&self, features: &FeatureVector) -> Result<RawPrediction, TransportError> {
        debug!(url = %self.url, features = features.len(), "posting features");

        let response = self.client.post(&self.url).json(features).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let detail = error_detail(&body);
            warn!(status = status.as_u16(), detail = ?detail, "prediction request failed");
            return Err(TransportError::Status {
                status: status.as_u16(),
                detail,
            });
        }

        let raw = parse_response(&body)?;
        debug!(prediction = %raw.prediction, "received prediction");
        Ok(raw)
    }
}
