use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use ecosim_core::{ClassSet, FeatureVector};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use super::{Predictor, RawPrediction};
use crate::error::TransportError;

const ELEVATION: &str = "Elevation";

/// Offline stand-in for the prediction service.
///
/// The predicted class is `floor(Elevation) mod len(classes)`. It scores in
/// `[0.6, 0.9)` and every other class in `[0, 0.1)`, so the reported
/// distribution always ranks the prediction first.
#[derive(Debug)]
pub struct SimulatedPredictor {
    classes: ClassSet,
    rng: Mutex<StdRng>,
    latency: Duration,
}

impl SimulatedPredictor {
    pub fn new(classes: ClassSet, seed: u64) -> Self {
        Self {
            classes,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            latency: Duration::ZERO,
        }
    }

    /// Wait this long before answering, to mimic a network round trip.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    fn predicted_index(&self, elevation: f64) -> usize {
        let n = self.classes.len() as i64;
        (elevation.floor() as i64).rem_euclid(n) as usize
    }
}

#[async_trait]
impl Predictor for SimulatedPredictor {
    async fn predict(&self, features: &FeatureVector) -> Result<RawPrediction, TransportError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let elevation = features
            .get(ELEVATION)
            .ok_or_else(|| TransportError::Rejected(format!("missing `{ELEVATION}` feature")))?;
        let index = self.predicted_index(elevation);

        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let scores: Vec<(String, f64)> = self
            .classes
            .iter()
            .enumerate()
            .map(|(i, label)| {
                let score = if i == index {
                    0.6 + rng.gen_range(0.0..0.3)
                } else {
                    rng.gen_range(0.0..0.1)
                };
                (label.to_string(), score)
            })
            .collect();
        drop(rng);

        let prediction = scores[index].0.clone();
        debug!(%prediction, elevation, "simulated prediction");

        Ok(RawPrediction {
            prediction,
            scores: Some(scores),
        })
    }
}
