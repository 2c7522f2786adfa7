use std::time::Duration;

use ecosim_core::{
    ClassCounts, Distribution, FeatureSchema, HistoryLedger, InputRecord, KeyValueStorage,
    PredictionHistoryStore, ProbabilityNormalizer, UnknownClass, encode,
};
use tracing::{debug, info, warn};

use crate::error::{SubmitError, TransportError};
use crate::predictor::Predictor;

/// What a front end should currently display.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewState {
    pub prediction: Option<String>,
    pub distribution: Option<Distribution>,
    /// User-facing message for the last failed submission
    pub error: Option<String>,
    pub is_loading: bool,
}

/// A successful submission.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub prediction: String,
    /// `None` when the predictor reported no scores
    pub distribution: Option<Distribution>,
}

/// Drives one form: encode, predict, normalize, record.
///
/// `submit` borrows the session mutably, so a second submission cannot start
/// while one is in flight.
#[derive(Debug)]
pub struct Session<P, S> {
    schema: FeatureSchema,
    predictor: P,
    history: PredictionHistoryStore<S>,
    timeout: Option<Duration>,
    state: ViewState,
}

impl<P: Predictor, S: KeyValueStorage> Session<P, S> {
    pub fn new(schema: FeatureSchema, predictor: P, storage: S) -> Self {
        let history = PredictionHistoryStore::open(storage, schema.classes().clone());
        Self {
            schema,
            predictor,
            history,
            timeout: None,
            state: ViewState::default(),
        }
    }

    pub fn with_history_max_len(mut self, max_len: usize) -> Self {
        self.history = self.history.with_max_len(max_len);
        self
    }

    /// Treat a predictor call running longer than `timeout` as failed.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub async fn submit(&mut self, record: &InputRecord) -> Result<Outcome, SubmitError> {
        self.state = ViewState {
            is_loading: true,
            ..ViewState::default()
        };

        let result = self.run(record).await;
        self.state.is_loading = false;

        match &result {
            Ok(outcome) => {
                info!(prediction = %outcome.prediction, "prediction recorded");
                self.state.prediction = Some(outcome.prediction.clone());
                self.state.distribution = outcome.distribution.clone();
            }
            Err(err) => {
                warn!(%err, "submission failed");
                self.state.error = Some(err.user_message());
            }
        }

        result
    }

    async fn run(&mut self, record: &InputRecord) -> Result<Outcome, SubmitError> {
        let features = encode(record, &self.schema)?;
        debug!(len = features.len(), "encoded record");

        let call = self.predictor.predict(&features);
        let raw = match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, call)
                .await
                .map_err(TransportError::from)??,
            None => call.await?,
        };

        let classes = self.schema.classes();
        classes
            .check(&raw.prediction)
            .map_err(|UnknownClass(class)| TransportError::UnknownClass(class))?;

        let distribution = raw
            .scores
            .map(|scores| ProbabilityNormalizer::new(classes).normalize(scores))
            .transpose()
            .map_err(TransportError::from)?;

        self.history
            .append(&raw.prediction)
            .map_err(|UnknownClass(class)| TransportError::UnknownClass(class))?;

        Ok(Outcome {
            prediction: raw.prediction,
            distribution,
        })
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    pub fn history_counts(&self) -> ClassCounts {
        self.history.counts()
    }

    pub fn history(&self) -> &HistoryLedger {
        self.history.ledger()
    }

    pub fn history_store(&self) -> &PredictionHistoryStore<S> {
        &self.history
    }
}
