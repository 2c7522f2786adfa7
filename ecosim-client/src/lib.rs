pub mod config;
pub mod dataset;
pub mod error;
pub mod logging;
pub mod predictor;
pub mod session;
pub mod storage;

pub use config::ClientConfig;
pub use error::{ConfigError, DatasetError, SubmitError, TransportError};
pub use predictor::{HttpPredictor, Predictor, RawPrediction, SimulatedPredictor};
pub use session::{Outcome, Session, ViewState};
pub use storage::FileStorage;
