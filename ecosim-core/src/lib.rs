pub mod encoder;
pub mod error;
pub mod history;
pub mod normalizer;
pub mod sampler;
pub mod schema;

pub use encoder::{FeatureVector, InputRecord, RawValue, encode};
pub use error::{NormalizeError, SchemaError, StorageError, UnknownClass, ValidationError};
pub use history::{
    ClassCounts, HistoryLedger, KeyValueStorage, MemoryStorage, PredictionHistoryStore,
};
pub use normalizer::{ClassProbability, Distribution, ProbabilityNormalizer};
pub use sampler::{AxisScale, DatasetSampler, MapPoint, SampledDataset};
pub use schema::{CategoryGroup, ClassSet, FeatureSchema};
