use thiserror::Error;

/// A user-supplied record could not be turned into a feature vector.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("missing field `{field}`")]
    MissingField { field: String },

    #[error("field `{field}` is not a number: {value:?}")]
    InvalidNumber { field: String, value: String },

    #[error("field `{field}` has unknown category {value:?}")]
    UnknownCategory { field: String, value: String },
}

impl ValidationError {
    /// Name of the offending input field.
    pub fn field(&self) -> &str {
        match self {
            Self::MissingField { field }
            | Self::InvalidNumber { field, .. }
            | Self::UnknownCategory { field, .. } => field,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum NormalizeError {
    /// No scores at all, or every score is zero.
    #[error("empty distribution")]
    EmptyDistribution,

    #[error("unknown class {0:?}")]
    UnknownClass(String),

    #[error("class {0:?} appears more than once")]
    DuplicateClass(String),

    #[error("class {class:?} has invalid score {score}")]
    InvalidScore { class: String, score: f64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("schema has no classes")]
    NoClasses,

    #[error("duplicate name {0:?} in schema")]
    Duplicate(String),

    #[error("empty name in schema")]
    EmptyName,

    #[error("category group `{0}` has no categories")]
    EmptyGroup(String),

    #[error("category group `{group}` has no category {id}")]
    CategoryOutOfRange { group: String, id: u16 },
}

/// A class label outside the closed class set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown class {0:?}")]
pub struct UnknownClass(pub String);

/// The persistence layer could not be reached.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("corrupt value in slot `{key}`: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Unavailable(err.to_string())
    }
}
