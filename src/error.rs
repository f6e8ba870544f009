//! Error types shared across the predictor.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for database operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Failures talking to the predictions database.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The database could not be reached after every allowed attempt.
    #[error("Database connection failed after {attempts} attempts: {source}")]
    Connectivity {
        attempts: u32,
        #[source]
        source: sqlx::Error,
    },

    /// The predictions table could not be created.
    #[error("Error creating table: {0}")]
    Schema(#[source] sqlx::Error),

    /// A statement failed on an otherwise established connection.
    #[error("{0}")]
    Operation(#[from] sqlx::Error),

    /// No live connection is recorded for the session.
    #[error("No active database connection")]
    NotConnected,
}

impl StoreError {
    /// Whether the session connection should be demoted after this error.
    pub fn invalidates_session(&self) -> bool {
        matches!(self, Self::Operation(_) | Self::Schema(_))
    }
}

/// Failures loading or querying the classifier artifact.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Failed to read model artifact {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Model artifact {path} is corrupt: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The artifact does not describe the encoder's feature layout.
    #[error("Model artifact schema mismatch: {0}")]
    Schema(String),
}

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config syntax: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config value: {0}")]
    Invalid(String),
}

/// A form field outside the range its input widget allows.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{field} must be between {min} and {max}, got {value}")]
pub struct InputError {
    pub field: &'static str,
    pub min: i32,
    pub max: i32,
    pub value: i32,
}

/// Failures producing a model artifact from training data.
#[derive(Debug, Error)]
pub enum TrainError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Missing column '{0}' in training data")]
    MissingColumn(String),

    #[error("Row {row}: cannot parse '{value}' in column '{column}'")]
    InvalidValue {
        row: usize,
        column: String,
        value: String,
    },

    #[error("Training data needs at least {needed} rows of each class, found {low} low / {high} high")]
    NotEnoughData { needed: usize, low: usize, high: usize },

    #[error("Shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error("Model fitting failed: {0}")]
    Fit(String),

    #[error("Failed to write artifact: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode artifact: {0}")]
    Encode(#[from] serde_json::Error),
}
