//! Error types for the recognition pipeline.
//!
//! This module defines the errors that can occur while building datasets,
//! encoding labels and running the recognizer: image loading, processing,
//! inference and configuration problems.

use crate::core::config::ConfigError;
use thiserror::Error;

/// Enum representing different stages of processing in the pipeline.
///
/// Used to tag [`OCRError::Processing`] with the step that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStage {
    /// Error occurred during tensor or array operations.
    TensorOperation,
    /// Error occurred while fetching or stacking a batch.
    BatchProcessing,
}

impl std::fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessingStage::TensorOperation => write!(f, "tensor operation"),
            ProcessingStage::BatchProcessing => write!(f, "batch processing"),
        }
    }
}

/// Enum representing the errors that can occur in the recognition pipeline.
#[derive(Error, Debug)]
pub enum OCRError {
    /// Error occurred while loading an image.
    #[error("image load")]
    ImageLoad(#[source] image::ImageError),

    /// Error occurred during processing.
    #[error("{kind} failed: {context}")]
    Processing {
        /// The stage of processing where the error occurred.
        kind: ProcessingStage,
        /// Additional context about the error.
        context: String,
        /// The underlying error that caused this error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Error occurred while running a model.
    #[error("{model_name} inference failed: {context}")]
    Inference {
        /// Name of the model that failed.
        model_name: String,
        /// Operation that was running.
        context: String,
        /// The underlying error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Error indicating invalid input.
    #[error("invalid input: {message}")]
    InvalidInput {
        /// A message describing the invalid input.
        message: String,
    },

    /// Error indicating a configuration problem.
    #[error("configuration: {message}")]
    ConfigError {
        /// A message describing the configuration error.
        message: String,
    },

    /// A label contains a character that has no vocabulary entry.
    #[error("symbol {symbol:?} in label {label:?} is not in the vocabulary")]
    UnknownSymbol {
        /// The offending character.
        symbol: char,
        /// The full label being encoded.
        label: String,
    },

    /// A dataset was indexed outside `[0, len)`.
    #[error("index {index} out of range for dataset of length {len}")]
    IndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of samples in the dataset.
        len: usize,
    },

    /// Configuration validation failed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// IO error.
    #[error("io")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("json")]
    Json(#[from] serde_json::Error),
}
