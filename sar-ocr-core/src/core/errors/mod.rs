//! Error types for the recognition pipeline.
//!
//! # Usage
//!
//! ```rust
//! use sar_ocr_core::core::errors::{OCRError, ProcessingStage};
//!
//! let error = OCRError::tensor_operation(
//!     "Failed to reshape image array",
//!     std::io::Error::new(std::io::ErrorKind::InvalidData, "Invalid shape"),
//! );
//!
//! let config_error = OCRError::validation_error("Sar", "feature_width", "20", "40");
//! # let _ = (error, config_error, ProcessingStage::BatchProcessing);
//! ```

pub mod constructors;
pub mod types;

pub use types::{OCRError, ProcessingStage};

/// Convenient result alias for pipeline operations.
pub type OcrResult<T> = Result<T, OCRError>;
