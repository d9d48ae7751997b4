//! Error constructor utilities.
//!
//! Helper functions for creating [`OCRError`] values with consistent context
//! strings, so call sites stay short.

use super::types::{OCRError, ProcessingStage};

impl OCRError {
    /// Creates an OCRError for tensor operations.
    pub fn tensor_operation(
        context: &str,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Processing {
            kind: ProcessingStage::TensorOperation,
            context: context.to_string(),
            source: Box::new(error),
        }
    }

    /// Creates an OCRError for a failed batch item, naming the item position.
    ///
    /// # Arguments
    ///
    /// * `stage` - Name of the stage, e.g. `"dataset fetch"`.
    /// * `item_index` - Zero-based index of the failed item.
    /// * `total` - Number of items in the batch.
    /// * `error` - The underlying error.
    pub fn batch_item_error(
        stage: &str,
        item_index: usize,
        total: usize,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Processing {
            kind: ProcessingStage::BatchProcessing,
            context: format!("{} failed (item {}/{})", stage, item_index + 1, total),
            source: Box::new(error),
        }
    }

    /// Creates an InvalidInput error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Creates a ConfigError with the given message.
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Creates a ConfigError for a value that does not match what a component expects.
    ///
    /// # Arguments
    ///
    /// * `component` - The component reporting the mismatch.
    /// * `field` - The configuration field involved.
    /// * `expected` - The expected value.
    /// * `actual` - The value that was observed.
    pub fn validation_error(component: &str, field: &str, expected: &str, actual: &str) -> Self {
        Self::ConfigError {
            message: format!(
                "{}: {} mismatch, expected {}, got {}",
                component, field, expected, actual
            ),
        }
    }

    /// Creates an IndexOutOfRange error.
    pub fn index_out_of_range(index: usize, len: usize) -> Self {
        Self::IndexOutOfRange { index, len }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_item_error_message() {
        let err = OCRError::batch_item_error(
            "dataset fetch",
            2,
            5,
            std::io::Error::other("disk"),
        );
        assert_eq!(
            err.to_string(),
            "batch processing failed: dataset fetch failed (item 3/5)"
        );
    }

    #[test]
    fn test_validation_error_message() {
        let err = OCRError::validation_error("Sar", "feature_height", "3", "6");
        assert!(err.to_string().contains("feature_height mismatch"));
        assert!(matches!(err, OCRError::ConfigError { .. }));
    }

    #[test]
    fn test_index_out_of_range_message() {
        let err = OCRError::index_out_of_range(10, 4);
        assert_eq!(
            err.to_string(),
            "index 10 out of range for dataset of length 4"
        );
    }
}
