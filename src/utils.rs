//! Utility functions for candle-based models.
//!
//! This module provides:
//! - Device configuration for candle models
//! - Conversion of candle errors into [`OCRError`]

use crate::core::OCRError;
use crate::core::errors::ProcessingStage;
use candle_core::Device;

#[cfg(not(feature = "cuda"))]
fn cuda_not_enabled() -> OCRError {
    OCRError::ConfigError {
        message: "CUDA support not enabled. Compile with --features cuda".to_string(),
    }
}

/// Parses a device string and creates a candle [`Device`].
///
/// # Supported formats
///
/// - `"cpu"` → CPU device
/// - `"cuda"` or `"gpu"` → CUDA device 0
/// - `"cuda:N"` → CUDA device N (e.g., `"cuda:1"`)
///
/// # Errors
///
/// Returns `OCRError::ConfigError` if:
/// - The device string is invalid
/// - CUDA is requested but the `cuda` feature is not enabled
/// - CUDA device creation fails
///
/// # Examples
///
/// ```no_run
/// use sar_ocr::utils::parse_device;
///
/// let cpu = parse_device("cpu").unwrap();
/// let cuda1 = parse_device("cuda:1").unwrap();
/// ```
pub fn parse_device(device_str: &str) -> Result<Device, OCRError> {
    let device_str = device_str.trim().to_lowercase();
    match device_str.as_str() {
        "cpu" => Ok(Device::Cpu),
        "cuda" | "gpu" => {
            #[cfg(feature = "cuda")]
            {
                Device::new_cuda(0).map_err(|e| OCRError::ConfigError {
                    message: format!("Failed to create CUDA device: {}", e),
                })
            }
            #[cfg(not(feature = "cuda"))]
            {
                Err(cuda_not_enabled())
            }
        }
        s if s.starts_with("cuda:") => {
            let ordinal: usize = s["cuda:".len()..]
                .parse()
                .map_err(|_| OCRError::ConfigError {
                    message: format!("Invalid CUDA device ordinal in '{}'", s),
                })?;
            #[cfg(feature = "cuda")]
            {
                Device::new_cuda(ordinal).map_err(|e| OCRError::ConfigError {
                    message: format!("Failed to create CUDA device {}: {}", ordinal, e),
                })
            }
            #[cfg(not(feature = "cuda"))]
            {
                let _ = ordinal;
                Err(cuda_not_enabled())
            }
        }
        _ => Err(OCRError::ConfigError {
            message: format!(
                "Unknown device: '{}'. Use 'cpu', 'cuda', or 'cuda:N'",
                device_str
            ),
        }),
    }
}

/// Convert candle error to OCRError for inference operations.
pub fn candle_to_ocr_inference(
    model_name: &str,
    context: impl Into<String>,
    err: candle_core::Error,
) -> OCRError {
    OCRError::Inference {
        model_name: model_name.to_string(),
        context: context.into(),
        source: Box::new(err),
    }
}

/// Convert candle error to OCRError for processing operations.
pub fn candle_to_ocr_processing(
    kind: ProcessingStage,
    context: impl Into<String>,
    err: candle_core::Error,
) -> OCRError {
    OCRError::Processing {
        kind,
        context: context.into(),
        source: Box::new(err),
    }
}
