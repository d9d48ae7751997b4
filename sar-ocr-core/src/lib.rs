//! # SAR OCR Core
//!
//! Core types and dataset plumbing for the SAR text recognizer.
//!
//! This crate provides:
//! - Error handling types
//! - Configuration validation
//! - The character vocabulary and fixed-length label encoding
//! - Dataset adapters producing normalized word images
//!
//! ## Modules
//!
//! * [`core`] - Error handling, configuration traits and constants
//! * [`vocab`] - Vocabulary, label codec and `strip_trailing` decoding
//! * [`dataset`] - Labeled image sources, batch fetching and image transforms
//! * [`utils`] - Image loading helpers

pub mod core;
pub mod dataset;
pub mod utils;
pub mod vocab;

// Re-export derive macros for convenient use
pub use sar_ocr_derive::ConfigValidator;

/// Prelude module for convenient imports.
pub mod prelude {
    // Error Handling
    pub use crate::core::{OCRError, OcrResult};

    // Vocabulary
    pub use crate::vocab::{LabelCodec, LabelSequence, Vocabulary, build_vocabulary, strip_trailing};

    // Datasets
    pub use crate::dataset::{
        AnnotatedSource, ConcatSource, DatasetConfig, DatasetFormat, ImageFolder, ImageTransform,
        LabeledImageSource, LabeledSample, fetch_batch,
    };

    // Image Utilities
    pub use crate::utils::load_image;
}
