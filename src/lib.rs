//! # SAR OCR
//!
//! A Show-Attend-Read scene text recognizer built on candle.
//!
//! The model reads a batch of word images through a convolutional backbone,
//! summarizes the feature volume with a recurrent sequence encoder and then
//! decodes a fixed number of characters with a 2-D attention decoder. The
//! decoder runs either teacher-forced on ground-truth labels or
//! autoregressively on its own greedy predictions.
//!
//! ## Modules
//!
//! * [`core`] - Error handling, configuration traits and constants
//! * [`vocab`] - Vocabulary, label codec and `strip_trailing` decoding
//! * [`dataset`] - Labeled image sources and batch fetching
//! * [`models`] - The SAR backbone, encoder, decoder and composer
//! * [`batch`] - Collation of dataset samples into candle tensors
//! * [`utils`] - Device parsing and candle error adapters
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sar_ocr::prelude::*;
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! sar_ocr::core::init_tracing();
//!
//! let vocabulary = Arc::new(build_vocabulary());
//! let config = SarConfig::new(3, 12, 20, 256, vocabulary.len());
//! let (model, _varmap) = Sar::init(config, vocabulary.clone())?;
//!
//! let codec = LabelCodec::new(vocabulary, model.config().seq_len)?;
//! let dataset = DatasetConfig {
//!     format: DatasetFormat::Syn90k,
//!     image_dir: "data/syn90k".into(),
//!     annotations: None,
//! };
//! let source = AnnotatedSource::from_config(&dataset, ImageTransform::default(), codec)?;
//! let batch = SampleBatch::fetch(&source, &[0, 1, 2, 3], model.device())?;
//!
//! let output = model.forward(&batch.images, DecodingMode::TeacherForced(&batch.labels))?;
//! println!("{:?}", output.class_distributions.dims());
//!
//! for recognition in model.recognize(&batch.images)? {
//!     println!("{} ({:.2})", recognition.text, recognition.confidence);
//! }
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod models;
pub mod utils;

pub use sar_ocr_core::{core, dataset, vocab};

// Re-export derive macros for convenient use
pub use sar_ocr_core::ConfigValidator;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use sar_ocr_core::prelude::*;

    // Model
    pub use crate::models::sar::{
        Backbone, ConvBackbone, DecodingMode, Recognition, Sar, SarConfig, SarOutput, ScanAxis,
        Summary,
    };

    // Batching
    pub use crate::batch::{SampleBatch, one_hot_labels};

    // Device handling
    pub use crate::utils::parse_device;
}
