//! Dataset adapters producing normalized word images and encoded labels.
//!
//! Every labeled source implements [`LabeledImageSource`]: a fixed number of
//! samples, each a `(3, height, width)` image array in `[-1, 1]` plus a
//! [`LabelSequence`] of exactly `seq_len` indices. The supported formats are
//! selected by [`DatasetFormat`] rather than by separate adapter types:
//!
//! - SVT: rectangle crops out of street images
//! - IIIT5K: pre-cropped word images
//! - Syn90k: pre-cropped word images labeled through their file names
//! - SynthText: corner-box crops out of synthetic scenes
//!
//! Parsing the native XML/MAT annotation files of each dataset is left to external
//! extractors, which hand records over as [`AnnotationRecord`]s.

pub mod folder;
pub mod loader;
pub mod record;
pub mod source;
pub mod transform;

pub use folder::ImageFolder;
pub use loader::{ConcatSource, fetch_batch, fetch_batch_with_threshold};
pub use record::{AnnotationRecord, CropRegion, load_manifest};
pub use source::{AnnotatedSource, DatasetConfig, DatasetFormat, parse_syn90k_label};
pub use transform::{ChannelOrder, ImageTransform, WidthPolicy, crop_region};

use crate::core::OCRError;
use crate::vocab::LabelSequence;
use ndarray::{Array2, Array3};

/// One sample of a labeled source.
#[derive(Debug, Clone)]
pub struct LabeledSample {
    /// Normalized image, shape `(channels, height, width)`.
    pub image: Array3<f32>,
    /// Encoded label of `seq_len` indices.
    pub label: LabelSequence,
    /// The transcription the label was encoded from.
    pub text: String,
}

impl LabeledSample {
    /// The label as a `(seq_len, num_classes)` one-hot matrix.
    pub fn one_hot(&self, num_classes: usize) -> Result<Array2<f32>, OCRError> {
        self.label.to_one_hot(num_classes)
    }
}

/// A random-access source of labeled word images.
///
/// All samples of a source share [`image_shape`](Self::image_shape),
/// [`seq_len`](Self::seq_len) and [`num_classes`](Self::num_classes).
pub trait LabeledImageSource: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Number of samples.
    fn len(&self) -> usize;

    /// Returns true if the source has no samples.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Loads sample `index`.
    ///
    /// # Errors
    ///
    /// Returns `OCRError::IndexOutOfRange` unless `index < len()`, and any
    /// loading, cropping or label encoding error of the sample.
    fn get(&self, index: usize) -> Result<LabeledSample, OCRError>;

    /// Shape of every image array, `[channels, height, width]`.
    fn image_shape(&self) -> [usize; 3];

    /// Length of every label sequence.
    fn seq_len(&self) -> usize;

    /// Size of the vocabulary the labels index into.
    fn num_classes(&self) -> usize;
}
