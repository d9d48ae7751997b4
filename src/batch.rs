//! Collation of dataset samples into model-ready tensors.

use crate::core::OCRError;
use crate::core::errors::ProcessingStage;
use crate::dataset::{LabeledImageSource, LabeledSample, fetch_batch};
use crate::utils::candle_to_ocr_processing;
use candle_core::{Device, Tensor};

/// A batch of samples stacked into tensors, in sample order.
#[derive(Debug, Clone)]
pub struct SampleBatch {
    /// `[batch, channels, height, width]` f32 in `[-1, 1]`.
    pub images: Tensor,
    /// `[batch, seq_len]` u32 label indices.
    pub labels: Tensor,
    /// Ground-truth transcriptions.
    pub texts: Vec<String>,
}

impl SampleBatch {
    /// Stacks `samples` on `device`.
    ///
    /// # Errors
    ///
    /// Returns `OCRError::InvalidInput` if `samples` is empty or the samples
    /// disagree on image shape or label length.
    pub fn collate(samples: &[LabeledSample], device: &Device) -> Result<Self, OCRError> {
        let Some(first) = samples.first() else {
            return Err(OCRError::invalid_input("cannot collate an empty batch"));
        };
        let shape = first.image.dim();
        let seq_len = first.label.len();

        let mut pixels = Vec::with_capacity(samples.len() * first.image.len());
        let mut indices = Vec::with_capacity(samples.len() * seq_len);
        for (i, sample) in samples.iter().enumerate() {
            if sample.image.dim() != shape || sample.label.len() != seq_len {
                return Err(OCRError::invalid_input(format!(
                    "sample {} has image {:?} and {} labels, expected {:?} and {}",
                    i,
                    sample.image.dim(),
                    sample.label.len(),
                    shape,
                    seq_len
                )));
            }
            pixels.extend(sample.image.iter().copied());
            indices.extend_from_slice(sample.label.as_slice());
        }

        let batch = samples.len();
        let (c, h, w) = shape;
        let images = Tensor::from_vec(pixels, (batch, c, h, w), device).map_err(|e| {
            candle_to_ocr_processing(ProcessingStage::TensorOperation, "stack images", e)
        })?;
        let labels = Tensor::from_vec(indices, (batch, seq_len), device).map_err(|e| {
            candle_to_ocr_processing(ProcessingStage::TensorOperation, "stack labels", e)
        })?;

        Ok(Self {
            images,
            labels,
            texts: samples.iter().map(|s| s.text.clone()).collect(),
        })
    }

    /// Fetches `indices` from `source` and collates them.
    pub fn fetch<S>(source: &S, indices: &[usize], device: &Device) -> Result<Self, OCRError>
    where
        S: LabeledImageSource + ?Sized,
    {
        let samples = fetch_batch(source, indices)?;
        Self::collate(&samples, device)
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.texts.len()
    }

    /// Returns true if the batch has no samples.
    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }
}

/// One-hot encodes `[batch, seq_len]` u32 labels into
/// `[batch, seq_len, num_classes]` f32.
pub fn one_hot_labels(labels: &Tensor, num_classes: usize) -> Result<Tensor, OCRError> {
    candle_nn::encoding::one_hot(labels.clone(), num_classes, 1f32, 0f32).map_err(|e| {
        candle_to_ocr_processing(ProcessingStage::TensorOperation, "one-hot labels", e)
    })
}
