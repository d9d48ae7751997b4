//! The SAR model: backbone, sequence encoder and attention decoder.

use super::backbone::{Backbone, ConvBackbone};
use super::config::SarConfig;
use super::decoder::{AttentionDecoder, DecodingMode};
use super::encoder::SequenceEncoder;
use crate::core::OCRError;
use crate::utils::{candle_to_ocr_inference, parse_device};
use crate::vocab::Vocabulary;
use candle_core::{D, DType, Device, Tensor};
use candle_nn::{VarBuilder, VarMap};
use std::sync::Arc;

const MODEL_NAME: &str = "SAR";

/// Everything a forward pass produces.
#[derive(Debug, Clone)]
pub struct SarOutput {
    /// Unnormalized class scores, `[batch, seq_len, output_classes]`.
    pub logits: Tensor,
    /// Softmax of `logits` over the classes.
    pub class_distributions: Tensor,
    /// `[batch, seq_len, 1, feature_height, feature_width]`.
    pub attention_maps: Tensor,
    /// Backbone output, `[batch, feature_channels, feature_height, feature_width]`.
    pub feature_volume: Tensor,
    /// Encoder output, `[batch, hidden_units]`.
    pub context_vector: Tensor,
}

/// Greedy transcription of one image.
#[derive(Debug, Clone, PartialEq)]
pub struct Recognition {
    pub text: String,
    /// Mean top probability over the steps up to and including the first END.
    pub confidence: f32,
}

/// Show-Attend-Read text recognizer.
#[derive(Debug)]
pub struct Sar {
    config: SarConfig,
    device: Device,
    vocabulary: Arc<Vocabulary>,
    backbone: Box<dyn Backbone>,
    encoder: SequenceEncoder,
    decoder: AttentionDecoder,
}

impl Sar {
    /// Builds the model with a [`ConvBackbone`], reading weights from `vb`.
    ///
    /// # Errors
    ///
    /// Returns `OCRError::ConfigError` if the configuration is invalid or
    /// `output_classes` differs from the vocabulary size.
    pub fn new(
        config: SarConfig,
        vocabulary: Arc<Vocabulary>,
        vb: VarBuilder,
    ) -> Result<Self, OCRError> {
        Self::check_config(&config, &vocabulary)?;
        let backbone = ConvBackbone::load(config.channel, config.feature_channels, vb.pp("backbone"))
            .map_err(|e| candle_to_ocr_inference(MODEL_NAME, "load backbone", e))?;
        Self::with_backbone(config, vocabulary, Box::new(backbone), vb)
    }

    /// Builds the model around a caller-supplied backbone.
    ///
    /// # Errors
    ///
    /// As [`new`](Self::new), plus `OCRError::ConfigError` if the backbone's
    /// depth differs from `feature_channels`.
    pub fn with_backbone(
        config: SarConfig,
        vocabulary: Arc<Vocabulary>,
        backbone: Box<dyn Backbone>,
        vb: VarBuilder,
    ) -> Result<Self, OCRError> {
        Self::check_config(&config, &vocabulary)?;
        if backbone.out_channels() != config.feature_channels {
            return Err(OCRError::validation_error(
                MODEL_NAME,
                "feature_channels",
                &config.feature_channels.to_string(),
                &backbone.out_channels().to_string(),
            ));
        }

        let device = vb.device().clone();
        let encoder = SequenceEncoder::load(&config, vb.pp("encoder"))
            .map_err(|e| candle_to_ocr_inference(MODEL_NAME, "load encoder", e))?;
        let decoder = AttentionDecoder::load(&config, vb.pp("decoder"))
            .map_err(|e| candle_to_ocr_inference(MODEL_NAME, "load decoder", e))?;

        tracing::info!(
            "SAR: {} classes, {} steps, {} layers of {} units on {:?}",
            config.output_classes,
            config.seq_len,
            config.layers,
            config.hidden_units,
            device
        );

        Ok(Self {
            config,
            device,
            vocabulary,
            backbone,
            encoder,
            decoder,
        })
    }

    /// Builds a freshly initialized model on `config.device`.
    ///
    /// The returned [`VarMap`] owns the trainable variables.
    pub fn init(config: SarConfig, vocabulary: Arc<Vocabulary>) -> Result<(Self, VarMap), OCRError> {
        let device = parse_device(&config.device)?;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let model = Self::new(config, vocabulary, vb)?;
        Ok((model, varmap))
    }

    fn check_config(config: &SarConfig, vocabulary: &Vocabulary) -> Result<(), OCRError> {
        config.check()?;
        if vocabulary.len() != config.output_classes {
            return Err(OCRError::validation_error(
                MODEL_NAME,
                "output_classes",
                &vocabulary.len().to_string(),
                &config.output_classes.to_string(),
            ));
        }
        Ok(())
    }

    pub fn config(&self) -> &SarConfig {
        &self.config
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn vocabulary(&self) -> &Arc<Vocabulary> {
        &self.vocabulary
    }

    /// Evaluation-mode forward pass; see [`forward_t`](Self::forward_t).
    pub fn forward(&self, images: &Tensor, mode: DecodingMode<'_>) -> Result<SarOutput, OCRError> {
        self.forward_t(images, mode, false)
    }

    /// Runs backbone, encoder and decoder on `images`
    /// (`[batch, channel, height, width]`).
    ///
    /// `mode` picks teacher forcing or greedy decoding; `train` enables
    /// encoder dropout.
    ///
    /// # Errors
    ///
    /// - `OCRError::InvalidInput` if the images or teacher-forcing labels
    ///   have the wrong shape or dtype, or a label is not a class index
    /// - `OCRError::ConfigError` if the backbone output does not match
    ///   `feature_channels`, `feature_height` and `feature_width`
    /// - `OCRError::Inference` if a tensor operation fails
    pub fn forward_t(
        &self,
        images: &Tensor,
        mode: DecodingMode<'_>,
        train: bool,
    ) -> Result<SarOutput, OCRError> {
        let batch = self.check_images(images)?;
        if let DecodingMode::TeacherForced(labels) = mode {
            self.check_labels(labels, batch)?;
        }

        let feature_volume = self
            .backbone
            .forward(images)
            .map_err(|e| candle_to_ocr_inference(MODEL_NAME, "backbone forward", e))?;
        self.check_features(&feature_volume)?;

        let context_vector = self
            .encoder
            .forward_t(&feature_volume, train)
            .map_err(|e| candle_to_ocr_inference(MODEL_NAME, "encoder forward", e))?;
        let decoded = self
            .decoder
            .forward(&feature_volume, &context_vector, mode)
            .map_err(|e| candle_to_ocr_inference(MODEL_NAME, "decoder forward", e))?;
        let class_distributions = candle_nn::ops::softmax(&decoded.logits, D::Minus1)
            .map_err(|e| candle_to_ocr_inference(MODEL_NAME, "softmax", e))?;

        tracing::debug!(
            "SAR {} forward: batch {}, features {:?}",
            mode.name(),
            batch,
            feature_volume.dims()
        );

        Ok(SarOutput {
            logits: decoded.logits,
            class_distributions,
            attention_maps: decoded.attention_maps,
            feature_volume,
            context_vector,
        })
    }

    /// Greedily transcribes every image of the batch.
    pub fn recognize(&self, images: &Tensor) -> Result<Vec<Recognition>, OCRError> {
        let output = self.forward(images, DecodingMode::Autoregressive)?;
        let probs = &output.class_distributions;
        let ids: Vec<Vec<u32>> = probs
            .argmax(D::Minus1)
            .and_then(|t| t.to_vec2())
            .map_err(|e| candle_to_ocr_inference(MODEL_NAME, "argmax", e))?;
        let top: Vec<Vec<f32>> = probs
            .max(D::Minus1)
            .and_then(|t| t.to_dtype(DType::F32))
            .and_then(|t| t.to_vec2())
            .map_err(|e| candle_to_ocr_inference(MODEL_NAME, "max probability", e))?;

        let end = self.vocabulary.end_index();
        Ok(ids
            .iter()
            .zip(&top)
            .map(|(row, scores)| {
                let steps = row
                    .iter()
                    .position(|&id| id == end)
                    .map_or(row.len(), |p| p + 1);
                let confidence = scores[..steps].iter().sum::<f32>() / steps as f32;
                Recognition {
                    text: self.vocabulary.strip_trailing(row),
                    confidence,
                }
            })
            .collect())
    }

    fn check_images(&self, images: &Tensor) -> Result<usize, OCRError> {
        let (batch, channel, _, _) = images.dims4().map_err(|_| {
            OCRError::invalid_input(format!(
                "SAR expects images of shape [batch, channel, height, width], got {:?}",
                images.dims()
            ))
        })?;
        if channel != self.config.channel {
            return Err(OCRError::invalid_input(format!(
                "SAR expects {} image channels, got {}",
                self.config.channel, channel
            )));
        }
        if batch == 0 {
            return Err(OCRError::invalid_input("SAR received an empty batch"));
        }
        Ok(batch)
    }

    fn check_labels(&self, labels: &Tensor, batch: usize) -> Result<(), OCRError> {
        if labels.dims() != [batch, self.config.seq_len] || labels.dtype() != DType::U32 {
            return Err(OCRError::invalid_input(format!(
                "teacher-forcing labels must be u32 of shape [{}, {}], got {:?} {:?}",
                batch,
                self.config.seq_len,
                labels.dtype(),
                labels.dims()
            )));
        }
        let largest = labels
            .max_all()
            .and_then(|t| t.to_scalar::<u32>())
            .map_err(|e| candle_to_ocr_inference(MODEL_NAME, "label range", e))?;
        if largest as usize >= self.config.output_classes {
            return Err(OCRError::invalid_input(format!(
                "teacher-forcing label {} is outside the {} output classes",
                largest, self.config.output_classes
            )));
        }
        Ok(())
    }

    fn check_features(&self, features: &Tensor) -> Result<(), OCRError> {
        let expected = [
            self.config.feature_channels,
            self.config.feature_height,
            self.config.feature_width,
        ];
        let actual = features.dims();
        if actual.len() != 4 || actual[1..] != expected {
            return Err(OCRError::validation_error(
                MODEL_NAME,
                "feature volume",
                &format!("{:?}", expected),
                &format!("{:?}", actual.get(1..).unwrap_or_default()),
            ));
        }
        Ok(())
    }
}
