//! Configuration for the SAR recognizer.

use crate::core::OCRError;
use crate::core::config::{ConfigError, ConfigValidator as _};
use crate::core::constants::{
    DEFAULT_FEATURE_CHANNELS, DEFAULT_HIDDEN_UNITS, DEFAULT_KEEP_PROB, DEFAULT_LAYERS,
    DEFAULT_SEQ_LEN,
};
use sar_ocr_derive::ConfigValidator;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Direction in which the sequence encoder reads the feature volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanAxis {
    /// One step per feature column, each of `channels * feature_height` values.
    #[default]
    Columns,
    /// One step per feature row, each of `channels * feature_width` values.
    Rows,
}

/// How the encoder reduces its last layer's outputs to the context vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Summary {
    /// Hidden state after the final step.
    #[default]
    LastHidden,
    /// Mean of the hidden states over all steps.
    Mean,
}

fn default_feature_channels() -> usize {
    DEFAULT_FEATURE_CHANNELS
}

fn default_hidden_units() -> usize {
    DEFAULT_HIDDEN_UNITS
}

fn default_layers() -> usize {
    DEFAULT_LAYERS
}

fn default_keep_prob() -> f64 {
    DEFAULT_KEEP_PROB
}

fn default_seq_len() -> usize {
    DEFAULT_SEQ_LEN
}

fn default_device() -> String {
    "cpu".to_string()
}

/// SAR model configuration.
///
/// `feature_height` and `feature_width` describe the backbone output for the
/// images the model is fed; they are checked against the real output on
/// every forward pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ConfigValidator)]
pub struct SarConfig {
    /// Channels of the input images.
    #[validate(min = 1)]
    pub channel: usize,
    /// Height of the backbone feature volume.
    #[validate(min = 1)]
    pub feature_height: usize,
    /// Width of the backbone feature volume.
    #[validate(min = 1)]
    pub feature_width: usize,
    /// Depth of the backbone feature volume.
    #[serde(default = "default_feature_channels")]
    #[validate(min = 1)]
    pub feature_channels: usize,
    /// Size of the decoder's symbol embedding.
    #[validate(min = 1)]
    pub embedding_dim: usize,
    /// Number of vocabulary entries.
    #[validate(min = 1)]
    pub output_classes: usize,
    /// Hidden size of the encoder and decoder LSTMs.
    #[serde(default = "default_hidden_units")]
    #[validate(min = 1)]
    pub hidden_units: usize,
    /// Stacked LSTM layers in the encoder and in the decoder.
    #[serde(default = "default_layers")]
    #[validate(min = 1)]
    pub layers: usize,
    /// Dropout retention probability between encoder layers.
    #[serde(default = "default_keep_prob")]
    #[validate(range(min = f64::EPSILON, max = 1.0))]
    pub keep_prob: f64,
    /// Number of decoding steps.
    #[serde(default = "default_seq_len")]
    #[validate(min = 2)]
    pub seq_len: usize,
    /// Compute device, see [`parse_device`](crate::utils::parse_device).
    #[serde(default = "default_device")]
    pub device: String,
    #[serde(default)]
    pub scan_axis: ScanAxis,
    #[serde(default)]
    pub summary: Summary,
}

impl Default for SarConfig {
    /// Sizes for 48x160 RGB inputs through [`ConvBackbone`](super::ConvBackbone)
    /// and the default 97-symbol vocabulary.
    fn default() -> Self {
        Self::new(3, 12, 20, 512, 97)
    }
}

impl SarConfig {
    /// Configuration with default LSTM sizes, dropout and sequence length.
    pub fn new(
        channel: usize,
        feature_height: usize,
        feature_width: usize,
        embedding_dim: usize,
        output_classes: usize,
    ) -> Self {
        Self {
            channel,
            feature_height,
            feature_width,
            feature_channels: default_feature_channels(),
            embedding_dim,
            output_classes,
            hidden_units: default_hidden_units(),
            layers: default_layers(),
            keep_prob: default_keep_prob(),
            seq_len: default_seq_len(),
            device: default_device(),
            scan_axis: ScanAxis::default(),
            summary: Summary::default(),
        }
    }

    /// Loads a configuration from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, OCRError> {
        let contents = std::fs::read_to_string(path)?;
        serde_json::from_str(&contents).map_err(|e| OCRError::ConfigError {
            message: format!("failed to parse SAR config: {e}"),
        })
    }

    /// Sets the feature volume depth.
    pub fn with_feature_channels(mut self, feature_channels: usize) -> Self {
        self.feature_channels = feature_channels;
        self
    }

    /// Sets the LSTM hidden size.
    pub fn with_hidden_units(mut self, hidden_units: usize) -> Self {
        self.hidden_units = hidden_units;
        self
    }

    /// Sets the number of stacked LSTM layers.
    pub fn with_layers(mut self, layers: usize) -> Self {
        self.layers = layers;
        self
    }

    /// Sets the dropout retention probability.
    pub fn with_keep_prob(mut self, keep_prob: f64) -> Self {
        self.keep_prob = keep_prob;
        self
    }

    /// Sets the number of decoding steps.
    pub fn with_seq_len(mut self, seq_len: usize) -> Self {
        self.seq_len = seq_len;
        self
    }

    /// Sets the device string.
    pub fn with_device(mut self, device: impl Into<String>) -> Self {
        self.device = device.into();
        self
    }

    /// Sets the encoder scan direction.
    pub fn with_scan_axis(mut self, scan_axis: ScanAxis) -> Self {
        self.scan_axis = scan_axis;
        self
    }

    /// Sets the encoder summary.
    pub fn with_summary(mut self, summary: Summary) -> Self {
        self.summary = summary;
        self
    }

    /// Input size of one encoder step for the configured scan axis.
    pub fn encoder_input_size(&self) -> usize {
        match self.scan_axis {
            ScanAxis::Columns => self.feature_channels * self.feature_height,
            ScanAxis::Rows => self.feature_channels * self.feature_width,
        }
    }

    /// Validates the configuration.
    pub fn check(&self) -> Result<(), ConfigError> {
        self.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = SarConfig::default();
        assert_eq!(config.hidden_units, 512);
        assert_eq!(config.layers, 2);
        assert_eq!(config.keep_prob, 1.0);
        assert_eq!(config.seq_len, 40);
        assert_eq!(config.device, "cpu");
        assert_eq!(config.encoder_input_size(), 512 * 12);
        assert!(config.check().is_ok());
        assert_eq!(
            <SarConfig as crate::core::config::ConfigValidator>::get_defaults().seq_len,
            config.seq_len
        );
    }

    #[test]
    fn test_invalid_values() {
        assert!(SarConfig::default().with_keep_prob(0.0).check().is_err());
        assert!(SarConfig::default().with_keep_prob(1.5).check().is_err());
        assert!(SarConfig::default().with_keep_prob(0.5).check().is_ok());
        assert!(SarConfig::default().with_seq_len(1).check().is_err());
        assert!(SarConfig::default().with_layers(0).check().is_err());

        let err = SarConfig::new(3, 0, 20, 64, 97).check().unwrap_err();
        assert!(err.to_string().contains("feature_height must be at least 1"));
    }

    #[test]
    fn test_from_path_fills_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"channel": 3, "feature_height": 3, "feature_width": 20,
                "embedding_dim": 64, "output_classes": 97, "scan_axis": "rows"}}"#
        )
        .unwrap();

        let config = SarConfig::from_path(file.path()).unwrap();
        assert_eq!(config.feature_channels, 512);
        assert_eq!(config.seq_len, 40);
        assert_eq!(config.scan_axis, ScanAxis::Rows);
        assert_eq!(config.summary, Summary::LastHidden);
        assert_eq!(config.encoder_input_size(), 512 * 20);
    }

    #[test]
    fn test_from_path_rejects_missing_fields() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"channel": 3}}"#).unwrap();
        assert!(matches!(
            SarConfig::from_path(file.path()),
            Err(OCRError::ConfigError { .. })
        ));
    }
}
