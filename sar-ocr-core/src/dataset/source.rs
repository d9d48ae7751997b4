//! Annotated word-image sources for the supported dataset formats.

use super::record::{AnnotationRecord, CropRegion, load_manifest};
use super::transform::{ImageTransform, crop_region};
use super::{LabeledImageSource, LabeledSample};
use crate::core::OCRError;
use crate::core::config::ConfigValidator as _;
use crate::utils::{list_file_names, load_image};
use crate::vocab::LabelCodec;
use sar_ocr_derive::ConfigValidator;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Supported annotation formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetFormat {
    /// Street View Text: rectangle word boxes in full images.
    Svt,
    /// IIIT 5K-word: pre-cropped word images.
    Iiit5k,
    /// Synth90k: pre-cropped word images named `<n>_<label>_<m>.<ext>`.
    Syn90k,
    /// SynthText: corner word boxes in full images.
    SynthText,
}

impl DatasetFormat {
    /// Display name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            DatasetFormat::Svt => "svt",
            DatasetFormat::Iiit5k => "iiit5k",
            DatasetFormat::Syn90k => "syn90k",
            DatasetFormat::SynthText => "synthtext",
        }
    }

    fn accepts(&self, region: Option<&CropRegion>) -> bool {
        matches!(
            (self, region),
            (DatasetFormat::Svt, Some(CropRegion::Rect { .. }))
                | (DatasetFormat::SynthText, Some(CropRegion::Corners { .. }))
                | (DatasetFormat::Iiit5k | DatasetFormat::Syn90k, None)
        )
    }
}

/// Selects and locates a dataset.
#[derive(Debug, Clone, Serialize, Deserialize, ConfigValidator)]
pub struct DatasetConfig {
    /// Annotation format.
    pub format: DatasetFormat,
    /// Directory holding the images.
    #[validate(path)]
    pub image_dir: PathBuf,
    /// JSON manifest of [`AnnotationRecord`]s. Required for every format
    /// except Syn90k, which reads labels from file names.
    #[serde(default)]
    #[validate(optional_path)]
    pub annotations: Option<PathBuf>,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            format: DatasetFormat::Iiit5k,
            image_dir: PathBuf::from("."),
            annotations: None,
        }
    }
}

/// Extracts the label from a Syn90k file name such as `12_Hello_345.jpg`.
///
/// # Errors
///
/// Returns `OCRError::InvalidInput` unless the name splits on `_` into
/// exactly three parts.
pub fn parse_syn90k_label(file_name: &str) -> Result<&str, OCRError> {
    let mut parts = file_name.split('_');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(_), Some(label), Some(_), None) => Ok(label),
        _ => Err(OCRError::invalid_input(format!(
            "syn90k file name {:?} is not of the form <n>_<label>_<m>",
            file_name
        ))),
    }
}

/// A labeled source backed by an image directory and annotation records.
#[derive(Debug, Clone)]
pub struct AnnotatedSource {
    format: DatasetFormat,
    image_dir: PathBuf,
    records: Vec<AnnotationRecord>,
    transform: ImageTransform,
    codec: LabelCodec,
}

impl AnnotatedSource {
    /// Builds a source from records handed over by an external extractor.
    ///
    /// Records whose image is not present in `image_dir` are dropped.
    ///
    /// # Errors
    ///
    /// Returns `OCRError::Config` if `transform` is invalid, `OCRError::Io`
    /// if `image_dir` cannot be listed and `OCRError::InvalidInput` if a
    /// record's region does not match `format`.
    pub fn from_records(
        format: DatasetFormat,
        image_dir: impl Into<PathBuf>,
        records: Vec<AnnotationRecord>,
        transform: ImageTransform,
        codec: LabelCodec,
    ) -> Result<Self, OCRError> {
        transform.verify()?;
        let image_dir = image_dir.into();

        if let Some(bad) = records.iter().find(|r| !format.accepts(r.region.as_ref())) {
            return Err(OCRError::invalid_input(format!(
                "{} record for {:?} has unexpected region {:?}",
                format.name(),
                bad.image_name,
                bad.region
            )));
        }

        let available: HashSet<String> = list_file_names(&image_dir)?.into_iter().collect();
        let total = records.len();
        let records: Vec<_> = records
            .into_iter()
            .filter(|r| available.contains(r.file_name()))
            .collect();

        if records.len() < total {
            tracing::debug!(
                "{}: dropped {} of {} records with no image in {}",
                format.name(),
                total - records.len(),
                total,
                image_dir.display()
            );
        }
        tracing::info!("{}: {} samples", format.name(), records.len());

        Ok(Self {
            format,
            image_dir,
            records,
            transform,
            codec,
        })
    }

    /// Builds a Syn90k source by listing `image_dir`.
    ///
    /// # Errors
    ///
    /// Returns `OCRError::InvalidInput` for a file name that does not carry
    /// a label, see [`parse_syn90k_label`].
    pub fn syn90k(
        image_dir: impl Into<PathBuf>,
        transform: ImageTransform,
        codec: LabelCodec,
    ) -> Result<Self, OCRError> {
        let image_dir = image_dir.into();
        let records = list_file_names(&image_dir)?
            .into_iter()
            .map(|name| {
                let label = parse_syn90k_label(&name)?.to_string();
                Ok(AnnotationRecord::new(name, label))
            })
            .collect::<Result<Vec<_>, OCRError>>()?;
        Self::from_records(DatasetFormat::Syn90k, image_dir, records, transform, codec)
    }

    /// Builds the source described by `config`.
    ///
    /// # Errors
    ///
    /// Returns `OCRError::Config` if a configured path is missing and
    /// `OCRError::ConfigError` if a format other than Syn90k has no
    /// annotation manifest.
    pub fn from_config(
        config: &DatasetConfig,
        transform: ImageTransform,
        codec: LabelCodec,
    ) -> Result<Self, OCRError> {
        config.validate()?;
        match (config.format, config.annotations.as_deref()) {
            (format, Some(manifest)) => {
                let records = load_manifest(manifest)?;
                Self::from_records(format, &config.image_dir, records, transform, codec)
            }
            (DatasetFormat::Syn90k, None) => Self::syn90k(&config.image_dir, transform, codec),
            (format, None) => Err(OCRError::config_error(format!(
                "{} dataset needs an annotation manifest",
                format.name()
            ))),
        }
    }

    /// The annotation format.
    pub fn format(&self) -> DatasetFormat {
        self.format
    }

    /// The image directory.
    pub fn image_dir(&self) -> &Path {
        &self.image_dir
    }

    /// Records kept after filtering, in sample order.
    pub fn records(&self) -> &[AnnotationRecord] {
        &self.records
    }

    /// The image transform.
    pub fn transform(&self) -> &ImageTransform {
        &self.transform
    }

    /// The label codec.
    pub fn codec(&self) -> &LabelCodec {
        &self.codec
    }
}

impl LabeledImageSource for AnnotatedSource {
    fn name(&self) -> &str {
        self.format.name()
    }

    fn len(&self) -> usize {
        self.records.len()
    }

    fn get(&self, index: usize) -> Result<LabeledSample, OCRError> {
        let record = self
            .records
            .get(index)
            .ok_or_else(|| OCRError::index_out_of_range(index, self.records.len()))?;

        let label = self.codec.encode(&record.label)?;
        let image = load_image(&self.image_dir.join(record.file_name()))?;
        let image = match &record.region {
            Some(region) => self.transform.apply(&crop_region(&image, region)?, index)?,
            None => self.transform.apply(&image, index)?,
        };

        Ok(LabeledSample {
            image,
            label,
            text: record.label.clone(),
        })
    }

    fn image_shape(&self) -> [usize; 3] {
        self.transform.output_shape()
    }

    fn seq_len(&self) -> usize {
        self.codec.seq_len()
    }

    fn num_classes(&self) -> usize {
        self.codec.num_classes()
    }
}
