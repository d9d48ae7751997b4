//! Annotation records handed over by external label extractors.

use crate::core::OCRError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Word region inside a full scene image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum CropRegion {
    /// Top-left corner plus size, as SVT annotates words.
    Rect {
        x: i64,
        y: i64,
        width: i64,
        height: i64,
    },
    /// Inclusive min/max corners, as SynthText word boxes reduce to.
    Corners {
        xmin: i64,
        ymin: i64,
        xmax: i64,
        ymax: i64,
    },
}

/// One labeled word: which image, where in it, and its transcription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationRecord {
    /// Image path as written by the annotation; only the file name is used.
    pub image_name: String,
    /// Word region, absent for pre-cropped word images.
    #[serde(default)]
    pub region: Option<CropRegion>,
    /// Ground-truth transcription.
    pub label: String,
}

impl AnnotationRecord {
    /// Record for a pre-cropped word image.
    pub fn new(image_name: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            image_name: image_name.into(),
            region: None,
            label: label.into(),
        }
    }

    /// Sets the word region.
    pub fn with_region(mut self, region: CropRegion) -> Self {
        self.region = Some(region);
        self
    }

    /// Last path component of `image_name`.
    pub fn file_name(&self) -> &str {
        self.image_name
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(&self.image_name)
    }
}

/// Reads a JSON array of [`AnnotationRecord`]s.
///
/// # Errors
///
/// Returns `OCRError::Io` if the file cannot be read and `OCRError::Json` if
/// it is not a valid record list.
pub fn load_manifest(path: &Path) -> Result<Vec<AnnotationRecord>, OCRError> {
    let content = std::fs::read_to_string(path)?;
    let records: Vec<AnnotationRecord> = serde_json::from_str(&content)?;
    tracing::debug!(
        "Loaded {} annotation records from {}",
        records.len(),
        path.display()
    );
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_file_name_strips_directories() {
        assert_eq!(AnnotationRecord::new("train/1009_2.png", "x").file_name(), "1009_2.png");
        assert_eq!(AnnotationRecord::new("img\\a.jpg", "x").file_name(), "a.jpg");
        assert_eq!(AnnotationRecord::new("plain.png", "x").file_name(), "plain.png");
    }

    #[test]
    fn test_load_manifest() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[
                {{"image_name": "img/00_01.jpg", "region": {{"kind": "rect", "x": 1, "y": 2, "width": 30, "height": 10}}, "label": "PUFF"}},
                {{"image_name": "word_3.png", "label": "hello"}}
            ]"#
        )
        .unwrap();

        let records = load_manifest(file.path()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(
            records[0].region,
            Some(CropRegion::Rect {
                x: 1,
                y: 2,
                width: 30,
                height: 10
            })
        );
        assert_eq!(records[1], AnnotationRecord::new("word_3.png", "hello"));
    }

    #[test]
    fn test_load_manifest_rejects_garbage() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(load_manifest(file.path()), Err(OCRError::Json(_))));
        assert!(matches!(
            load_manifest(Path::new("/nonexistent/manifest.json")),
            Err(OCRError::Io(_))
        ));
    }
}
