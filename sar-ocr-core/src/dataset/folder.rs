//! Unlabeled word images for inference.

use super::transform::ImageTransform;
use crate::core::OCRError;
use crate::utils::{list_file_names, load_image, load_images_batch_with_threshold};
use ndarray::Array3;
use std::path::{Path, PathBuf};

/// Every file of a directory, transformed like the training images and
/// paired with its file name.
#[derive(Debug, Clone)]
pub struct ImageFolder {
    dir: PathBuf,
    file_names: Vec<String>,
    transform: ImageTransform,
}

impl ImageFolder {
    /// Lists `dir`, sorted by file name.
    pub fn new(dir: impl Into<PathBuf>, transform: ImageTransform) -> Result<Self, OCRError> {
        transform.verify()?;
        let dir = dir.into();
        let file_names = list_file_names(&dir)?;
        tracing::debug!("{}: {} images", dir.display(), file_names.len());
        Ok(Self {
            dir,
            file_names,
            transform,
        })
    }

    /// The listed directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Number of images.
    pub fn len(&self) -> usize {
        self.file_names.len()
    }

    /// Returns true if the directory held no files.
    pub fn is_empty(&self) -> bool {
        self.file_names.is_empty()
    }

    /// File names in sample order.
    pub fn file_names(&self) -> &[String] {
        &self.file_names
    }

    /// Loads image `index` and its file name.
    pub fn get(&self, index: usize) -> Result<(Array3<f32>, &str), OCRError> {
        let name = self
            .file_names
            .get(index)
            .ok_or_else(|| OCRError::index_out_of_range(index, self.file_names.len()))?;
        let image = load_image(&self.dir.join(name))?;
        Ok((self.transform.apply(&image, index)?, name.as_str()))
    }

    /// Loads the images at `indices`, in that order.
    pub fn get_batch(&self, indices: &[usize]) -> Result<Vec<(Array3<f32>, &str)>, OCRError> {
        let names = indices
            .iter()
            .map(|&i| {
                self.file_names
                    .get(i)
                    .ok_or_else(|| OCRError::index_out_of_range(i, self.file_names.len()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let paths: Vec<_> = names.iter().map(|name| self.dir.join(name)).collect();
        let images = load_images_batch_with_threshold(&paths, None)?;

        images
            .iter()
            .zip(indices.iter().zip(names))
            .map(|(image, (&index, name))| {
                Ok::<_, OCRError>((self.transform.apply(image, index)?, name.as_str()))
            })
            .collect()
    }
}
