//! Utility functions for image loading.
//!
//! Loading single or batched images from files and listing the files of an
//! image directory.

use crate::core::OCRError;
use image::{DynamicImage, RgbImage};
use std::path::Path;

/// Converts a DynamicImage to an RgbImage.
pub fn dynamic_to_rgb(img: DynamicImage) -> RgbImage {
    img.to_rgb8()
}

/// Loads an image from a file path and converts it to RgbImage.
///
/// # Errors
///
/// Returns `OCRError::ImageLoad` if the file cannot be opened or decoded.
pub fn load_image(path: &Path) -> Result<RgbImage, OCRError> {
    let img = image::open(path).map_err(OCRError::ImageLoad)?;
    Ok(dynamic_to_rgb(img))
}

/// Loads a batch of images from file paths with a custom parallel threshold.
///
/// Batches larger than the threshold (or `DEFAULT_PARALLEL_THRESHOLD` when
/// `None`) are decoded with rayon. The output keeps the order of `paths`.
///
/// # Errors
///
/// Returns the first `OCRError` encountered.
pub fn load_images_batch_with_threshold<P: AsRef<Path> + Send + Sync>(
    paths: &[P],
    parallel_threshold: Option<usize>,
) -> Result<Vec<RgbImage>, OCRError> {
    use crate::core::constants::DEFAULT_PARALLEL_THRESHOLD;

    let threshold = parallel_threshold.unwrap_or(DEFAULT_PARALLEL_THRESHOLD);

    if paths.len() > threshold {
        use rayon::prelude::*;
        paths.par_iter().map(|p| load_image(p.as_ref())).collect()
    } else {
        paths.iter().map(|p| load_image(p.as_ref())).collect()
    }
}

/// Lists the regular files directly inside `dir`, sorted by name.
///
/// Names that are not valid UTF-8 are skipped.
///
/// # Errors
///
/// Returns `OCRError::Io` if the directory cannot be read.
pub fn list_file_names(dir: &Path) -> Result<Vec<String>, OCRError> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        match entry.file_name().into_string() {
            Ok(name) => names.push(name),
            Err(name) => tracing::warn!("Skipping non UTF-8 file name {:?}", name),
        }
    }
    names.sort();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use tempfile::TempDir;

    #[test]
    fn test_list_file_names_sorted_files_only() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("b.png"), b"").unwrap();
        std::fs::write(dir.path().join("a.png"), b"").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();

        let names = list_file_names(dir.path()).unwrap();
        assert_eq!(names, vec!["a.png", "b.png"]);
    }

    #[test]
    fn test_load_images_batch_keeps_order() {
        let dir = TempDir::new().unwrap();
        let paths: Vec<_> = (0..6u8)
            .map(|i| {
                let path = dir.path().join(format!("{i}.png"));
                RgbImage::from_pixel(2, 2, Rgb([i * 10, 0, 0]))
                    .save(&path)
                    .unwrap();
                path
            })
            .collect();

        let images = load_images_batch_with_threshold(&paths, Some(2)).unwrap();
        for (i, image) in images.iter().enumerate() {
            assert_eq!(image.get_pixel(0, 0)[0], i as u8 * 10);
        }
    }

    #[test]
    fn test_load_missing_image() {
        let result = load_image(Path::new("/nonexistent/word.png"));
        assert!(matches!(result, Err(OCRError::ImageLoad(_))));
    }
}
