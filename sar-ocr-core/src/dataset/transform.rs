//! Deterministic crop, resize and normalization of word images.

use crate::core::config::{ConfigError, ConfigValidator as _};
use crate::core::constants::{
    DEFAULT_INPUT_HEIGHT, DEFAULT_INPUT_WIDTH, DEFAULT_MAX_WIDTH, DEFAULT_MIN_WIDTH, PIXEL_CENTER,
};
use crate::core::OCRError;
use crate::dataset::record::CropRegion;
use image::imageops::FilterType;
use image::{Rgb, RgbImage};
use ndarray::Array3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sar_ocr_derive::ConfigValidator;
use serde::{Deserialize, Serialize};

/// Channel order of the produced arrays.
///
/// Defaults to BGR, the order OpenCV decodes into, so arrays line up with
/// models trained on OpenCV-loaded data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelOrder {
    #[default]
    Bgr,
    Rgb,
}

impl ChannelOrder {
    fn source_channel(self, c: usize) -> usize {
        match self {
            ChannelOrder::Bgr => 2 - c,
            ChannelOrder::Rgb => c,
        }
    }
}

/// How the source image is fitted to the target width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "policy")]
pub enum WidthPolicy {
    /// Resize straight to `height x width`, ignoring aspect ratio.
    #[default]
    Stretch,
    /// Resize to the target height keeping the aspect ratio, clamp the width
    /// to `[min_width, max_width]` and paste it at the left of a canvas of
    /// uniform noise. The noise depends only on `seed` and the sample index.
    KeepAspect {
        min_width: u32,
        max_width: u32,
        seed: u64,
    },
}

impl WidthPolicy {
    /// Keep-aspect policy with the default width bounds.
    pub fn keep_aspect(seed: u64) -> Self {
        WidthPolicy::KeepAspect {
            min_width: DEFAULT_MIN_WIDTH,
            max_width: DEFAULT_MAX_WIDTH,
            seed,
        }
    }
}

/// Maps an RGB image to a `(3, height, width)` array in `[-1, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ConfigValidator)]
pub struct ImageTransform {
    /// Output height in pixels.
    #[validate(min = 1)]
    pub height: u32,
    /// Output width in pixels.
    #[validate(min = 1)]
    pub width: u32,
    #[serde(default)]
    pub channel_order: ChannelOrder,
    #[serde(default)]
    pub width_policy: WidthPolicy,
}

impl Default for ImageTransform {
    fn default() -> Self {
        Self::new(DEFAULT_INPUT_HEIGHT, DEFAULT_INPUT_WIDTH)
    }
}

impl ImageTransform {
    /// Stretching BGR transform of the given output size.
    pub fn new(height: u32, width: u32) -> Self {
        Self {
            height,
            width,
            channel_order: ChannelOrder::default(),
            width_policy: WidthPolicy::default(),
        }
    }

    /// Sets the channel order.
    pub fn with_channel_order(mut self, channel_order: ChannelOrder) -> Self {
        self.channel_order = channel_order;
        self
    }

    /// Sets the width policy.
    pub fn with_width_policy(mut self, width_policy: WidthPolicy) -> Self {
        self.width_policy = width_policy;
        self
    }

    /// Shape of the produced arrays, `[channels, height, width]`.
    pub fn output_shape(&self) -> [usize; 3] {
        [3, self.height as usize, self.width as usize]
    }

    /// Runs the derived field checks plus the width-policy bounds.
    pub fn verify(&self) -> Result<(), ConfigError> {
        self.validate()?;
        if let WidthPolicy::KeepAspect {
            min_width,
            max_width,
            ..
        } = self.width_policy
            && (min_width == 0 || min_width > max_width || max_width > self.width)
        {
            return Err(ConfigError::InvalidConfig {
                message: format!(
                    "keep-aspect widths must satisfy 0 < min_width <= max_width <= width, got {} / {} / {}",
                    min_width, max_width, self.width
                ),
            });
        }
        Ok(())
    }

    /// Transforms `image`.
    ///
    /// `index` only seeds the background noise of [`WidthPolicy::KeepAspect`].
    pub fn apply(&self, image: &RgbImage, index: usize) -> Result<Array3<f32>, OCRError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(OCRError::invalid_input("cannot transform an empty image"));
        }
        let fitted = match self.width_policy {
            WidthPolicy::Stretch => {
                image::imageops::resize(image, self.width, self.height, FilterType::Triangle)
            }
            WidthPolicy::KeepAspect {
                min_width,
                max_width,
                seed,
            } => self.fit_keep_aspect(image, min_width, max_width, seed, index),
        };
        self.to_array(&fitted)
    }

    fn fit_keep_aspect(
        &self,
        image: &RgbImage,
        min_width: u32,
        max_width: u32,
        seed: u64,
        index: usize,
    ) -> RgbImage {
        let scaled = (image.width() as u64 * self.height as u64 / image.height() as u64) as u32;
        let resized_width = scaled.clamp(min_width, max_width);
        let resized =
            image::imageops::resize(image, resized_width, self.height, FilterType::Triangle);

        let mut rng =
            StdRng::seed_from_u64(seed ^ (index as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15));
        let mut canvas = RgbImage::from_fn(self.width, self.height, |_, _| {
            Rgb([rng.gen_range(0..255), rng.gen_range(0..255), rng.gen_range(0..255)])
        });
        image::imageops::replace(&mut canvas, &resized, 0, 0);
        canvas
    }

    fn to_array(&self, image: &RgbImage) -> Result<Array3<f32>, OCRError> {
        let (w, h) = (image.width() as usize, image.height() as usize);
        let raw = image.as_raw();
        let mut data = Vec::with_capacity(3 * h * w);
        for c in 0..3 {
            let src = self.channel_order.source_channel(c);
            for y in 0..h {
                for x in 0..w {
                    let value = raw[(y * w + x) * 3 + src] as f32;
                    data.push((value - PIXEL_CENTER) / PIXEL_CENTER);
                }
            }
        }
        Array3::from_shape_vec((3, h, w), data)
            .map_err(|e| OCRError::tensor_operation("image array from pixels", e))
    }
}

/// Crops a word region out of `image`.
///
/// Rectangles are clamped the way the SVT annotations need (`x` and `y` into
/// the image, `width` up to the image width, `height` up to one less than the
/// image height); corner boxes have every coordinate clamped into the image
/// and are inclusive on both ends.
///
/// # Errors
///
/// Returns `OCRError::InvalidInput` if the clamped region is empty.
pub fn crop_region(image: &RgbImage, region: &CropRegion) -> Result<RgbImage, OCRError> {
    let (img_w, img_h) = (image.width() as i64, image.height() as i64);
    if img_w == 0 || img_h == 0 {
        return Err(OCRError::invalid_input("cannot crop an empty image"));
    }
    let (x0, y0, x1, y1) = match *region {
        CropRegion::Rect {
            x,
            y,
            width,
            height,
        } => {
            let x = x.clamp(0, img_w - 1);
            let y = y.clamp(0, img_h - 1);
            let width = width.clamp(0, img_w);
            let height = height.clamp(0, img_h - 1);
            (x, y, (x + width).min(img_w), (y + height).min(img_h))
        }
        CropRegion::Corners {
            xmin,
            ymin,
            xmax,
            ymax,
        } => (
            xmin.clamp(0, img_w - 1),
            ymin.clamp(0, img_h - 1),
            xmax.clamp(0, img_w - 1) + 1,
            ymax.clamp(0, img_h - 1) + 1,
        ),
    };

    if x1 <= x0 || y1 <= y0 {
        return Err(OCRError::invalid_input(format!(
            "crop region {:?} is empty inside a {}x{} image",
            region, img_w, img_h
        )));
    }

    Ok(image::imageops::crop_imm(
        image,
        x0 as u32,
        y0 as u32,
        (x1 - x0) as u32,
        (y1 - y0) as u32,
    )
    .to_image())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| Rgb([(x * 10) as u8, (y * 10) as u8, 255]))
    }

    #[test]
    fn test_stretch_shape_and_range() {
        let transform = ImageTransform::new(8, 16);
        let array = transform.apply(&gradient(20, 10), 0).unwrap();
        assert_eq!(array.shape(), &[3, 8, 16]);
        assert!(array.iter().all(|v| (-1.0..=1.0).contains(v)));
    }

    #[test]
    fn test_normalization_endpoints() {
        let black = RgbImage::from_pixel(4, 4, Rgb([0, 0, 0]));
        let white = RgbImage::from_pixel(4, 4, Rgb([255, 255, 255]));
        let transform = ImageTransform::new(4, 4);
        assert!(transform.apply(&black, 0).unwrap().iter().all(|&v| v == -1.0));
        assert!(transform.apply(&white, 0).unwrap().iter().all(|&v| v == 1.0));
    }

    #[test]
    fn test_channel_order() {
        let image = RgbImage::from_pixel(2, 2, Rgb([255, 0, 0]));
        let bgr = ImageTransform::new(2, 2).apply(&image, 0).unwrap();
        assert_eq!(bgr[[0, 0, 0]], -1.0);
        assert_eq!(bgr[[2, 0, 0]], 1.0);

        let rgb = ImageTransform::new(2, 2)
            .with_channel_order(ChannelOrder::Rgb)
            .apply(&image, 0)
            .unwrap();
        assert_eq!(rgb[[0, 0, 0]], 1.0);
        assert_eq!(rgb[[2, 0, 0]], -1.0);
    }

    #[test]
    fn test_keep_aspect_pastes_left_and_is_reproducible() {
        let transform =
            ImageTransform::new(10, 40).with_width_policy(WidthPolicy::KeepAspect {
                min_width: 4,
                max_width: 30,
                seed: 7,
            });
        transform.verify().unwrap();
        let white = RgbImage::from_pixel(10, 10, Rgb([255, 255, 255]));

        let first = transform.apply(&white, 3).unwrap();
        let second = transform.apply(&white, 3).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.shape(), &[3, 10, 40]);
        // Square image at height 10 keeps width 10.
        assert!(first.slice(ndarray::s![.., .., ..10]).iter().all(|&v| v == 1.0));
        // Noise never reaches 255.
        assert!(first.slice(ndarray::s![.., .., 10..]).iter().all(|&v| v < 1.0));
    }

    #[test]
    fn test_keep_aspect_clamps_width() {
        let transform =
            ImageTransform::new(10, 40).with_width_policy(WidthPolicy::KeepAspect {
                min_width: 4,
                max_width: 30,
                seed: 0,
            });
        let wide = RgbImage::from_pixel(200, 10, Rgb([255, 255, 255]));
        let array = transform.apply(&wide, 0).unwrap();
        assert!(array.slice(ndarray::s![.., .., ..30]).iter().all(|&v| v == 1.0));
        assert!(array.slice(ndarray::s![.., .., 30..]).iter().all(|&v| v < 1.0));
    }

    #[test]
    fn test_verify_rejects_bad_bounds() {
        let transform = ImageTransform::new(10, 20).with_width_policy(WidthPolicy::KeepAspect {
            min_width: 4,
            max_width: 30,
            seed: 0,
        });
        assert!(transform.verify().is_err());
        assert!(ImageTransform::new(0, 20).verify().is_err());
        assert!(ImageTransform::default().verify().is_ok());
    }

    #[test]
    fn test_crop_rect_is_clamped() {
        let image = gradient(20, 10);
        let crop = crop_region(
            &image,
            &CropRegion::Rect {
                x: -5,
                y: 2,
                width: 8,
                height: 50,
            },
        )
        .unwrap();
        assert_eq!(crop.dimensions(), (8, 8));
        assert_eq!(crop.get_pixel(0, 0), image.get_pixel(0, 2));
    }

    #[test]
    fn test_crop_corners_inclusive() {
        let image = gradient(20, 10);
        let crop = crop_region(
            &image,
            &CropRegion::Corners {
                xmin: 2,
                ymin: 1,
                xmax: 5,
                ymax: 100,
            },
        )
        .unwrap();
        assert_eq!(crop.dimensions(), (4, 9));
    }

    #[test]
    fn test_empty_crop_is_error() {
        let image = gradient(20, 10);
        let result = crop_region(
            &image,
            &CropRegion::Rect {
                x: 3,
                y: 3,
                width: 0,
                height: 4,
            },
        );
        assert!(matches!(result, Err(OCRError::InvalidInput { .. })));
    }
}
