//! Utility functions for the recognition pipeline.
//!
//! Image loading and directory listing helpers shared by the dataset sources.

pub mod image;

pub use image::{dynamic_to_rgb, list_file_names, load_image, load_images_batch_with_threshold};
