//! Recognition models.
//!
//! This module contains the candle implementation of the SAR recognizer.

pub mod sar;

pub use sar::*;
