//! Show-Attend-Read text recognition.
//!
//! The model composes three stages:
//!
//! 1. A [`Backbone`] turns images into a feature volume
//!    `[batch, feature_channels, feature_height, feature_width]`.
//! 2. The [`SequenceEncoder`] scans that volume column by column with a
//!    stacked LSTM and summarizes it as a context vector.
//! 3. The [`AttentionDecoder`] starts from the context vector and decodes
//!    `seq_len` symbols, attending over the whole feature volume at every
//!    step.
//!
//! [`Sar`] wires the stages together and chooses between teacher forcing and
//! greedy decoding through [`DecodingMode`].

mod attention;
mod backbone;
mod config;
mod decoder;
mod encoder;
mod model;

pub use attention::{AttentionMemory, SpatialAttention};
pub use backbone::{Backbone, ConvBackbone};
pub use config::{SarConfig, ScanAxis, Summary};
pub use decoder::{AttentionDecoder, DecoderOutput, DecoderState, DecoderStep, DecodingMode};
pub use encoder::SequenceEncoder;
pub use model::{Recognition, Sar, SarOutput};
