//! Constants used throughout the recognition pipeline.
//!
//! Default model sizes, dataset input geometry and the names of the
//! reserved vocabulary tokens.

/// The default decoding sequence length.
///
/// Every label is encoded to exactly this many indices and the decoder
/// always runs this many steps.
pub const DEFAULT_SEQ_LEN: usize = 40;

/// The default hidden size of the encoder and decoder LSTMs.
pub const DEFAULT_HIDDEN_UNITS: usize = 512;

/// The default number of stacked LSTM layers in the encoder and decoder.
pub const DEFAULT_LAYERS: usize = 2;

/// The default dropout retention probability (1.0 disables dropout).
pub const DEFAULT_KEEP_PROB: f64 = 1.0;

/// The default depth of the backbone feature volume.
pub const DEFAULT_FEATURE_CHANNELS: usize = 512;

/// The default model input height in pixels.
pub const DEFAULT_INPUT_HEIGHT: u32 = 48;

/// The default model input width in pixels.
pub const DEFAULT_INPUT_WIDTH: u32 = 160;

/// The default minimum resized width for aspect-preserving resizes.
pub const DEFAULT_MIN_WIDTH: u32 = 48;

/// The default maximum resized width for aspect-preserving resizes.
pub const DEFAULT_MAX_WIDTH: u32 = 160;

/// Pixel value mapped to zero by normalization; `(p - 127.5) / 127.5` maps
/// `[0, 255]` onto `[-1, 1]`.
pub const PIXEL_CENTER: f32 = 127.5;

/// The default threshold for parallel processing.
///
/// Batches with more items than this are loaded with rayon.
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 4;

/// Name of the end-of-sequence token.
pub const END_TOKEN: &str = "END";

/// Name of the padding token.
pub const PAD_TOKEN: &str = "PAD";

/// Name of the unknown-character token.
pub const UNK_TOKEN: &str = "UNK";
