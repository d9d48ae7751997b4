//! Additive 2-D attention over the feature volume.

use candle_core::{D, Device, Result, Tensor};
use candle_nn::{Conv2d, Conv2dConfig, Linear, Module, VarBuilder};

/// Feature volume prepared once per decoding sequence.
///
/// Keys depend only on the features, so they are projected up front and
/// reused by every step.
#[derive(Debug, Clone)]
pub struct AttentionMemory {
    /// Projected features, `[batch, height * width, attention_dim]`.
    keys: Tensor,
    /// Raw feature vectors, `[batch, height * width, channels]`.
    values: Tensor,
    height: usize,
    width: usize,
}

impl AttentionMemory {
    /// Spatial size `(height, width)` of the attended feature volume.
    pub fn spatial_size(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    /// Batch size.
    pub fn batch_size(&self) -> Result<usize> {
        self.values.dim(0)
    }

    /// Device the feature volume lives on.
    pub fn device(&self) -> &Device {
        self.values.device()
    }
}

/// Scores every location from the decoder state and its feature vector:
/// `score = w · tanh(K * V + W h)`, where `K` is a 3x3 convolution over the
/// feature volume so each key sees its neighbourhood.
#[derive(Debug, Clone)]
pub struct SpatialAttention {
    key_proj: Conv2d,
    query_proj: Linear,
    score: Linear,
}

impl SpatialAttention {
    /// Creates the key, query and score projections under `vb`.
    pub fn load(
        feature_channels: usize,
        hidden_units: usize,
        attention_dim: usize,
        vb: VarBuilder,
    ) -> Result<Self> {
        let cfg = Conv2dConfig {
            padding: 1,
            ..Default::default()
        };
        let key_proj =
            candle_nn::conv2d(feature_channels, attention_dim, 3, cfg, vb.pp("key_proj"))?;
        let query_proj =
            candle_nn::linear_no_bias(hidden_units, attention_dim, vb.pp("query_proj"))?;
        let score = candle_nn::linear_no_bias(attention_dim, 1, vb.pp("score"))?;
        Ok(Self {
            key_proj,
            query_proj,
            score,
        })
    }

    /// Projects `features` (`[batch, channels, height, width]`) into keys.
    pub fn prepare(&self, features: &Tensor) -> Result<AttentionMemory> {
        let (b, c, h, w) = features.dims4()?;
        let keys = self
            .key_proj
            .forward(features)?
            .flatten_from(2)?
            .transpose(1, 2)?
            .contiguous()?;
        let values = features
            .reshape((b, c, h * w))?
            .transpose(1, 2)?
            .contiguous()?;
        Ok(AttentionMemory {
            keys,
            values,
            height: h,
            width: w,
        })
    }

    /// Attends with `hidden` (`[batch, hidden_units]`).
    ///
    /// Returns the glimpse `[batch, channels]` and the attention weights
    /// `[batch, height * width]`, which sum to one over every row.
    pub fn forward(&self, memory: &AttentionMemory, hidden: &Tensor) -> Result<(Tensor, Tensor)> {
        let query = self.query_proj.forward(hidden)?.unsqueeze(1)?;
        let energy = memory.keys.broadcast_add(&query)?.tanh()?;
        let scores = self.score.forward(&energy)?.squeeze(D::Minus1)?;
        let weights = candle_nn::ops::softmax(&scores, D::Minus1)?;
        let glimpse = weights
            .unsqueeze(1)?
            .matmul(&memory.values)?
            .squeeze(1)?;
        Ok((glimpse, weights))
    }
}
