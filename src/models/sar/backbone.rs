//! Visual backbones producing the feature volume.

use candle_core::{Result, Tensor};
use candle_nn::{Conv2d, Conv2dConfig, Module, VarBuilder};

/// Maps an image batch `[batch, channels, height, width]` to a feature volume
/// `[batch, feature_channels, feature_height, feature_width]`.
pub trait Backbone: Send + Sync + std::fmt::Debug {
    fn forward(&self, images: &Tensor) -> Result<Tensor>;

    /// Depth of the produced feature volume.
    fn out_channels(&self) -> usize;
}

#[derive(Debug, Clone)]
struct ConvStage {
    conv: Conv2d,
    pool: (usize, usize),
}

impl ConvStage {
    fn load(
        in_channels: usize,
        out_channels: usize,
        pool: (usize, usize),
        vb: VarBuilder,
    ) -> Result<Self> {
        let cfg = Conv2dConfig {
            padding: 1,
            ..Default::default()
        };
        let conv = candle_nn::conv2d(in_channels, out_channels, 3, cfg, vb.pp("conv"))?;
        Ok(Self { conv, pool })
    }
}

impl Module for ConvStage {
    fn forward(&self, x: &Tensor) -> Result<Tensor> {
        self.conv
            .forward(x)?
            .relu()?
            .max_pool2d_with_stride(self.pool, self.pool)
    }
}

/// A plain three-stage convolutional feature extractor.
///
/// Each stage is a 3x3 convolution and a ReLU followed by max pooling of
/// 2x2, 2x2 and 1x2 respectively, so the feature volume is a quarter of the
/// input height and an eighth of its width.
#[derive(Debug, Clone)]
pub struct ConvBackbone {
    stages: Vec<ConvStage>,
    out_channels: usize,
}

impl ConvBackbone {
    /// Height and width reduction factors.
    pub const STRIDE: (usize, usize) = (4, 8);

    /// Creates the three conv stages under `vb`.
    pub fn load(in_channels: usize, out_channels: usize, vb: VarBuilder) -> Result<Self> {
        let widths = [64, 128, out_channels];
        let pools = [(2, 2), (2, 2), (1, 2)];

        let mut stages = Vec::with_capacity(widths.len());
        let mut channels = in_channels;
        for (i, (&width, &pool)) in widths.iter().zip(pools.iter()).enumerate() {
            stages.push(ConvStage::load(channels, width, pool, vb.pp(format!("stages.{i}")))?);
            channels = width;
        }

        Ok(Self {
            stages,
            out_channels,
        })
    }

    /// Feature volume size for an input of `height x width` pixels.
    pub fn feature_size(height: usize, width: usize) -> (usize, usize) {
        (height / Self::STRIDE.0, width / Self::STRIDE.1)
    }
}

impl Backbone for ConvBackbone {
    fn forward(&self, images: &Tensor) -> Result<Tensor> {
        self.stages
            .iter()
            .try_fold(images.clone(), |x, stage| stage.forward(&x))
    }

    fn out_channels(&self) -> usize {
        self.out_channels
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{DType, Device};
    use candle_nn::VarMap;

    #[test]
    fn test_conv_backbone_shape() -> Result<()> {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let backbone = ConvBackbone::load(3, 32, vb)?;

        let images = Tensor::randn(0f32, 1., (2, 3, 12, 24), &device)?;
        let features = backbone.forward(&images)?;
        assert_eq!(features.dims(), &[2, 32, 3, 3]);
        assert_eq!(ConvBackbone::feature_size(12, 24), (3, 3));
        assert_eq!(ConvBackbone::feature_size(48, 160), (12, 20));
        assert_eq!(backbone.out_channels(), 32);
        Ok(())
    }
}
