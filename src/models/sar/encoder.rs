//! Recurrent sequence encoder reducing the feature volume to a context vector.

use super::config::{SarConfig, ScanAxis, Summary};
use candle_core::{D, Result, Tensor};
use candle_nn::rnn::{LSTM, LSTMConfig, RNN};
use candle_nn::{Dropout, VarBuilder};

/// Stacked LSTM reading the feature volume one column (or row) at a time.
#[derive(Debug, Clone)]
pub struct SequenceEncoder {
    layers: Vec<LSTM>,
    dropout: Option<Dropout>,
    scan_axis: ScanAxis,
    summary: Summary,
    hidden_units: usize,
}

impl SequenceEncoder {
    /// Creates `cfg.layers` LSTMs under `vb.pp("lstm")`.
    pub fn load(cfg: &SarConfig, vb: VarBuilder) -> Result<Self> {
        let mut layers = Vec::with_capacity(cfg.layers);
        let mut in_dim = cfg.encoder_input_size();
        for layer_idx in 0..cfg.layers {
            let lstm_cfg = LSTMConfig {
                layer_idx,
                ..Default::default()
            };
            layers.push(candle_nn::rnn::lstm(
                in_dim,
                cfg.hidden_units,
                lstm_cfg,
                vb.pp("lstm"),
            )?);
            in_dim = cfg.hidden_units;
        }

        let dropout = (cfg.keep_prob < 1.0).then(|| Dropout::new((1.0 - cfg.keep_prob) as f32));

        Ok(Self {
            layers,
            dropout,
            scan_axis: cfg.scan_axis,
            summary: cfg.summary,
            hidden_units: cfg.hidden_units,
        })
    }

    /// Size of the produced context vector.
    pub fn hidden_units(&self) -> usize {
        self.hidden_units
    }

    /// Flattens `[batch, channels, height, width]` into the step sequence
    /// `[batch, steps, features]` for the configured scan axis.
    pub fn to_sequence(&self, features: &Tensor) -> Result<Tensor> {
        let (b, c, h, w) = features.dims4()?;
        match self.scan_axis {
            ScanAxis::Columns => features.permute((0, 3, 1, 2))?.reshape((b, w, c * h)),
            ScanAxis::Rows => features.permute((0, 2, 1, 3))?.reshape((b, h, c * w)),
        }
    }

    /// Evaluation-mode encoding; see [`forward_t`](Self::forward_t).
    pub fn forward(&self, features: &Tensor) -> Result<Tensor> {
        self.forward_t(features, false)
    }

    /// Encodes `features` into a `[batch, hidden_units]` context vector.
    ///
    /// Dropout is applied to the outputs of every layer but the last, and
    /// only when `train` is set.
    pub fn forward_t(&self, features: &Tensor, train: bool) -> Result<Tensor> {
        let mut xs = self.to_sequence(features)?;
        let mut last_state = None;

        for (i, lstm) in self.layers.iter().enumerate() {
            let states = lstm.seq(&xs)?;
            xs = lstm.states_to_tensor(&states)?;
            if i + 1 < self.layers.len()
                && let Some(dropout) = &self.dropout
            {
                xs = dropout.forward(&xs, train)?;
            }
            last_state = states.last().cloned();
        }

        match self.summary {
            Summary::LastHidden => match last_state {
                Some(state) => Ok(state.h().clone()),
                None => Err(candle_core::Error::Msg(
                    "encoder received an empty step sequence".into(),
                )),
            },
            Summary::Mean => xs.mean(D::Minus2),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{DType, Device};
    use candle_nn::VarMap;

    fn encoder(cfg: &SarConfig) -> Result<SequenceEncoder> {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        SequenceEncoder::load(cfg, vb)
    }

    fn small_config() -> SarConfig {
        SarConfig::new(3, 3, 5, 8, 97)
            .with_feature_channels(4)
            .with_hidden_units(16)
    }

    #[test]
    fn test_column_sequence_layout() -> Result<()> {
        let cfg = small_config();
        let enc = encoder(&cfg)?;
        let features = Tensor::arange(0f32, 60., &Device::Cpu)?.reshape((1, 4, 3, 5))?;
        let seq = enc.to_sequence(&features)?;
        assert_eq!(seq.dims(), &[1, 5, 12]);

        // Step 1 is column 1: channel-major, then height.
        let col: Vec<f32> = seq.squeeze(0)?.get(1)?.to_vec1()?;
        assert_eq!(&col[..3], &[1., 6., 11.]);
        assert_eq!(col[3], 16.);
        Ok(())
    }

    #[test]
    fn test_context_shape() -> Result<()> {
        for (axis, summary) in [
            (ScanAxis::Columns, Summary::LastHidden),
            (ScanAxis::Rows, Summary::Mean),
        ] {
            let cfg = small_config().with_scan_axis(axis).with_summary(summary);
            let enc = encoder(&cfg)?;
            let features = Tensor::randn(0f32, 1., (2, 4, 3, 5), &Device::Cpu)?;
            let context = enc.forward(&features)?;
            assert_eq!(context.dims(), &[2, 16]);
        }
        Ok(())
    }

    #[test]
    fn test_dropout_only_in_training() -> Result<()> {
        let cfg = small_config().with_keep_prob(0.5);
        let enc = encoder(&cfg)?;
        let features = Tensor::randn(0f32, 1., (2, 4, 3, 5), &Device::Cpu)?;

        let a: Vec<Vec<f32>> = enc.forward(&features)?.to_vec2()?;
        let b: Vec<Vec<f32>> = enc.forward(&features)?.to_vec2()?;
        assert_eq!(a, b);

        let trained = enc.forward_t(&features, true)?;
        assert_eq!(trained.dims(), &[2, 16]);
        Ok(())
    }
}
