//! Attention decoder: a fixed-length recurrent loop over the feature volume.
//!
//! Every step attends over the feature volume with the current top-layer
//! hidden state, feeds the glimpse together with the embedding of the step's
//! input symbol through the stacked LSTM, and classifies the new hidden
//! state. The loop always runs `seq_len` steps; stopping at END is left to
//! [`strip_trailing`](crate::vocab::strip_trailing).

use super::attention::{AttentionMemory, SpatialAttention};
use super::config::SarConfig;
use candle_core::{D, DType, Result, Tensor};
use candle_nn::rnn::{LSTM, LSTMConfig, LSTMState, RNN};
use candle_nn::{Embedding, Linear, Module, VarBuilder};

/// How the input symbol of every step is chosen.
#[derive(Debug, Clone, Copy)]
pub enum DecodingMode<'a> {
    /// Step `t > 0` reads ground-truth symbol `t - 1` from a
    /// `[batch, seq_len]` u32 label tensor.
    TeacherForced(&'a Tensor),
    /// Step `t > 0` reads the greedy argmax of step `t - 1`.
    Autoregressive,
}

impl DecodingMode<'_> {
    /// Short label used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            DecodingMode::TeacherForced(_) => "teacher-forced",
            DecodingMode::Autoregressive => "autoregressive",
        }
    }
}

/// Recurrent state of every decoder layer, bottom first.
#[derive(Debug, Clone)]
pub struct DecoderState {
    pub layers: Vec<LSTMState>,
}

impl DecoderState {
    /// Hidden state of the top layer.
    pub fn top_hidden(&self) -> Result<&Tensor> {
        self.layers
            .last()
            .map(|state| state.h())
            .ok_or_else(|| candle_core::Error::Msg("decoder state has no layers".into()))
    }
}

/// Result of one decoding step.
#[derive(Debug, Clone)]
pub struct DecoderStep {
    /// Class scores, `[batch, output_classes]`.
    pub logits: Tensor,
    /// Attention weights, `[batch, 1, feature_height, feature_width]`.
    pub attention: Tensor,
}

/// Stacked decoder outputs.
#[derive(Debug, Clone)]
pub struct DecoderOutput {
    /// `[batch, seq_len, output_classes]`.
    pub logits: Tensor,
    /// `[batch, seq_len, 1, feature_height, feature_width]`.
    pub attention_maps: Tensor,
}

/// Stacked LSTM decoder that attends over the feature volume at every step.
#[derive(Debug, Clone)]
pub struct AttentionDecoder {
    embedding: Embedding,
    layers: Vec<LSTM>,
    attention: SpatialAttention,
    classifier: Linear,
    start_token: u32,
    seq_len: usize,
    hidden_units: usize,
}

impl AttentionDecoder {
    /// Creates the embedding, LSTM stack, attention and classifier under `vb`.
    pub fn load(cfg: &SarConfig, vb: VarBuilder) -> Result<Self> {
        // One extra row for the start token, which never appears in labels.
        let embedding = candle_nn::embedding(
            cfg.output_classes + 1,
            cfg.embedding_dim,
            vb.pp("embedding"),
        )?;

        let mut layers = Vec::with_capacity(cfg.layers);
        let mut in_dim = cfg.embedding_dim + cfg.feature_channels;
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

        let attention = SpatialAttention::load(
            cfg.feature_channels,
            cfg.hidden_units,
            cfg.hidden_units,
            vb.pp("attention"),
        )?;
        let classifier =
            candle_nn::linear(cfg.hidden_units, cfg.output_classes, vb.pp("classifier"))?;

        Ok(Self {
            embedding,
            layers,
            attention,
            classifier,
            start_token: cfg.output_classes as u32,
            seq_len: cfg.seq_len,
            hidden_units: cfg.hidden_units,
        })
    }

    /// Number of decoding steps.
    pub fn seq_len(&self) -> usize {
        self.seq_len
    }

    /// Embedding row used as the input symbol of the first step.
    pub fn start_token(&self) -> u32 {
        self.start_token
    }

    /// Projects the feature volume for [`step`](Self::step).
    pub fn prepare(&self, features: &Tensor) -> Result<AttentionMemory> {
        self.attention.prepare(features)
    }

    /// Starting state: every layer's hidden state is the context vector
    /// (`[batch, hidden_units]`), every cell state is zero.
    pub fn initial_state(&self, context: &Tensor) -> Result<DecoderState> {
        let (_, hidden) = context.dims2()?;
        if hidden != self.hidden_units {
            candle_core::bail!(
                "context vector has {} units, decoder expects {}",
                hidden,
                self.hidden_units
            );
        }
        let cell = context.zeros_like()?;
        let layers = self
            .layers
            .iter()
            .map(|_| LSTMState::new(context.clone(), cell.clone()))
            .collect();
        Ok(DecoderState { layers })
    }

    /// Start-token input for a batch of `batch` sequences.
    pub fn start_symbols(&self, batch: usize, memory: &AttentionMemory) -> Result<Tensor> {
        Tensor::full(self.start_token, batch, memory.device())
    }

    /// Runs one decoding step.
    ///
    /// `symbols` holds the `[batch]` u32 input symbol of every sequence.
    pub fn step(
        &self,
        memory: &AttentionMemory,
        state: &DecoderState,
        symbols: &Tensor,
    ) -> Result<(DecoderState, DecoderStep)> {
        let (glimpse, weights) = self.attention.forward(memory, state.top_hidden()?)?;
        let embedded = self.embedding.forward(symbols)?;
        let mut xs = Tensor::cat(&[&embedded, &glimpse], D::Minus1)?;

        let mut layers = Vec::with_capacity(self.layers.len());
        for (lstm, layer_state) in self.layers.iter().zip(&state.layers) {
            let next = lstm.step(&xs, layer_state)?;
            xs = next.h().clone();
            layers.push(next);
        }

        let logits = self.classifier.forward(&xs)?;
        let (height, width) = memory.spatial_size();
        let attention = weights.reshape((weights.dim(0)?, 1, height, width))?;

        Ok((DecoderState { layers }, DecoderStep { logits, attention }))
    }

    /// Decodes `seq_len` steps.
    ///
    /// `features` is `[batch, channels, height, width]` and `context` is
    /// `[batch, hidden_units]`. Shapes are not validated beyond what the
    /// tensor operations enforce.
    pub fn forward(
        &self,
        features: &Tensor,
        context: &Tensor,
        mode: DecodingMode<'_>,
    ) -> Result<DecoderOutput> {
        let memory = self.prepare(features)?;
        let batch = memory.batch_size()?;
        let mut state = self.initial_state(context)?;
        let mut symbols = self.start_symbols(batch, &memory)?;

        let mut logits = Vec::with_capacity(self.seq_len);
        let mut attention_maps = Vec::with_capacity(self.seq_len);

        for t in 0..self.seq_len {
            let (next_state, out) = self.step(&memory, &state, &symbols)?;
            state = next_state;

            if t + 1 < self.seq_len {
                symbols = match mode {
                    DecodingMode::TeacherForced(labels) => {
                        labels.narrow(1, t, 1)?.squeeze(1)?.to_dtype(DType::U32)?
                    }
                    DecodingMode::Autoregressive => out.logits.argmax(D::Minus1)?,
                };
            }

            logits.push(out.logits);
            attention_maps.push(out.attention);
        }

        Ok(DecoderOutput {
            logits: Tensor::stack(&logits, 1)?,
            attention_maps: Tensor::stack(&attention_maps, 1)?,
        })
    }
}
