//! Fixed-length label encoding.

use super::Vocabulary;
use crate::core::OCRError;
use ndarray::Array2;
use std::sync::Arc;

/// Where END tokens are written in an encoded label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EndPlacement {
    /// END immediately after the last kept character and again in the final
    /// slot, PAD in between.
    #[default]
    AfterLabel,
    /// END only in the final slot; the tail after the label is all PAD.
    LastSlotOnly,
}

/// What to do with characters missing from the vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownPolicy {
    /// Fail with [`OCRError::UnknownSymbol`].
    #[default]
    Reject,
    /// Encode the character as UNK.
    MapToUnk,
}

/// A label encoded to exactly `seq_len` vocabulary indices.
///
/// The final slot always holds END.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSequence(Vec<u32>);

impl LabelSequence {
    /// The encoded indices.
    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }

    /// Number of slots (the codec's `seq_len`).
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the sequence has no slots.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consumes the sequence, returning the indices.
    pub fn into_inner(self) -> Vec<u32> {
        self.0
    }

    /// Materializes the one-hot form, shape `(seq_len, num_classes)`.
    ///
    /// Row `i` is row `indices[i]` of the identity matrix, so every row holds
    /// exactly one `1.0`.
    pub fn to_one_hot(&self, num_classes: usize) -> Result<Array2<f32>, OCRError> {
        let mut one_hot = Array2::<f32>::zeros((self.0.len(), num_classes));
        for (row, &index) in self.0.iter().enumerate() {
            let col = index as usize;
            if col >= num_classes {
                return Err(OCRError::invalid_input(format!(
                    "label index {} does not fit {} classes",
                    index, num_classes
                )));
            }
            one_hot[[row, col]] = 1.0;
        }
        Ok(one_hot)
    }
}

/// Encodes label strings into fixed-length index sequences.
///
/// Labels longer than `seq_len - 1` characters are truncated silently and the
/// final slot is overwritten with END.
#[derive(Debug, Clone)]
pub struct LabelCodec {
    vocabulary: Arc<Vocabulary>,
    seq_len: usize,
    end_placement: EndPlacement,
    unknown_policy: UnknownPolicy,
}

impl LabelCodec {
    /// Creates a codec producing sequences of `seq_len` indices.
    ///
    /// # Errors
    ///
    /// Returns `OCRError::ConfigError` if `seq_len < 2`.
    pub fn new(vocabulary: Arc<Vocabulary>, seq_len: usize) -> Result<Self, OCRError> {
        if seq_len < 2 {
            return Err(OCRError::config_error(format!(
                "seq_len must be at least 2, got {}",
                seq_len
            )));
        }
        Ok(Self {
            vocabulary,
            seq_len,
            end_placement: EndPlacement::default(),
            unknown_policy: UnknownPolicy::default(),
        })
    }

    /// Sets where END tokens are written.
    pub fn with_end_placement(mut self, end_placement: EndPlacement) -> Self {
        self.end_placement = end_placement;
        self
    }

    /// Sets how out-of-vocabulary characters are handled.
    pub fn with_unknown_policy(mut self, unknown_policy: UnknownPolicy) -> Self {
        self.unknown_policy = unknown_policy;
        self
    }

    /// The vocabulary used for encoding.
    pub fn vocabulary(&self) -> &Arc<Vocabulary> {
        &self.vocabulary
    }

    /// Length of every encoded sequence.
    pub fn seq_len(&self) -> usize {
        self.seq_len
    }

    /// Number of classes in the one-hot form.
    pub fn num_classes(&self) -> usize {
        self.vocabulary.len()
    }

    /// Encodes `label`.
    ///
    /// # Errors
    ///
    /// Returns `OCRError::UnknownSymbol` for a character outside the
    /// vocabulary under [`UnknownPolicy::Reject`]. Every character is checked,
    /// including ones past the truncation point.
    pub fn encode(&self, label: &str) -> Result<LabelSequence, OCRError> {
        let vocab = &self.vocabulary;
        let end = vocab.end_index();
        let mut indices = vec![vocab.pad_index(); self.seq_len];
        let mut kept = 0;

        for (i, c) in label.chars().enumerate() {
            let index = match (vocab.index_of_char(c), self.unknown_policy) {
                (Some(index), _) => index,
                (None, UnknownPolicy::MapToUnk) => vocab.unk_index(),
                (None, UnknownPolicy::Reject) => {
                    return Err(OCRError::UnknownSymbol {
                        symbol: c,
                        label: label.to_string(),
                    });
                }
            };
            if i < self.seq_len {
                indices[i] = index;
                kept = i + 1;
            }
        }

        if self.end_placement == EndPlacement::AfterLabel && kept < self.seq_len {
            indices[kept] = end;
        }
        indices[self.seq_len - 1] = end;

        Ok(LabelSequence(indices))
    }

    /// Encodes `label` straight to its one-hot form.
    pub fn encode_one_hot(&self, label: &str) -> Result<Array2<f32>, OCRError> {
        self.encode(label)?.to_one_hot(self.num_classes())
    }

    /// Renders indices back to text; see [`Vocabulary::strip_trailing`].
    pub fn decode(&self, indices: &[u32]) -> String {
        self.vocabulary.strip_trailing(indices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocab::build_vocabulary;

    fn codec(seq_len: usize) -> LabelCodec {
        LabelCodec::new(Arc::new(build_vocabulary()), seq_len).unwrap()
    }

    #[test]
    fn test_encode_short_label() {
        let codec = codec(5);
        let vocab = codec.vocabulary().clone();
        let encoded = codec.encode("CAT").unwrap();
        let expected = [
            vocab.index_of_char('C').unwrap(),
            vocab.index_of_char('A').unwrap(),
            vocab.index_of_char('T').unwrap(),
            vocab.end_index(),
            vocab.end_index(),
        ];
        assert_eq!(encoded.as_slice(), &expected);
        assert_eq!(codec.decode(encoded.as_slice()), "CAT");
    }

    #[test]
    fn test_encode_last_slot_only() {
        let codec = codec(6).with_end_placement(EndPlacement::LastSlotOnly);
        let vocab = codec.vocabulary().clone();
        let encoded = codec.encode("ab").unwrap();
        assert_eq!(encoded.as_slice()[2], vocab.pad_index());
        assert_eq!(encoded.as_slice()[4], vocab.pad_index());
        assert_eq!(encoded.as_slice()[5], vocab.end_index());
        assert_eq!(codec.decode(encoded.as_slice()), "ab");
    }

    #[test]
    fn test_padding_between_ends() {
        let codec = codec(8);
        let vocab = codec.vocabulary().clone();
        let encoded = codec.encode("hi").unwrap();
        let slots = encoded.as_slice();
        assert_eq!(slots[2], vocab.end_index());
        assert!(slots[3..7].iter().all(|&i| i == vocab.pad_index()));
        assert_eq!(slots[7], vocab.end_index());
    }

    #[test]
    fn test_long_label_is_truncated() {
        let codec = codec(5);
        let vocab = codec.vocabulary().clone();
        let encoded = codec.encode("abcdefgh").unwrap();
        assert_eq!(encoded.len(), 5);
        assert_eq!(*encoded.as_slice().last().unwrap(), vocab.end_index());
        assert_eq!(codec.decode(encoded.as_slice()), "abcd");

        let exact = codec.encode("abcde").unwrap();
        assert_eq!(*exact.as_slice().last().unwrap(), vocab.end_index());
    }

    #[test]
    fn test_round_trip_short_labels() {
        let codec = codec(40);
        for label in ["", "a", "Hello", "x-ray_42!", "{[(<~>)]}", "ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789ab"]
        {
            let encoded = codec.encode(label).unwrap();
            assert_eq!(codec.decode(encoded.as_slice()), label);
        }
    }

    #[test]
    fn test_unknown_symbol_rejected() {
        let codec = codec(10);
        let err = codec.encode("naïve").unwrap_err();
        match err {
            OCRError::UnknownSymbol { symbol, label } => {
                assert_eq!(symbol, 'ï');
                assert_eq!(label, "naïve");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        // Characters past the truncation point are still checked.
        assert!(codec.encode("abcdefghijkl m").is_err());
    }

    #[test]
    fn test_unknown_symbol_mapped_to_unk() {
        let codec = codec(10).with_unknown_policy(UnknownPolicy::MapToUnk);
        let vocab = codec.vocabulary().clone();
        let encoded = codec.encode("a b").unwrap();
        assert_eq!(encoded.as_slice()[1], vocab.unk_index());
        assert_eq!(codec.decode(encoded.as_slice()), "ab");
    }

    #[test]
    fn test_one_hot_rows() {
        let codec = codec(6);
        let one_hot = codec.encode_one_hot("ok").unwrap();
        assert_eq!(one_hot.dim(), (6, 97));
        for row in one_hot.rows() {
            assert_eq!(row.sum(), 1.0);
            assert_eq!(row.iter().filter(|&&v| v == 1.0).count(), 1);
        }
        let k = codec.vocabulary().index_of_char('k').unwrap() as usize;
        assert_eq!(one_hot[[1, k]], 1.0);
    }

    #[test]
    fn test_one_hot_rejects_small_class_count() {
        let codec = codec(4);
        let encoded = codec.encode("a").unwrap();
        assert!(encoded.to_one_hot(10).is_err());
    }

    #[test]
    fn test_seq_len_too_small() {
        assert!(LabelCodec::new(Arc::new(build_vocabulary()), 1).is_err());
    }
}
