//! Batch fetching and source concatenation.

use super::{LabeledImageSource, LabeledSample};
use crate::core::OCRError;
use crate::core::constants::DEFAULT_PARALLEL_THRESHOLD;
use rayon::prelude::*;

/// Fetches the samples at `indices`, in that order.
///
/// Uses the default parallel threshold; see [`fetch_batch_with_threshold`].
pub fn fetch_batch<S>(source: &S, indices: &[usize]) -> Result<Vec<LabeledSample>, OCRError>
where
    S: LabeledImageSource + ?Sized,
{
    fetch_batch_with_threshold(source, indices, None)
}

/// Fetches the samples at `indices` with a custom parallel threshold.
///
/// Requests with more indices than the threshold are loaded with rayon.
/// The result always keeps the order of `indices`, and duplicates are
/// fetched again.
///
/// # Errors
///
/// Returns the first failing item wrapped in a batch-processing error that
/// names its position in the request.
pub fn fetch_batch_with_threshold<S>(
    source: &S,
    indices: &[usize],
    parallel_threshold: Option<usize>,
) -> Result<Vec<LabeledSample>, OCRError>
where
    S: LabeledImageSource + ?Sized,
{
    let threshold = parallel_threshold.unwrap_or(DEFAULT_PARALLEL_THRESHOLD);
    let total = indices.len();
    let fetch = |(position, &index): (usize, &usize)| {
        source
            .get(index)
            .map_err(|e| OCRError::batch_item_error("dataset fetch", position, total, e))
    };

    tracing::debug!("{}: fetching {} samples", source.name(), total);
    if total > threshold {
        indices.par_iter().enumerate().map(fetch).collect()
    } else {
        indices.iter().enumerate().map(fetch).collect()
    }
}

/// Several sources read back to back as one.
///
/// Index `i` addresses the first source while `i` is below its length, then
/// the second, and so on.
pub struct ConcatSource {
    sources: Vec<Box<dyn LabeledImageSource>>,
    ends: Vec<usize>,
    name: String,
}

impl ConcatSource {
    /// Chains `sources`.
    ///
    /// # Errors
    ///
    /// Returns `OCRError::ConfigError` if no source is given or the sources
    /// disagree on image shape, `seq_len` or class count.
    pub fn new(sources: Vec<Box<dyn LabeledImageSource>>) -> Result<Self, OCRError> {
        let Some(first) = sources.first() else {
            return Err(OCRError::config_error("cannot concatenate zero sources"));
        };
        let (shape, seq_len, classes) = (first.image_shape(), first.seq_len(), first.num_classes());

        for source in &sources[1..] {
            if source.image_shape() != shape {
                return Err(OCRError::validation_error(
                    source.name(),
                    "image_shape",
                    &format!("{:?}", shape),
                    &format!("{:?}", source.image_shape()),
                ));
            }
            if source.seq_len() != seq_len {
                return Err(OCRError::validation_error(
                    source.name(),
                    "seq_len",
                    &seq_len.to_string(),
                    &source.seq_len().to_string(),
                ));
            }
            if source.num_classes() != classes {
                return Err(OCRError::validation_error(
                    source.name(),
                    "num_classes",
                    &classes.to_string(),
                    &source.num_classes().to_string(),
                ));
            }
        }

        let ends = sources
            .iter()
            .scan(0, |acc, s| {
                *acc += s.len();
                Some(*acc)
            })
            .collect();
        let name = sources
            .iter()
            .map(|s| s.name())
            .collect::<Vec<_>>()
            .join("+");

        Ok(Self {
            sources,
            ends,
            name,
        })
    }

    /// Number of chained sources.
    pub fn num_sources(&self) -> usize {
        self.sources.len()
    }
}

impl LabeledImageSource for ConcatSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn len(&self) -> usize {
        self.ends.last().copied().unwrap_or(0)
    }

    fn get(&self, index: usize) -> Result<LabeledSample, OCRError> {
        let which = self.ends.partition_point(|&end| end <= index);
        let Some(source) = self.sources.get(which) else {
            return Err(OCRError::index_out_of_range(index, self.len()));
        };
        let start = if which == 0 { 0 } else { self.ends[which - 1] };
        source.get(index - start)
    }

    fn image_shape(&self) -> [usize; 3] {
        self.sources[0].image_shape()
    }

    fn seq_len(&self) -> usize {
        self.sources[0].seq_len()
    }

    fn num_classes(&self) -> usize {
        self.sources[0].num_classes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocab::{LabelCodec, build_vocabulary};
    use ndarray::Array3;
    use std::sync::Arc;

    /// In-memory source whose image value encodes the sample index.
    struct Synthetic {
        name: &'static str,
        labels: Vec<&'static str>,
        codec: LabelCodec,
        shape: [usize; 3],
    }

    impl Synthetic {
        fn new(name: &'static str, labels: Vec<&'static str>, seq_len: usize) -> Self {
            Self {
                name,
                labels,
                codec: LabelCodec::new(Arc::new(build_vocabulary()), seq_len).unwrap(),
                shape: [3, 4, 8],
            }
        }
    }

    impl LabeledImageSource for Synthetic {
        fn name(&self) -> &str {
            self.name
        }

        fn len(&self) -> usize {
            self.labels.len()
        }

        fn get(&self, index: usize) -> Result<LabeledSample, OCRError> {
            let text = self
                .labels
                .get(index)
                .ok_or_else(|| OCRError::index_out_of_range(index, self.labels.len()))?;
            let [c, h, w] = self.shape;
            Ok(LabeledSample {
                image: Array3::from_elem((c, h, w), index as f32),
                label: self.codec.encode(text)?,
                text: text.to_string(),
            })
        }

        fn image_shape(&self) -> [usize; 3] {
            self.shape
        }

        fn seq_len(&self) -> usize {
            self.codec.seq_len()
        }

        fn num_classes(&self) -> usize {
            self.codec.num_classes()
        }
    }

    #[test]
    fn test_fetch_preserves_order() {
        let source = Synthetic::new("a", vec!["zero", "one", "two", "three", "four", "five"], 8);
        let indices = [5, 0, 3, 3, 1, 4, 2];
        for threshold in [Some(0), Some(100)] {
            let batch = fetch_batch_with_threshold(&source, &indices, threshold).unwrap();
            let texts: Vec<_> = batch.iter().map(|s| s.text.as_str()).collect();
            assert_eq!(texts, vec!["five", "zero", "three", "three", "one", "four", "two"]);
            assert_eq!(batch[0].image[[0, 0, 0]], 5.0);
        }
    }

    #[test]
    fn test_fetch_reports_failing_position() {
        let source = Synthetic::new("a", vec!["ok", "bad é"], 8);
        let err = fetch_batch(&source, &[0, 1]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "batch processing failed: dataset fetch failed (item 2/2)"
        );
    }

    #[test]
    fn test_concat_indexing() {
        let concat = ConcatSource::new(vec![
            Box::new(Synthetic::new("a", vec!["a0", "a1"], 8)),
            Box::new(Synthetic::new("b", vec![], 8)),
            Box::new(Synthetic::new("c", vec!["c0", "c1", "c2"], 8)),
        ])
        .unwrap();

        assert_eq!(concat.len(), 5);
        assert_eq!(concat.name(), "a+b+c");
        let texts: Vec<_> = (0..5).map(|i| concat.get(i).unwrap().text).collect();
        assert_eq!(texts, vec!["a0", "a1", "c0", "c1", "c2"]);
        assert!(matches!(
            concat.get(5),
            Err(OCRError::IndexOutOfRange { index: 5, len: 5 })
        ));
    }

    #[test]
    fn test_concat_rejects_mismatched_sources() {
        let result = ConcatSource::new(vec![
            Box::new(Synthetic::new("a", vec!["x"], 8)),
            Box::new(Synthetic::new("b", vec!["y"], 10)),
        ]);
        assert!(matches!(result, Err(OCRError::ConfigError { .. })));
        assert!(ConcatSource::new(Vec::new()).is_err());
    }
}
