//! End-to-end run from image files on disk through the model.

use image::{Rgb, RgbImage};
use sar_ocr::prelude::*;
use sar_ocr::dataset::{AnnotationRecord, CropRegion, WidthPolicy};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

const HEIGHT: u32 = 16;
const WIDTH: u32 = 32;
const SEQ_LEN: usize = 8;

fn init_logging() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn write_word(dir: &Path, name: &str, width: u32, height: u32, shade: u8) {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([shade, (x * 7 % 255) as u8, (y * 11 % 255) as u8])
    })
    .save(dir.join(name))
    .unwrap();
}

fn codec(vocabulary: &Arc<Vocabulary>) -> LabelCodec {
    LabelCodec::new(vocabulary.clone(), SEQ_LEN).unwrap()
}

fn model(vocabulary: &Arc<Vocabulary>) -> Sar {
    let (fh, fw) = ConvBackbone::feature_size(HEIGHT as usize, WIDTH as usize);
    let config = SarConfig::new(3, fh, fw, 16, vocabulary.len())
        .with_feature_channels(16)
        .with_hidden_units(24)
        .with_seq_len(SEQ_LEN);
    let (model, _varmap) = Sar::init(config, vocabulary.clone()).unwrap();
    model
}

#[test]
fn test_mixed_sources_through_model() -> Result<(), OCRError> {
    init_logging();
    let vocabulary = Arc::new(build_vocabulary());

    let syn_dir = TempDir::new().unwrap();
    write_word(syn_dir.path(), "1_hello_1.png", 50, 20, 10);
    write_word(syn_dir.path(), "2_World_2.png", 40, 18, 200);

    let svt_dir = TempDir::new().unwrap();
    write_word(svt_dir.path(), "street.png", 120, 60, 90);
    let svt_records = vec![
        AnnotationRecord::new("img/street.png", "PUFF").with_region(CropRegion::Rect {
            x: 10,
            y: 10,
            width: 60,
            height: 25,
        }),
        AnnotationRecord::new("img/gone.png", "LOST").with_region(CropRegion::Rect {
            x: 0,
            y: 0,
            width: 5,
            height: 5,
        }),
    ];

    let transform = ImageTransform::new(HEIGHT, WIDTH);
    let syn90k = AnnotatedSource::syn90k(syn_dir.path(), transform.clone(), codec(&vocabulary))?;
    let svt = AnnotatedSource::from_records(
        DatasetFormat::Svt,
        svt_dir.path(),
        svt_records,
        transform.with_width_policy(WidthPolicy::KeepAspect {
            min_width: 8,
            max_width: WIDTH,
            seed: 42,
        }),
        codec(&vocabulary),
    )?;
    assert_eq!(svt.len(), 1);

    let source = ConcatSource::new(vec![Box::new(syn90k), Box::new(svt)])?;
    assert_eq!(source.len(), 3);

    let sar = model(&vocabulary);
    let batch = SampleBatch::fetch(&source, &[2, 0, 1], sar.device())?;
    assert_eq!(batch.texts, vec!["PUFF", "hello", "World"]);
    assert_eq!(batch.images.dims(), &[3, 3, HEIGHT as usize, WIDTH as usize]);
    assert_eq!(batch.labels.dims(), &[3, SEQ_LEN]);

    let trained = sar.forward_t(&batch.images, DecodingMode::TeacherForced(&batch.labels), true)?;
    assert_eq!(trained.class_distributions.dims(), &[3, SEQ_LEN, vocabulary.len()]);
    assert_eq!(trained.attention_maps.dims(), &[3, SEQ_LEN, 1, 4, 4]);

    let targets = one_hot_labels(&batch.labels, vocabulary.len())?;
    assert_eq!(targets.dims(), trained.logits.dims());

    let recognized = sar.recognize(&batch.images)?;
    assert_eq!(recognized.len(), 3);
    Ok(())
}

#[test]
fn test_encode_decode_contract() {
    let vocabulary = Arc::new(build_vocabulary());
    let codec = LabelCodec::new(vocabulary.clone(), 5).unwrap();

    let encoded = codec.encode("CAT").unwrap();
    let end = vocabulary.end_index();
    assert_eq!(encoded.as_slice()[3], end);
    assert_eq!(encoded.as_slice()[4], end);
    assert_eq!(strip_trailing(encoded.as_slice(), &vocabulary), "CAT");

    let truncated = codec.encode("OVERFLOWING").unwrap();
    assert_eq!(truncated.as_slice()[4], end);
    assert_eq!(vocabulary.strip_trailing(truncated.as_slice()), "OVER");
}

#[test]
fn test_unlabeled_folder_recognition() -> Result<(), OCRError> {
    let vocabulary = Arc::new(build_vocabulary());
    let dir = TempDir::new().unwrap();
    write_word(dir.path(), "a.png", 30, 12, 0);
    write_word(dir.path(), "b.png", 64, 16, 255);

    let folder = ImageFolder::new(dir.path(), ImageTransform::new(HEIGHT, WIDTH))?;
    let items = folder.get_batch(&[0, 1])?;
    let arrays: Vec<f32> = items.iter().flat_map(|(a, _)| a.iter().copied()).collect();
    let images = candle_core::Tensor::from_vec(
        arrays,
        (2, 3, HEIGHT as usize, WIDTH as usize),
        &candle_core::Device::Cpu,
    )
    .unwrap();

    let results = model(&vocabulary).recognize(&images)?;
    assert_eq!(results.len(), 2);
    Ok(())
}
