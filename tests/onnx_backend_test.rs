mod common;

use std::fs;

use image::ImageFormat;
use leafscan::{
    Classifier, ClassifierError, InferenceBackend, LabelTable, OnnxBackend, Preprocessor,
    PreprocessConfig, RuntimeConfig,
};

use common::onnx_model::{nchw_model, nhwc_model, uint8_model, write_model};
use common::{encode, solid_image, LABELS};

fn labels() -> LabelTable {
    LabelTable::from_labels(LABELS.to_vec()).unwrap()
}

#[test]
fn test_backend_reads_declared_input_shape() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = write_model(dir.path(), "model.onnx", &nhwc_model())?;

    let backend = OnnxBackend::load(&path, &RuntimeConfig::default())?;
    assert_eq!(backend.declared_input_shape(), Some(vec![1, 128, 128, 3]));
    Ok(())
}

#[test]
fn test_backend_forward_returns_one_score_per_class() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = write_model(dir.path(), "model.onnx", &nhwc_model())?;
    let mut backend = OnnxBackend::load(&path, &RuntimeConfig::default())?;

    let preprocessor = Preprocessor::new(PreprocessConfig::default());
    let photo = encode(&solid_image(64, 48, [0, 0, 255]), ImageFormat::Png);
    let tensor = preprocessor.prepare(&photo)?;

    let scores = backend.forward(&tensor)?;
    assert_eq!(scores.len(), 3);
    assert!(scores[0].abs() < 1e-5);
    assert!(scores[1].abs() < 1e-5);
    assert!((scores[2] - 1.0).abs() < 1e-5);
    Ok(())
}

#[test]
fn test_artifact_classifier_picks_dominant_channel() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = write_model(dir.path(), "model.onnx", &nhwc_model())?;

    let classifier = Classifier::builder()
        .with_artifact(&path)?
        .with_labels(labels())
        .build()?;
    assert_eq!(
        classifier.info().artifact_path.as_deref(),
        Some(path.to_string_lossy().as_ref())
    );

    let cases = [
        ([200, 30, 30], LABELS[0]),
        ([30, 170, 20], LABELS[1]),
        ([10, 40, 220], LABELS[2]),
    ];
    for (color, expected) in cases {
        let photo = encode(&solid_image(300, 300, color), ImageFormat::Jpeg);
        let prediction = classifier.predict_bytes(&photo)?;
        assert_eq!(prediction.label, expected);
    }
    Ok(())
}

#[test]
fn test_channels_first_artifact_fails_startup() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = write_model(dir.path(), "model.onnx", &nchw_model())?;

    let result = Classifier::builder()
        .with_artifact(&path)?
        .with_labels(labels())
        .build();
    match result {
        Err(ClassifierError::ShapeMismatchError { expected, actual }) => {
            assert_eq!(expected, vec![1, 128, 128, 3]);
            assert_eq!(actual, vec![1, 3, 128, 128]);
        }
        other => panic!("expected ShapeMismatchError, got {:?}", other.map(|_| ())),
    }
    Ok(())
}

#[test]
fn test_non_float_input_is_rejected_at_load() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = write_model(dir.path(), "model.onnx", &uint8_model())?;

    match OnnxBackend::load(&path, &RuntimeConfig::default()) {
        Err(ClassifierError::InputTypeError { expected, actual }) => {
            assert_eq!(expected, "f32");
            assert_eq!(actual, "u8");
        }
        other => panic!("expected InputTypeError, got {:?}", other.map(|_| ())),
    }
    Ok(())
}

#[test]
fn test_artifact_output_width_must_match_labels() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = write_model(dir.path(), "model.onnx", &nhwc_model())?;
    let four = LabelTable::from_labels(vec!["a", "b", "c", "d"])?;

    let result = Classifier::builder().with_artifact(&path)?.with_labels(four).build();
    assert!(matches!(
        result,
        Err(ClassifierError::LabelMismatchError { labels: 4, outputs: 3 })
    ));
    Ok(())
}

#[test]
fn test_missing_or_corrupt_artifact_is_load_error() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;

    let missing = dir.path().join("absent.onnx");
    assert!(matches!(
        OnnxBackend::load(&missing, &RuntimeConfig::default()),
        Err(ClassifierError::ArtifactLoadError(_))
    ));

    let corrupt = dir.path().join("corrupt.onnx");
    fs::write(&corrupt, b"definitely not a protobuf graph")?;
    assert!(matches!(
        OnnxBackend::load(&corrupt, &RuntimeConfig::default()),
        Err(ClassifierError::ArtifactLoadError(_))
    ));
    Ok(())
}
