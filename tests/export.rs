use deriche_gramag::{
    ExportConfig, ExportError, GradientError, GradientOptions, Orientation,
    deriche_gradient_magnitude, export_deriche_gramag, load_volume, save_volume,
    volume::IDENTITY_AFFINE,
};
use ndarray::Array3;
use std::fs;
use tempfile::tempdir;

fn blob() -> Array3<f32> {
    Array3::from_shape_fn((8, 7, 6), |(x, y, z)| {
        let d2 = (x as f32 - 3.5).powi(2) + (y as f32 - 3.0).powi(2) + (z as f32 - 2.5).powi(2);
        if d2 < 5.0 { 200.0 } else { 20.0 }
    })
}

#[test]
fn exports_one_file_per_alpha() {
    let _ = env_logger::builder().is_test(true).try_init();
    let dir = tempdir().expect("temp dir");
    let input = dir.path().join("sub-01_T1w.nii.gz");
    let mut affine = IDENTITY_AFFINE;
    affine[0][0] = 0.7;
    save_volume(&blob(), &affine, &input).expect("input should save");

    let mut config = ExportConfig::new(&input);
    config.alphas = vec![1.0, 2.5];
    config.preview = Some(Orientation::Axial);
    let written = export_deriche_gramag(&config).expect("export should succeed");

    assert_eq!(
        written,
        vec![
            dir.path().join("sub-01_T1w_GraMagDeriche_alpha1pt0.nii.gz"),
            dir.path().join("sub-01_T1w_GraMagDeriche_alpha2pt5.nii.gz"),
        ]
    );
    assert!(dir.path().join("sub-01_T1w_GraMagDeriche_alpha1pt0.png").is_file());

    let expected = deriche_gradient_magnitude(&blob(), 2.5, GradientOptions::default())
        .expect("magnitude should compute")
        .into_magnitude()
        .expect("magnitude requested");
    let exported = load_volume(&written[1]).expect("output should load");
    assert_eq!(exported.data, expected);
    assert!((exported.affine[0][0] - 0.7).abs() < 1e-6);
}

#[test]
fn exports_into_output_dir_from_json_config() {
    let _ = env_logger::builder().is_test(true).try_init();
    let dir = tempdir().expect("temp dir");
    let input = dir.path().join("scan.nii");
    save_volume(&blob(), &IDENTITY_AFFINE, &input).expect("input should save");

    let out = dir.path().join("derivatives");
    let config_path = dir.path().join("export.json");
    let json = serde_json::json!({
        "input": input,
        "alphas": [3.0],
        "normalize": true,
        "output_dir": out,
    });
    fs::write(&config_path, json.to_string()).expect("config should write");

    let config = ExportConfig::from_json_file(&config_path).expect("config should parse");
    let written = export_deriche_gramag(&config).expect("export should succeed");
    assert_eq!(written, vec![out.join("scan_GraMagDeriche_alpha3pt0.nii.gz")]);

    let exported = load_volume(&written[0]).expect("output should load");
    let (min, max) = exported
        .data
        .iter()
        .fold((f32::MAX, f32::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    // Scale-only normalization: the range matches the source, the minimum is not shifted.
    assert!((max - min - 180.0).abs() < 1e-2);
    assert!(min >= 0.0);
}

#[test]
fn zero_input_with_normalization_fails_the_batch() {
    let dir = tempdir().expect("temp dir");
    let input = dir.path().join("zero.nii.gz");
    save_volume(&Array3::zeros((5, 5, 5)), &IDENTITY_AFFINE, &input).expect("input should save");

    let mut config = ExportConfig::new(&input);
    config.normalize = true;

    let err = export_deriche_gramag(&config).unwrap_err();
    assert!(matches!(
        err,
        ExportError::Gradient {
            source: GradientError::DegenerateRange { .. },
            ..
        }
    ));
    assert!(!dir.path().join("zero_GraMagDeriche_alpha2pt0.nii.gz").exists());
}

#[test]
fn missing_input_is_an_io_error() {
    let dir = tempdir().expect("temp dir");
    let config = ExportConfig::new(dir.path().join("absent.nii.gz"));
    assert!(matches!(
        export_deriche_gramag(&config),
        Err(ExportError::Io(_))
    ));
}
