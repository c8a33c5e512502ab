//! Integration tests for the CLI commands

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

#[test]
fn test_version_command() {
    let mut cmd = cargo_bin_cmd!("shelftag");
    cmd.arg("version");

    cmd.assert()
        .success()
        .stdout(predicate::str::starts_with("shelftag "));
}

#[test]
fn test_version_flag() {
    let mut cmd = cargo_bin_cmd!("shelftag");
    cmd.arg("--version");

    cmd.assert()
        .success()
        .stdout(predicate::str::starts_with("shelftag "));
}

#[test]
fn test_structure_writes_records() {
    let dir = tempfile::tempdir().unwrap();
    let ocr_dir = dir.path().join("ocr");
    std::fs::create_dir_all(&ocr_dir).unwrap();
    std::fs::write(
        ocr_dir.join("val_ocr.json"),
        r#"[{
            "crop_id": "shelf_01_tag0",
            "source_image_id": "shelf_01.jpg",
            "variant": "orig",
            "lines": [
                {"text": "Fresh Milk", "conf": 0.92, "bbox": [[0,0],[90,0],[90,20],[0,20]], "lang": "en"},
                {"text": "Rs. 59", "conf": 0.88, "bbox": [[0,30],[60,30],[60,50],[0,50]], "lang": "en"}
            ]
        }]"#,
    )
    .unwrap();

    let mut cmd = cargo_bin_cmd!("shelftag");
    cmd.arg("--root").arg(dir.path()).args(["structure", "--split", "val"]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Saved 1 records"));

    let written = std::fs::read_to_string(dir.path().join("records/val_records.json")).unwrap();
    assert!(written.contains("Fresh Milk"));
    assert!(written.contains("\"value\": \"59\""));
}

#[test]
fn test_run_writes_every_stage() {
    let dir = tempfile::tempdir().unwrap();
    let raw = dir.path().join("raw");
    std::fs::create_dir_all(&raw).unwrap();
    image::GrayImage::from_fn(64, 48, |x, _| image::Luma([(x * 4) as u8]))
        .save(raw.join("shelf_01.png"))
        .unwrap();

    let mut cmd = cargo_bin_cmd!("shelftag");
    cmd.arg("--root").arg(dir.path()).args(["run", "--split", "val"]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Processed 1 images"));

    for artifact in [
        "detections/val_detections.json",
        "crops/metadata/val_crops.json",
        "ocr/val_ocr.json",
        "records/val_records.json",
    ] {
        assert!(dir.path().join(artifact).exists(), "{artifact} missing");
    }
}

#[test]
fn test_crop_without_detections_fails() {
    let dir = tempfile::tempdir().unwrap();

    let mut cmd = cargo_bin_cmd!("shelftag");
    cmd.arg("--root").arg(dir.path()).args(["crop", "--split", "val"]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("val_detections.json"));
}

#[test]
fn test_invalid_config_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("shelftag.toml");
    std::fs::write(&config, "[detection]\nscales = []\n").unwrap();

    let mut cmd = cargo_bin_cmd!("shelftag");
    cmd.arg("--config").arg(&config).arg("version");

    cmd.assert().failure();
}
