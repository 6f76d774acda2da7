//! End-to-end tests through the public API, using real image files.

use std::path::{Path, PathBuf};
use std::thread;

use image::{Rgba, RgbaImage};
use promptmatch::batch::ImageDiscovery;
use promptmatch::{
    BatchComparator, ComparisonResult, EngineConfig, ImageSource, PixelBuffer, SimilarityEngine,
    PASS_THRESHOLD,
};
use tempfile::TempDir;

fn scene(width: u32, height: u32, shift: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        let cx = x as i64 - (width / 2 + shift) as i64;
        let cy = y as i64 - (height / 2) as i64;
        if cx * cx + cy * cy < (width as i64 / 4).pow(2) {
            Rgba([230, 180, 40, 255])
        } else {
            Rgba([(x * 255 / width) as u8, 90, (y * 255 / height) as u8, 255])
        }
    })
}

fn write_png(dir: &Path, name: &str, image: &RgbaImage) -> PathBuf {
    let path = dir.join(name);
    image.save(&path).unwrap();
    path
}

fn assert_well_formed(result: &ComparisonResult) {
    assert!((0.0..=100.0).contains(&result.percentage));
    assert!((0.0..=1.0).contains(&result.ms_ssim));
    assert!(result.percentage.is_finite() && result.ms_ssim.is_finite());
}

#[test]
fn identical_files_score_near_100() {
    let dir = TempDir::new().unwrap();
    let image = scene(120, 90, 0);
    let a = write_png(dir.path(), "target.png", &image);
    let b = write_png(dir.path(), "generated.png", &image);

    let engine = SimilarityEngine::default();
    let result = engine.compare(&ImageSource::from(a), &ImageSource::from(b));

    assert!(result.error.is_none());
    assert!(result.percentage >= 99.0);
    assert!(result.passes(PASS_THRESHOLD));
    assert_eq!(result.per_scale_scores.len(), 5);
    // min width 120, min height 90 -> 120 square
    assert_eq!(result.per_scale_scores[0].width, 120);
}

#[test]
fn shifted_scene_scores_below_identical() {
    let dir = TempDir::new().unwrap();
    let target = write_png(dir.path(), "target.png", &scene(96, 96, 0));
    let shifted = write_png(dir.path(), "shifted.png", &scene(96, 96, 20));

    let engine = SimilarityEngine::default();
    let result = engine.compare(&ImageSource::from(target), &ImageSource::from(shifted));

    assert_well_formed(&result);
    assert!(result.error.is_none());
    assert!(result.ms_ssim < 0.99);
}

#[test]
fn missing_generated_file_compares_against_placeholder() {
    let dir = TempDir::new().unwrap();
    let target = write_png(dir.path(), "target.png", &scene(64, 64, 0));

    let engine = SimilarityEngine::default();
    let result = engine.compare(
        &ImageSource::from(target),
        &ImageSource::from(dir.path().join("missing.png")),
    );

    assert_well_formed(&result);
    assert!(result.error.is_none());
    assert!(result.detailed_scores.is_some());
}

#[test]
fn corrupt_bytes_compare_against_placeholder() {
    let engine = SimilarityEngine::default();
    let target = PixelBuffer::from_rgba(scene(48, 48, 0));
    let result = engine.compare(
        &ImageSource::from(target),
        &ImageSource::Bytes(b"\x89PNG\r\n\x1a\ntruncated".to_vec()),
    );

    assert_well_formed(&result);
    assert!(result.error.is_none());
}

#[cfg(feature = "fetch")]
#[test]
fn unreachable_url_compares_against_placeholder() {
    let engine = SimilarityEngine::default();
    let target = PixelBuffer::from_rgba(scene(64, 64, 0));
    // Nothing listens on the discard port, so the connection is refused
    let result = engine.compare(
        &ImageSource::from(target),
        &ImageSource::parse("http://127.0.0.1:9/x.png"),
    );

    assert_well_formed(&result);
    assert!(result.error.is_none());
    assert_eq!(result.per_scale_scores[0].width, 64);
}

#[test]
fn undersized_file_is_rejected() {
    let dir = TempDir::new().unwrap();
    let tiny = write_png(dir.path(), "tiny.png", &scene(15, 15, 0));
    let fine = write_png(dir.path(), "fine.png", &scene(16, 16, 0));

    let engine = SimilarityEngine::default();

    let rejected = engine.compare(&ImageSource::from(tiny), &ImageSource::from(fine.clone()));
    assert_eq!(rejected.percentage, 0.0);
    assert_eq!(rejected.ms_ssim, 0.0);
    assert!(rejected.error.as_deref().unwrap().contains("too small"));
    assert!(!rejected.passes(0.0));

    let accepted = engine.compare(&ImageSource::from(fine.clone()), &ImageSource::from(fine));
    assert!(accepted.error.is_none());
}

#[test]
fn config_file_controls_scale_count() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("engine.toml");
    std::fs::write(
        &config_path,
        "scales = 2\n\n[corrections]\nstructure_boost_factor = 1.0\n",
    )
    .unwrap();

    let config = EngineConfig::load(&config_path).unwrap();
    assert_eq!(config.scales, 2);
    assert_eq!(config.corrections.structure_boost_factor, 1.0);

    let image = PixelBuffer::from_rgba(scene(64, 64, 0));
    let result = SimilarityEngine::new(config).compare_buffers(&image, &image);
    assert_eq!(result.per_scale_scores.len(), 2);
}

#[test]
fn invalid_config_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("engine.toml");
    std::fs::write(&config_path, "min_size = 2\n").unwrap();

    assert!(EngineConfig::load(&config_path).is_err());
    assert!(EngineConfig::load(dir.path().join("absent.toml")).is_err());
}

#[test]
fn concurrent_comparisons_match_sequential() {
    let target = PixelBuffer::from_rgba(scene(80, 80, 0));
    let generated = PixelBuffer::from_rgba(scene(80, 80, 12));
    let engine = SimilarityEngine::default();

    let expected = engine.compare_buffers(&target, &generated);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let engine = engine.clone();
            let target = target.clone();
            let generated = generated.clone();
            thread::spawn(move || engine.compare_buffers(&target, &generated))
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), expected);
    }
}

#[test]
fn rank_directory_of_candidates() {
    let dir = TempDir::new().unwrap();
    let target = scene(64, 64, 0);
    let target_path = write_png(dir.path(), "target.png", &target);

    let candidates_dir = dir.path().join("attempts");
    std::fs::create_dir(&candidates_dir).unwrap();
    write_png(&candidates_dir, "a_exact.png", &target);
    write_png(
        &candidates_dir,
        "b_flat.png",
        &RgbaImage::from_pixel(64, 64, Rgba([20, 20, 20, 255])),
    );
    write_png(&candidates_dir, "c_tiny.png", &scene(10, 10, 0));

    let files = ImageDiscovery::new().discover(&candidates_dir).unwrap();
    let sources: Vec<ImageSource> = files.into_iter().map(ImageSource::Path).collect();

    let report = BatchComparator::new(SimilarityEngine::default())
        .max_parallel(2)
        .rank(&ImageSource::from(target_path), &sources)
        .unwrap();

    assert_eq!(report.entries.len(), 3);
    assert!(report.best().unwrap().source.ends_with("a_exact.png"));
    assert_eq!(report.failed(), 1);
    assert!(report.entries[2].result.error.is_some());
}

#[test]
fn json_result_has_expected_shape() {
    let image = PixelBuffer::from_rgba(scene(32, 32, 0));
    let result = SimilarityEngine::default().compare_buffers(&image, &image);
    let json = serde_json::to_value(&result).unwrap();

    for key in [
        "ms_ssim",
        "percentage",
        "detailed_scores",
        "per_scale_scores",
        "weights_used",
        "analysis",
    ] {
        assert!(json.get(key).is_some(), "missing {}", key);
    }
    assert!(json.get("error").is_none());
    assert_eq!(json["per_scale_scores"][0]["index"], 1);
    assert_eq!(json["analysis"]["structure_quality"], "high");
}
