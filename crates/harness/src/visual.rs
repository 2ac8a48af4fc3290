//! Screenshot comparison against stored baselines

use std::path::{Path, PathBuf};

use image::{GenericImageView, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::error::{HarnessError, HarnessResult};

/// Per-channel difference tolerated before a pixel counts as changed
const CHANNEL_TOLERANCE: i16 = 5;

/// Outcome of checking one screenshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum VisualVerdict {
    /// Byte-identical to the baseline
    Identical,

    /// Some pixels differ but no more than the threshold allows
    WithinThreshold { diff_percent: f64 },

    /// Too many pixels differ, or the dimensions changed
    Regressed {
        diff_percent: f64,
        diff_image: Option<PathBuf>,
    },

    /// Nothing stored yet; the screenshot was not judged
    NoBaseline,

    /// Screenshot stored as the new baseline
    BaselineCreated,
}

impl VisualVerdict {
    pub fn is_regression(&self) -> bool {
        matches!(self, VisualVerdict::Regressed { .. })
    }
}

/// Baseline storage plus pixel comparison
pub struct BaselineStore {
    baseline_dir: PathBuf,
    diff_dir: PathBuf,
    /// Store missing baselines instead of reporting them
    update: bool,
}

impl BaselineStore {
    pub fn new(config: VisualConfig) -> HarnessResult<Self> {
        std::fs::create_dir_all(&config.baseline_dir)?;
        std::fs::create_dir_all(&config.diff_dir)?;

        Ok(Self {
            baseline_dir: config.baseline_dir,
            diff_dir: config.diff_dir,
            update: config.update_baselines,
        })
    }

    pub fn baseline_path(&self, name: &str) -> PathBuf {
        self.baseline_dir.join(format!("{}.png", name))
    }

    /// Compare `actual` with the baseline stored under `name`
    pub fn check(&self, name: &str, actual: &Path, threshold: f64) -> HarnessResult<VisualVerdict> {
        if !actual.exists() {
            return Err(HarnessError::ScreenshotNotFound(actual.to_path_buf()));
        }

        let baseline = self.baseline_path(name);
        if !baseline.exists() {
            if self.update {
                std::fs::copy(actual, &baseline)?;
                info!("Created baseline for '{}'", name);
                return Ok(VisualVerdict::BaselineCreated);
            }
            info!("No baseline for '{}'; rerun with --update-baselines to record one", name);
            return Ok(VisualVerdict::NoBaseline);
        }

        if sha256_file(actual)? == sha256_file(&baseline)? {
            debug!("'{}' matches its baseline byte for byte", name);
            return Ok(VisualVerdict::Identical);
        }

        let actual_img = image::open(actual)?;
        let baseline_img = image::open(&baseline)?;

        if actual_img.dimensions() != baseline_img.dimensions() {
            warn!(
                "'{}' changed size: {:?} vs baseline {:?}",
                name,
                actual_img.dimensions(),
                baseline_img.dimensions()
            );
            return Ok(VisualVerdict::Regressed {
                diff_percent: 100.0,
                diff_image: None,
            });
        }

        let diff = diff_images(&actual_img.to_rgba8(), &baseline_img.to_rgba8());
        let diff_percent = diff.percent();

        if diff_percent <= threshold {
            return Ok(VisualVerdict::WithinThreshold { diff_percent });
        }

        let diff_path = self.diff_dir.join(format!("{}-diff.png", name));
        diff.image.save(&diff_path)?;
        warn!(
            "Visual regression in '{}': {:.2}% pixels differ (threshold: {:.2}%)",
            name, diff_percent, threshold
        );

        Ok(VisualVerdict::Regressed {
            diff_percent,
            diff_image: Some(diff_path),
        })
    }

    /// Replace the stored baseline with `actual`
    pub fn promote(&self, name: &str, actual: &Path) -> HarnessResult<()> {
        if !actual.exists() {
            return Err(HarnessError::ScreenshotNotFound(actual.to_path_buf()));
        }
        std::fs::copy(actual, self.baseline_path(name))?;
        info!("Updated baseline for '{}'", name);
        Ok(())
    }
}

/// Pixel difference between two equally sized images
pub struct ImageDiff {
    pub changed: u64,
    pub total: u64,
    /// Changed pixels in red over a dimmed copy of the actual image
    pub image: RgbaImage,
}

impl ImageDiff {
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (self.changed as f64 / self.total as f64) * 100.0
    }
}

pub fn diff_images(actual: &RgbaImage, baseline: &RgbaImage) -> ImageDiff {
    let (width, height) = actual.dimensions();
    let mut image = RgbaImage::new(width, height);
    let mut changed = 0u64;

    for (x, y, pixel) in actual.enumerate_pixels() {
        let base = (x < baseline.width() && y < baseline.height()).then(|| baseline.get_pixel(x, y));
        let marked = match base {
            Some(base) if !pixels_differ(pixel, base) => {
                let [r, g, b, _] = pixel.0;
                Rgba([r / 2, g / 2, b / 2, 128])
            }
            _ => {
                changed += 1;
                Rgba([255, 0, 0, 255])
            }
        };
        image.put_pixel(x, y, marked);
    }

    ImageDiff {
        changed,
        total: u64::from(width) * u64::from(height),
        image,
    }
}

fn pixels_differ(a: &Rgba<u8>, b: &Rgba<u8>) -> bool {
    a.0.iter()
        .zip(b.0.iter())
        .any(|(x, y)| (i16::from(*x) - i16::from(*y)).abs() > CHANNEL_TOLERANCE)
}

fn sha256_file(path: &Path) -> HarnessResult<String> {
    let data = std::fs::read(path)?;
    Ok(hex::encode(Sha256::digest(&data)))
}

/// Configuration for baseline comparison
#[derive(Debug, Clone)]
pub struct VisualConfig {
    pub baseline_dir: PathBuf,
    pub diff_dir: PathBuf,
    pub update_baselines: bool,
}

impl Default for VisualConfig {
    fn default() -> Self {
        Self {
            baseline_dir: PathBuf::from("test-results/baselines"),
            diff_dir: PathBuf::from("test-results/diffs"),
            update_baselines: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(width: u32, height: u32, color: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(width, height, Rgba(color))
    }

    fn store(dir: &Path, update: bool) -> BaselineStore {
        BaselineStore::new(VisualConfig {
            baseline_dir: dir.join("baselines"),
            diff_dir: dir.join("diffs"),
            update_baselines: update,
        })
        .unwrap()
    }

    #[test]
    fn test_small_color_drift_is_tolerated() {
        let a = solid(4, 4, [100, 100, 100, 255]);
        let b = solid(4, 4, [104, 97, 100, 255]);
        let diff = diff_images(&a, &b);
        assert_eq!(diff.changed, 0);
        assert_eq!(diff.percent(), 0.0);
    }

    #[test]
    fn test_changed_pixels_counted() {
        let a = solid(10, 10, [0, 0, 0, 255]);
        let mut b = a.clone();
        for x in 0..10 {
            b.put_pixel(x, 0, Rgba([255, 255, 255, 255]));
        }
        let diff = diff_images(&a, &b);
        assert_eq!(diff.changed, 10);
        assert!((diff.percent() - 10.0).abs() < f64::EPSILON);
        assert_eq!(diff.image.get_pixel(3, 0), &Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn test_missing_baseline_reported_or_created() {
        let dir = tempfile::tempdir().unwrap();
        let shot = dir.path().join("home-error.png");
        solid(8, 8, [10, 20, 30, 255]).save(&shot).unwrap();

        let verdict = store(dir.path(), false).check("home-error", &shot, 0.5).unwrap();
        assert_eq!(verdict, VisualVerdict::NoBaseline);

        let updating = store(dir.path(), true);
        assert_eq!(
            updating.check("home-error", &shot, 0.5).unwrap(),
            VisualVerdict::BaselineCreated
        );
        assert!(updating.baseline_path("home-error").exists());
        assert_eq!(
            updating.check("home-error", &shot, 0.5).unwrap(),
            VisualVerdict::Identical
        );
    }

    #[test]
    fn test_regression_writes_diff_image() {
        let dir = tempfile::tempdir().unwrap();
        let visual = store(dir.path(), false);

        solid(10, 10, [0, 0, 0, 255])
            .save(visual.baseline_path("orders"))
            .unwrap();
        let shot = dir.path().join("orders.png");
        solid(10, 10, [200, 0, 0, 255]).save(&shot).unwrap();

        match visual.check("orders", &shot, 0.5).unwrap() {
            VisualVerdict::Regressed {
                diff_percent,
                diff_image,
            } => {
                assert!((diff_percent - 100.0).abs() < f64::EPSILON);
                assert!(diff_image.unwrap().exists());
            }
            other => panic!("expected regression, got {:?}", other),
        }
    }

    #[test]
    fn test_resized_screenshot_is_a_regression() {
        let dir = tempfile::tempdir().unwrap();
        let visual = store(dir.path(), false);

        solid(10, 10, [0, 0, 0, 255])
            .save(visual.baseline_path("home"))
            .unwrap();
        let shot = dir.path().join("home.png");
        solid(12, 10, [0, 0, 0, 255]).save(&shot).unwrap();

        assert!(visual.check("home", &shot, 50.0).unwrap().is_regression());
    }

    #[test]
    fn test_diff_below_threshold_passes() {
        let dir = tempfile::tempdir().unwrap();
        let visual = store(dir.path(), false);

        solid(10, 10, [0, 0, 0, 255])
            .save(visual.baseline_path("cart"))
            .unwrap();
        let mut shot_img = solid(10, 10, [0, 0, 0, 255]);
        shot_img.put_pixel(9, 9, Rgba([255, 255, 255, 255]));
        let shot = dir.path().join("cart.png");
        shot_img.save(&shot).unwrap();

        // 1 of 100 pixels changed
        match visual.check("cart", &shot, 1.5).unwrap() {
            VisualVerdict::WithinThreshold { diff_percent } => {
                assert!((diff_percent - 1.0).abs() < 1e-9)
            }
            other => panic!("expected within threshold, got {:?}", other),
        }
        assert!(visual.check("cart", &shot, 0.5).unwrap().is_regression());
    }

    #[test]
    fn test_missing_screenshot_is_not_a_regression() {
        let dir = tempfile::tempdir().unwrap();
        let visual = store(dir.path(), true);
        let missing = dir.path().join("never-taken.png");

        assert!(matches!(
            visual.check("never-taken", &missing, 0.5),
            Err(HarnessError::ScreenshotNotFound(path)) if path == missing
        ));
        assert!(matches!(
            visual.promote("never-taken", &missing),
            Err(HarnessError::ScreenshotNotFound(_))
        ));
    }
}
