mod error;

pub use error::SnapshotError;

use std::path::PathBuf;

use image::{ImageFormat, Rgba, RgbaImage};

/// Environment variable that switches the comparison into recording mode, the equivalent of a
/// test framework's `--update-snapshots` flag.
pub const UPDATE_SNAPSHOTS_ENV: &str = "UPDATE_SNAPSHOTS";

const DIFF_HIGHLIGHT: Rgba<u8> = Rgba([255, 0, 0, 255]);

/// Compares captured screenshots against committed baseline images.
///
/// Baselines are keyed `<name>.png` inside the baseline directory. On a mismatch the captured
/// image and a highlighted diff are written into the artifact directory so the failure can be
/// inspected.
#[derive(Debug, Clone)]
pub struct SnapshotContext {
    baseline_dir: PathBuf,
    artifact_dir: PathBuf,
    update: bool,
    channel_tolerance: u8,
    max_differing_pixels: usize,
}

impl SnapshotContext {
    /// Create a context for the given baseline directory. Artifacts default to an `artifacts`
    /// subdirectory and update mode is read from [UPDATE_SNAPSHOTS_ENV].
    pub fn new(baseline_dir: impl Into<PathBuf>) -> Self {
        let baseline_dir = baseline_dir.into();
        let artifact_dir = baseline_dir.join("artifacts");

        let update = std::env::var(UPDATE_SNAPSHOTS_ENV)
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Self {
            baseline_dir,
            artifact_dir,
            update,
            channel_tolerance: 0,
            max_differing_pixels: 0,
        }
    }

    pub fn with_artifact_dir(mut self, artifact_dir: impl Into<PathBuf>) -> Self {
        self.artifact_dir = artifact_dir.into();
        self
    }

    pub fn with_update(mut self, update: bool) -> Self {
        self.update = update;
        self
    }

    /// Per-channel difference below which two pixels are considered equal. Zero by default, so
    /// the comparison is exact.
    pub fn with_channel_tolerance(mut self, channel_tolerance: u8) -> Self {
        self.channel_tolerance = channel_tolerance;
        self
    }

    /// Number of differing pixels the comparison will accept. Zero by default.
    pub fn with_max_differing_pixels(mut self, max_differing_pixels: usize) -> Self {
        self.max_differing_pixels = max_differing_pixels;
        self
    }

    pub fn baseline_path(&self, name: &str) -> PathBuf {
        self.baseline_dir.join(format!("{}.png", name))
    }

    /// Assert that the captured PNG matches the named baseline.
    ///
    /// In update mode the capture is recorded as the new baseline instead of being compared.
    pub fn assert_matches(&self, name: &str, png_bytes: &[u8]) -> Result<(), SnapshotError> {
        let baseline_path = self.baseline_path(name);

        if self.update {
            std::fs::create_dir_all(&self.baseline_dir)?;
            std::fs::write(&baseline_path, png_bytes)?;
            log::info!("Recorded baseline {}", baseline_path.display());
            return Ok(());
        }

        let actual = decode_png(png_bytes, "captured")?;

        if !baseline_path.exists() {
            let actual_path = self.write_actual(name, png_bytes)?;
            return Err(SnapshotError::MissingBaseline {
                baseline: baseline_path,
                actual: actual_path,
            });
        }

        let baseline = image::open(&baseline_path)
            .map_err(|source| SnapshotError::Decode {
                context: "baseline",
                source,
            })?
            .to_rgba8();

        if baseline.dimensions() != actual.dimensions() {
            let actual_path = self.write_actual(name, png_bytes)?;
            return Err(SnapshotError::DimensionMismatch {
                baseline_width: baseline.width(),
                baseline_height: baseline.height(),
                actual_width: actual.width(),
                actual_height: actual.height(),
                actual: actual_path,
            });
        }

        let (differing, diff_image) = diff_images(&baseline, &actual, self.channel_tolerance);

        if differing > self.max_differing_pixels {
            let actual_path = self.write_actual(name, png_bytes)?;
            let diff_path = self.artifact_dir.join(format!("{}.diff.png", name));
            diff_image
                .save_with_format(&diff_path, ImageFormat::Png)
                .map_err(io_from_image)?;

            return Err(SnapshotError::PixelMismatch {
                differing,
                total: (baseline.width() * baseline.height()) as usize,
                actual: actual_path,
                diff: diff_path,
            });
        }

        Ok(())
    }

    fn write_actual(&self, name: &str, png_bytes: &[u8]) -> Result<PathBuf, SnapshotError> {
        std::fs::create_dir_all(&self.artifact_dir)?;
        let actual_path = self.artifact_dir.join(format!("{}.actual.png", name));
        std::fs::write(&actual_path, png_bytes)?;
        Ok(actual_path)
    }
}

fn decode_png(bytes: &[u8], context: &'static str) -> Result<RgbaImage, SnapshotError> {
    image::load_from_memory_with_format(bytes, ImageFormat::Png)
        .map(|img| img.to_rgba8())
        .map_err(|source| SnapshotError::Decode { context, source })
}

/// Count pixels differing beyond the tolerance and paint them into a copy of the captured
/// image so the mismatch is visible at a glance.
fn diff_images(baseline: &RgbaImage, actual: &RgbaImage, tolerance: u8) -> (usize, RgbaImage) {
    let mut differing = 0;
    let mut diff_image = actual.clone();

    for (x, y, baseline_pixel) in baseline.enumerate_pixels() {
        let actual_pixel = actual.get_pixel(x, y);
        let matches = baseline_pixel
            .0
            .iter()
            .zip(actual_pixel.0.iter())
            .all(|(a, b)| a.abs_diff(*b) <= tolerance);

        if !matches {
            differing += 1;
            diff_image.put_pixel(x, y, DIFF_HIGHLIGHT);
        }
    }

    (differing, diff_image)
}

fn io_from_image(err: image::ImageError) -> SnapshotError {
    match err {
        image::ImageError::IoError(io) => SnapshotError::Io(io),
        other => SnapshotError::Decode {
            context: "diff",
            source: other,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;
    use std::path::Path;

    fn png_bytes(width: u32, height: u32, pixel: [u8; 4]) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba(pixel));
        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn context(dir: &Path) -> SnapshotContext {
        SnapshotContext::new(dir).with_update(false)
    }

    #[test]
    fn update_mode_records_baseline() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = png_bytes(4, 4, [10, 20, 30, 255]);

        context(dir.path())
            .with_update(true)
            .assert_matches("ui", &bytes)
            .unwrap();

        assert!(dir.path().join("ui.png").exists());

        // The recorded baseline must match the capture it was recorded from.
        context(dir.path()).assert_matches("ui", &bytes).unwrap();
    }

    #[test]
    fn identical_images_match() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = png_bytes(8, 8, [0, 128, 255, 255]);
        let ctx = context(dir.path());

        ctx.clone().with_update(true).assert_matches("ui", &bytes).unwrap();
        ctx.assert_matches("ui", &bytes).unwrap();
    }

    #[test]
    fn differing_pixels_fail_and_write_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());

        ctx.clone()
            .with_update(true)
            .assert_matches("ui", &png_bytes(4, 4, [0, 0, 0, 255]))
            .unwrap();

        let err = ctx
            .assert_matches("ui", &png_bytes(4, 4, [255, 255, 255, 255]))
            .unwrap_err();

        match err {
            SnapshotError::PixelMismatch {
                differing,
                total,
                actual,
                diff,
            } => {
                assert_eq!(differing, 16);
                assert_eq!(total, 16);
                assert!(actual.exists());
                assert!(diff.exists());
            }
            other => panic!("expected PixelMismatch, got {other:?}"),
        }
    }

    #[test]
    fn dimension_mismatch_is_reported_distinctly() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());

        ctx.clone()
            .with_update(true)
            .assert_matches("ui", &png_bytes(4, 4, [0, 0, 0, 255]))
            .unwrap();

        let err = ctx
            .assert_matches("ui", &png_bytes(8, 4, [0, 0, 0, 255]))
            .unwrap_err();

        assert!(matches!(err, SnapshotError::DimensionMismatch { .. }));
    }

    #[test]
    fn missing_baseline_fails_with_hint() {
        let dir = tempfile::tempdir().unwrap();

        let err = context(dir.path())
            .assert_matches("ui", &png_bytes(4, 4, [0, 0, 0, 255]))
            .unwrap_err();

        assert!(matches!(err, SnapshotError::MissingBaseline { .. }));
        assert!(err.to_string().contains("UPDATE_SNAPSHOTS"));
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        let dir = tempfile::tempdir().unwrap();

        let err = context(dir.path())
            .assert_matches("ui", b"not a png")
            .unwrap_err();

        assert!(matches!(err, SnapshotError::Decode { .. }));
    }

    #[test]
    fn tolerance_accepts_small_differences() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path()).with_channel_tolerance(10);

        ctx.clone()
            .with_update(true)
            .assert_matches("ui", &png_bytes(4, 4, [100, 100, 100, 255]))
            .unwrap();

        ctx.assert_matches("ui", &png_bytes(4, 4, [105, 95, 100, 255]))
            .unwrap();
    }

    #[test]
    fn max_differing_pixels_budget() {
        let dir = tempfile::tempdir().unwrap();

        let mut img = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255]));
        img.put_pixel(0, 0, Rgba([255, 255, 255, 255]));
        let mut changed = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut changed), ImageFormat::Png)
            .unwrap();

        let ctx = context(dir.path());
        ctx.clone()
            .with_update(true)
            .assert_matches("ui", &png_bytes(4, 4, [0, 0, 0, 255]))
            .unwrap();

        ctx.clone()
            .with_max_differing_pixels(1)
            .assert_matches("ui", &changed)
            .unwrap();
        assert!(ctx.assert_matches("ui", &changed).is_err());
    }
}
