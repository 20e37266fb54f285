use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error(
        "no baseline image at {} - run with UPDATE_SNAPSHOTS=1 to record one (actual image written to {})",
        .baseline.display(),
        .actual.display()
    )]
    MissingBaseline { baseline: PathBuf, actual: PathBuf },

    #[error("failed to decode the {context} image: {source}")]
    Decode {
        context: &'static str,
        #[source]
        source: image::ImageError,
    },

    #[error(
        "baseline is {}x{} but the screenshot is {}x{} (actual image written to {})",
        .baseline_width,
        .baseline_height,
        .actual_width,
        .actual_height,
        .actual.display()
    )]
    DimensionMismatch {
        baseline_width: u32,
        baseline_height: u32,
        actual_width: u32,
        actual_height: u32,
        actual: PathBuf,
    },

    #[error(
        "{} of {} pixels differ from the baseline (diff written to {})",
        .differing,
        .total,
        .diff.display()
    )]
    PixelMismatch {
        differing: usize,
        total: usize,
        actual: PathBuf,
        diff: PathBuf,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
