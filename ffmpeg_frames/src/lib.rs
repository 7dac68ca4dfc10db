//! Video stream probing and frame sampling on top of FFmpeg.

use std::path::PathBuf;

use ffmpeg_next as ffmpeg;
use thiserror::Error;

pub mod meta;
pub mod sampler;

/// Failures shared by the metadata reader and the frame sampler.
///
/// All variants are domain errors, not transient faults; nothing here is
/// retried. Callers batching over many videos can log and continue.
#[derive(Debug, Error)]
pub enum VideoError {
    /// The decode handle could not be opened: missing file, unsupported
    /// codec, or no video track.
    #[error("could not open video {path:?}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: ffmpeg::Error,
    },
    /// The sampling step must be a positive integer below the stream's
    /// frame rate.
    #[error("invalid sampling step {step}: must be at least 1 and below the frame rate ({fps})")]
    InvalidStep { step: u32, fps: f64 },
    /// The target directory already exists and overwriting is disabled.
    #[error("output directory already exists: {0:?}")]
    OutputExists(PathBuf),
    #[error(transparent)]
    Decode(#[from] ffmpeg::Error),
    #[error("frame encode: {0}")]
    Encode(#[from] image::ImageError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
