//! Intrinsic properties of a video stream.

use std::path::Path;

use ffmpeg_next as ffmpeg;
use serde::{Deserialize, Serialize};

use crate::VideoError;

/// Properties of a video stream, read once at open and immutable after.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    /// Frame count as advertised by the container; 0 when unknown.
    pub frame_count: u64,
    /// Seconds; 0 when the stream reports no frame rate.
    pub duration: f64,
    /// FFmpeg codec id of the video stream.
    pub codec: i32,
}

/// Opens a decode handle on `path`, reads the stream properties, and
/// releases the handle before returning.
pub fn read_metadata(path: &Path) -> Result<VideoMetadata, VideoError> {
    ffmpeg::init()?;
    let ictx = ffmpeg::format::input(&path).map_err(|source| VideoError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let stream = ictx
        .streams()
        .best(ffmpeg::media::Type::Video)
        .ok_or_else(|| VideoError::Open {
            path: path.to_path_buf(),
            source: ffmpeg::Error::StreamNotFound,
        })?;

    let fps = frame_rate(&stream);
    let frame_count = stream.frames().max(0) as u64;
    let codec = ffmpeg::ffi::AVCodecID::from(stream.parameters().id()) as i32;

    let decoder = ffmpeg::codec::context::Context::from_parameters(stream.parameters())?
        .decoder()
        .video()?;

    Ok(VideoMetadata {
        width: decoder.width(),
        height: decoder.height(),
        fps,
        frame_count,
        duration: duration_secs(frame_count, fps),
        codec,
    })
}

pub(crate) fn frame_rate(stream: &ffmpeg::format::stream::Stream<'_>) -> f64 {
    let rate = stream.avg_frame_rate();
    if rate.denominator() > 0 {
        rate.numerator() as f64 / rate.denominator() as f64
    } else {
        0.0
    }
}

/// Stream length in seconds; 0 when the frame rate is unknown.
pub(crate) fn duration_secs(frame_count: u64, fps: f64) -> f64 {
    if fps > 0.0 {
        frame_count as f64 / fps
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_divides_frames_by_rate() {
        assert_eq!(duration_secs(250, 25.0), 10.0);
        assert_eq!(duration_secs(90, 30.0), 3.0);
    }

    #[test]
    fn zero_frame_rate_yields_zero_duration() {
        assert_eq!(duration_secs(250, 0.0), 0.0);
        assert_eq!(duration_secs(0, 0.0), 0.0);
    }
}
