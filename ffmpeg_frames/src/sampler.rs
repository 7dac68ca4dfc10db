//! Sequential decode of a video stream, persisting every Nth frame.

use std::fs;
use std::path::{Path, PathBuf};

use ffmpeg_next as ffmpeg;
use image::RgbImage;

use crate::meta;
use crate::VideoError;

/// Sampling policy for [`split_video_to_frames`].
#[derive(Debug, Clone)]
pub struct SplitOptions {
    /// Frame file name prefix.
    pub prefix: String,
    /// Keep every `step`-th frame, starting at frame 0.
    pub step: u32,
    /// Replace a pre-existing output directory instead of failing.
    pub overwrite: bool,
}

impl Default for SplitOptions {
    fn default() -> Self {
        Self {
            prefix: "frame".into(),
            step: 1,
            overwrite: true,
        }
    }
}

/// Decodes `path` sequentially and writes every `step`-th frame as a JPEG
/// under `output_dir/<video identifier>/`. Returns the saved-frame count.
///
/// The video identifier is the file stem truncated at the first
/// underscore. Frame indices are zero-padded to at least four digits,
/// wider when the container advertises more than 9999 frames, so the file
/// set sorts in decode order. Decoding runs until the stream signals
/// end-of-stream; the handles are released on every exit path.
///
/// Two callers racing on the same target directory are not coordinated;
/// the directory policy assumes a single writer.
pub fn split_video_to_frames(
    path: &Path,
    output_dir: &Path,
    options: &SplitOptions,
) -> Result<usize, VideoError> {
    ffmpeg::init()?;
    let mut ictx = ffmpeg::format::input(&path).map_err(|source| VideoError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let (stream_index, fps, frame_count, parameters) = {
        let stream = ictx
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or_else(|| VideoError::Open {
                path: path.to_path_buf(),
                source: ffmpeg::Error::StreamNotFound,
            })?;
        (
            stream.index(),
            meta::frame_rate(&stream),
            stream.frames().max(0) as u64,
            stream.parameters(),
        )
    };

    let target_dir = output_dir.join(video_identifier(path));
    prepare_output_dir(&target_dir, options.overwrite)?;
    validate_step(options.step, fps)?;

    let mut decoder = ffmpeg::codec::context::Context::from_parameters(parameters)?
        .decoder()
        .video()?;
    let mut scaler = ffmpeg::software::scaling::context::Context::get(
        decoder.format(),
        decoder.width(),
        decoder.height(),
        ffmpeg::format::Pixel::RGB24,
        decoder.width(),
        decoder.height(),
        ffmpeg::software::scaling::flag::Flags::BILINEAR,
    )?;

    let index_width = index_width(frame_count);
    let step = options.step as usize;
    let mut frame_index = 0usize;
    let mut saved = 0usize;

    let mut drain = |decoder: &mut ffmpeg::decoder::Video| -> Result<(), VideoError> {
        let mut decoded = ffmpeg::frame::Video::empty();
        while decoder.receive_frame(&mut decoded).is_ok() {
            if frame_index % step == 0 {
                let mut rgb_frame = ffmpeg::frame::Video::empty();
                scaler.run(&decoded, &mut rgb_frame)?;
                let file =
                    target_dir.join(frame_file_name(&options.prefix, frame_index, index_width));
                write_frame(&rgb_frame, &file)?;
                saved += 1;
            }
            frame_index += 1;
        }
        Ok(())
    };

    for (stream, packet) in ictx.packets() {
        if stream.index() == stream_index {
            decoder.send_packet(&packet)?;
            drain(&mut decoder)?;
        }
    }
    decoder.send_eof()?;
    drain(&mut decoder)?;

    log::info!("Saved {saved} frames from {path:?} to {target_dir:?}");
    Ok(saved)
}

/// File stem truncated at the first underscore: `clip_0042.mp4` → `clip`.
fn video_identifier(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy())
        .unwrap_or_default();
    stem.split('_').next().unwrap_or("").to_string()
}

/// Creates the per-video output directory, honoring the overwrite policy.
fn prepare_output_dir(target_dir: &Path, overwrite: bool) -> Result<(), VideoError> {
    if target_dir.exists() {
        if !overwrite {
            return Err(VideoError::OutputExists(target_dir.to_path_buf()));
        }
        fs::remove_dir_all(target_dir)?;
    }
    fs::create_dir_all(target_dir)?;
    Ok(())
}

fn validate_step(step: u32, fps: f64) -> Result<(), VideoError> {
    if step == 0 || (step as f64) >= fps {
        return Err(VideoError::InvalidStep { step, fps });
    }
    Ok(())
}

/// Width of the zero-padded frame index; never below four digits.
fn index_width(frame_count: u64) -> usize {
    frame_count.to_string().len().max(4)
}

fn frame_file_name(prefix: &str, frame_index: usize, index_width: usize) -> PathBuf {
    PathBuf::from(format!("{prefix}_{frame_index:0index_width$}.jpg"))
}

fn write_frame(frame: &ffmpeg::frame::Video, path: &Path) -> Result<(), VideoError> {
    let width = frame.width();
    let height = frame.height();
    let row_bytes = width as usize * 3;
    let stride = frame.stride(0);
    let data = frame.data(0);

    // The scaler may pad rows; copy row by row when the stride disagrees.
    let pixels = if stride == row_bytes {
        data.to_vec()
    } else {
        let mut pixels = Vec::with_capacity(row_bytes * height as usize);
        for row in 0..height as usize {
            let start = row * stride;
            pixels.extend_from_slice(&data[start..start + row_bytes]);
        }
        pixels
    };

    let image = RgbImage::from_raw(width, height, pixels).unwrap();
    image.save(path)?;
    Ok(())
}
