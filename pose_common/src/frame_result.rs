//! Assembly of decoded frames with their detection batches.

use std::path::{Path, PathBuf};

use image::DynamicImage;

use crate::annotation::RawPoseAnnotation;
use crate::batch::{self, DetectionBatch, ShapeMismatch};
use crate::classes;

/// One decoded frame combined with its detection batch, ready to render.
///
/// The result exclusively owns its buffer and arrays; nothing is shared
/// across frames, and the batch is never mutated after construction.
#[derive(Debug, Clone)]
pub struct FrameResult {
    image: DynamicImage,
    detections: DetectionBatch,
    names: &'static [&'static str],
    path: PathBuf,
}

impl FrameResult {
    /// The frame buffer. 3-channel buffers are stored with reversed channel
    /// order; see [`assemble`].
    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    pub fn detections(&self) -> &DetectionBatch {
        &self.detections
    }

    /// Source file the frame was decoded from; provenance only.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Name for a box row's class lane.
    pub fn class_name(&self, cls: usize) -> &'static str {
        self.names.get(cls).copied().unwrap_or("unknown")
    }
}

/// Reverses the color channel order of a 3-channel buffer.
///
/// Buffers with any other channel count pass through unchanged. Applying
/// the reversal twice restores the original buffer.
pub fn reverse_channels(image: DynamicImage) -> DynamicImage {
    match image {
        DynamicImage::ImageRgb8(mut buffer) => {
            for pixel in buffer.pixels_mut() {
                pixel.0.reverse();
            }
            DynamicImage::ImageRgb8(buffer)
        }
        other => other,
    }
}

/// Combines a decoded frame with its detections into a [`FrameResult`].
///
/// The buffer's channel order is reversed once here; the drawing layer
/// consumes the reversed order. Aggregation failures propagate as
/// [`ShapeMismatch`]. An empty `detections` slice is not an error: the
/// result carries a zero-row batch and renders as the bare image.
pub fn assemble(
    image: DynamicImage,
    path: impl Into<PathBuf>,
    detections: &[RawPoseAnnotation],
) -> Result<FrameResult, ShapeMismatch> {
    let batch = batch::aggregate(detections)?;
    let path = path.into();
    log::debug!("assembled {:?} with {} detections", path, batch.len());
    Ok(FrameResult {
        image: reverse_channels(image),
        detections: batch,
        names: &classes::NAMES,
        path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage};

    fn rgb_image() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(4, 2, |x, y| {
            Rgb([x as u8, y as u8, (x + y) as u8])
        }))
    }

    #[test]
    fn reversing_channels_twice_restores_the_buffer() {
        let original = rgb_image();
        let round_trip = reverse_channels(reverse_channels(original.clone()));
        assert_eq!(original.as_bytes(), round_trip.as_bytes());
    }

    #[test]
    fn grayscale_passes_through_unchanged() {
        let gray =
            DynamicImage::ImageLuma8(GrayImage::from_pixel(3, 3, Luma([42])));
        let out = reverse_channels(gray.clone());
        assert_eq!(gray.as_bytes(), out.as_bytes());
    }

    #[test]
    fn assemble_reverses_three_channel_buffers() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(1, 1, Rgb([1, 2, 3])));
        let frame = assemble(image, "frame_0000.jpg", &[]).unwrap();
        assert_eq!(frame.image().as_bytes(), &[3, 2, 1]);
    }

    #[test]
    fn assemble_accepts_zero_detections() {
        let frame = assemble(rgb_image(), "frame_0000.jpg", &[]).unwrap();
        assert!(frame.detections().is_empty());
        assert_eq!(frame.detections().boxes().shape(), &[0, 6]);
        assert_eq!(frame.detections().keypoints().shape(), &[0, 17, 3]);
        assert_eq!(frame.class_name(0), "person");
        assert_eq!(frame.path(), Path::new("frame_0000.jpg"));
    }
}
