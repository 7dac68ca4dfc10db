//! Raw pose annotations and their conversion to pixel space.

use ndarray::{Array2, Array3, Axis};
use serde::{Deserialize, Serialize};

use crate::batch::ShapeMismatch;

/// Float lanes in one box record: x1, y1, x2, y2, confidence, class.
pub const BOX_FIELDS: usize = 6;

/// One pose detection as handed over by the external detector.
///
/// Coordinates are normalized to `[0, 1]` relative to `orig_shape`; the
/// three keypoint arrays run parallel, one entry per joint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawPoseAnnotation {
    /// `(height, width)` of the frame the detection was made on.
    pub orig_shape: (u32, u32),
    pub boxes: RawBox,
    pub keypoints: RawKeypoints,
}

/// Normalized bounding box with score and class index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub confidence: f32,
    pub cls: u32,
}

/// Normalized keypoint coordinates with per-joint visibility scores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawKeypoints {
    pub x: Vec<f32>,
    pub y: Vec<f32>,
    pub visible: Vec<f32>,
}

impl RawPoseAnnotation {
    /// Joint count of this annotation, taken from the x array.
    pub fn joint_count(&self) -> usize {
        self.keypoints.x.len()
    }

    pub(crate) fn check_parallel_arrays(&self, index: usize) -> Result<(), ShapeMismatch> {
        let (x, y, visible) = (
            self.keypoints.x.len(),
            self.keypoints.y.len(),
            self.keypoints.visible.len(),
        );
        if x != y || x != visible {
            return Err(ShapeMismatch::UnevenKeypointArrays {
                index,
                x,
                y,
                visible,
            });
        }
        Ok(())
    }
}

/// Converts a normalized `[0, 1]` coordinate to a pixel coordinate.
///
/// Truncates toward zero rather than rounding. Out-of-range inputs are not
/// validated and produce out-of-range pixel coordinates.
pub fn to_pixel(value: f32, dim_size: u32) -> i32 {
    (value * dim_size as f32) as i32
}

/// Pixel-space box record for one detection.
pub(crate) fn pixel_box(annotation: &RawPoseAnnotation) -> [f32; BOX_FIELDS] {
    let (height, width) = annotation.orig_shape;
    let boxes = &annotation.boxes;
    [
        to_pixel(boxes.x1, width) as f32,
        to_pixel(boxes.y1, height) as f32,
        to_pixel(boxes.x2, width) as f32,
        to_pixel(boxes.y2, height) as f32,
        boxes.confidence,
        boxes.cls as f32,
    ]
}

/// Pixel-space `(K, 3)` keypoint record for one detection.
pub(crate) fn pixel_keypoints(annotation: &RawPoseAnnotation) -> Array2<f32> {
    let (height, width) = annotation.orig_shape;
    let keypoints = &annotation.keypoints;
    let mut out = Array2::zeros((annotation.joint_count(), 3));
    for (joint, ((&x, &y), &visible)) in keypoints
        .x
        .iter()
        .zip(&keypoints.y)
        .zip(&keypoints.visible)
        .enumerate()
    {
        out[[joint, 0]] = to_pixel(x, width) as f32;
        out[[joint, 1]] = to_pixel(y, height) as f32;
        out[[joint, 2]] = visible;
    }
    out
}

/// Converts one annotation into single-detection batches: a `(1, 6)` box
/// batch and a `(1, K, 3)` keypoint batch, ready for stacking.
pub fn process(
    annotation: &RawPoseAnnotation,
) -> Result<(Array2<f32>, Array3<f32>), ShapeMismatch> {
    annotation.check_parallel_arrays(0)?;
    let boxes = ndarray::arr1(&pixel_box(annotation)).insert_axis(Axis(0));
    let keypoints = pixel_keypoints(annotation).insert_axis(Axis(0));
    Ok((boxes, keypoints))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn annotation() -> RawPoseAnnotation {
        RawPoseAnnotation {
            orig_shape: (480, 640),
            boxes: RawBox {
                x1: 0.5,
                y1: 0.25,
                x2: 0.75,
                y2: 1.0,
                confidence: 0.9,
                cls: 0,
            },
            keypoints: RawKeypoints {
                x: vec![0.5, 0.0, 0.999],
                y: vec![0.5, 0.0, 0.999],
                visible: vec![1.0, 0.0, 0.25],
            },
        }
    }

    #[test]
    fn to_pixel_truncates() {
        assert_eq!(to_pixel(0.5, 100), 50);
        assert_eq!(to_pixel(0.999, 10), 9);
        assert_eq!(to_pixel(0.0, 640), 0);
        assert_eq!(to_pixel(1.0, 640), 640);
    }

    #[test]
    fn to_pixel_truncates_toward_zero() {
        assert_eq!(to_pixel(-0.25, 100), -25);
        assert_eq!(to_pixel(-0.004, 100), 0);
    }

    #[test]
    fn to_pixel_passes_out_of_range_through() {
        assert_eq!(to_pixel(2.0, 100), 200);
    }

    #[test]
    fn process_produces_single_detection_batches() {
        let (boxes, keypoints) = process(&annotation()).unwrap();
        assert_eq!(boxes.shape(), &[1, 6]);
        assert_eq!(keypoints.shape(), &[1, 3, 3]);

        assert_eq!(boxes[[0, 0]], 320.0);
        assert_eq!(boxes[[0, 1]], 120.0);
        assert_eq!(boxes[[0, 2]], 480.0);
        assert_eq!(boxes[[0, 3]], 480.0);
        assert_eq!(boxes[[0, 4]], 0.9);
        assert_eq!(boxes[[0, 5]], 0.0);

        assert_eq!(keypoints[[0, 0, 0]], 320.0);
        assert_eq!(keypoints[[0, 0, 1]], 240.0);
        assert_eq!(keypoints[[0, 0, 2]], 1.0);
        // Visibility passes through untouched.
        assert_eq!(keypoints[[0, 2, 2]], 0.25);
    }

    #[test]
    fn process_rejects_uneven_keypoint_arrays() {
        let mut bad = annotation();
        bad.keypoints.visible.pop();
        let err = process(&bad).unwrap_err();
        assert!(matches!(
            err,
            ShapeMismatch::UnevenKeypointArrays {
                x: 3,
                y: 3,
                visible: 2,
                ..
            }
        ));
    }
}
