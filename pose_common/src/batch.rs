//! Aggregation of per-detection records into per-frame batches.

use ndarray::{Array2, Array3, Axis};
use thiserror::Error;

use crate::annotation::{self, RawPoseAnnotation, BOX_FIELDS};
use crate::skeleton;

/// Annotation shapes that cannot be stacked into one batch.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ShapeMismatch {
    #[error("annotation {index}: keypoint arrays disagree (x={x}, y={y}, visible={visible})")]
    UnevenKeypointArrays {
        index: usize,
        x: usize,
        y: usize,
        visible: usize,
    },
    #[error("annotation {index}: {found} joints, batch expects {expected}")]
    JointCount {
        index: usize,
        expected: usize,
        found: usize,
    },
    #[error("annotation {index}: orig_shape {found:?}, batch expects {expected:?}")]
    OrigShape {
        index: usize,
        expected: (u32, u32),
        found: (u32, u32),
    },
}

/// Fixed-shape, pixel-space detections for one frame.
///
/// Both arrays share N rows and keep the input annotation order. An empty
/// frame still carries correctly shaped `(0, 6)` and `(0, K, 3)` arrays so
/// consumers can index dimensions uniformly.
#[derive(Debug, Clone)]
pub struct DetectionBatch {
    boxes: Array2<f32>,
    keypoints: Array3<f32>,
    orig_shape: (u32, u32),
}

impl DetectionBatch {
    /// `(N, 6)` box rows: x1, y1, x2, y2, confidence, class.
    pub fn boxes(&self) -> &Array2<f32> {
        &self.boxes
    }

    /// `(N, K, 3)` keypoint rows: x, y, visibility.
    pub fn keypoints(&self) -> &Array3<f32> {
        &self.keypoints
    }

    /// `(height, width)` the pixel coordinates refer to.
    pub fn orig_shape(&self) -> (u32, u32) {
        self.orig_shape
    }

    /// Detection count N.
    pub fn len(&self) -> usize {
        self.boxes.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Stacks the per-detection records of one frame into batched arrays.
///
/// Every annotation must share the first annotation's `orig_shape` and
/// joint count; violations surface as [`ShapeMismatch`] naming the
/// offending index before anything is allocated. Row order follows input
/// order. Box coordinates pass through as delivered upstream; an inverted
/// box is propagated, not corrected.
pub fn aggregate(annotations: &[RawPoseAnnotation]) -> Result<DetectionBatch, ShapeMismatch> {
    let joints = annotations
        .first()
        .map(RawPoseAnnotation::joint_count)
        .unwrap_or(skeleton::JOINT_COUNT);
    let orig_shape = annotations.first().map(|a| a.orig_shape).unwrap_or((0, 0));

    for (index, annotation) in annotations.iter().enumerate() {
        annotation.check_parallel_arrays(index)?;
        if annotation.joint_count() != joints {
            return Err(ShapeMismatch::JointCount {
                index,
                expected: joints,
                found: annotation.joint_count(),
            });
        }
        if annotation.orig_shape != orig_shape {
            return Err(ShapeMismatch::OrigShape {
                index,
                expected: orig_shape,
                found: annotation.orig_shape,
            });
        }
    }

    let mut boxes = Array2::zeros((annotations.len(), BOX_FIELDS));
    let mut keypoints = Array3::zeros((annotations.len(), joints, 3));
    for (row, annotation) in annotations.iter().enumerate() {
        boxes
            .row_mut(row)
            .assign(&ndarray::arr1(&annotation::pixel_box(annotation)));
        keypoints
            .index_axis_mut(Axis(0), row)
            .assign(&annotation::pixel_keypoints(annotation));
    }

    Ok(DetectionBatch {
        boxes,
        keypoints,
        orig_shape,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::{RawBox, RawKeypoints};

    fn annotation(x1: f32, orig_shape: (u32, u32), joints: usize) -> RawPoseAnnotation {
        RawPoseAnnotation {
            orig_shape,
            boxes: RawBox {
                x1,
                y1: 0.0,
                x2: 1.0,
                y2: 1.0,
                confidence: 0.8,
                cls: 0,
            },
            keypoints: RawKeypoints {
                x: vec![0.5; joints],
                y: vec![0.5; joints],
                visible: vec![1.0; joints],
            },
        }
    }

    #[test]
    fn batch_shapes_follow_detection_count() {
        let annotations = vec![
            annotation(0.1, (480, 640), 17),
            annotation(0.2, (480, 640), 17),
            annotation(0.3, (480, 640), 17),
        ];
        let batch = aggregate(&annotations).unwrap();
        assert_eq!(batch.boxes().shape(), &[3, 6]);
        assert_eq!(batch.keypoints().shape(), &[3, 17, 3]);
        assert_eq!(batch.len(), 3);
        assert_eq!(batch.orig_shape(), (480, 640));
    }

    #[test]
    fn empty_input_yields_shaped_empty_batch() {
        let batch = aggregate(&[]).unwrap();
        assert_eq!(batch.boxes().shape(), &[0, 6]);
        assert_eq!(batch.keypoints().shape(), &[0, 17, 3]);
        assert!(batch.is_empty());
        assert_eq!(batch.orig_shape(), (0, 0));
    }

    #[test]
    fn rows_preserve_input_order() {
        let annotations = vec![
            annotation(0.25, (100, 200), 3),
            annotation(0.5, (100, 200), 3),
        ];
        let batch = aggregate(&annotations).unwrap();
        assert_eq!(batch.boxes()[[0, 0]], 50.0);
        assert_eq!(batch.boxes()[[1, 0]], 100.0);
    }

    #[test]
    fn joint_count_mismatch_is_rejected_eagerly() {
        let annotations = vec![
            annotation(0.1, (480, 640), 17),
            annotation(0.2, (480, 640), 16),
        ];
        let err = aggregate(&annotations).unwrap_err();
        assert_eq!(
            err,
            ShapeMismatch::JointCount {
                index: 1,
                expected: 17,
                found: 16,
            }
        );
    }

    #[test]
    fn orig_shape_mismatch_is_rejected_eagerly() {
        let annotations = vec![
            annotation(0.1, (480, 640), 17),
            annotation(0.2, (720, 1280), 17),
        ];
        let err = aggregate(&annotations).unwrap_err();
        assert_eq!(
            err,
            ShapeMismatch::OrigShape {
                index: 1,
                expected: (480, 640),
                found: (720, 1280),
            }
        );
    }

    #[test]
    fn inverted_box_passes_through() {
        let mut inverted = annotation(0.75, (100, 100), 3);
        inverted.boxes.x2 = 0.25;
        let batch = aggregate(&[inverted]).unwrap();
        assert_eq!(batch.boxes()[[0, 0]], 75.0);
        assert_eq!(batch.boxes()[[0, 2]], 25.0);
    }
}
