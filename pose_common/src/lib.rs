//! Shared types for pose detection post-processing: normalizing raw
//! per-detection annotations into fixed-shape pixel-space batches,
//! assembling them with decoded frames, and rendering overlays.

pub mod annotation;
pub mod batch;
pub mod classes;
pub mod frame_result;
pub mod skeleton;
pub mod visualizer;
