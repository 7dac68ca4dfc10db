//! Overlay rendering for assembled frame results.

use ab_glyph::{FontArc, PxScale};
use fast_image_resize::images::Image;
use fast_image_resize::{FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer};
use image::{Rgb, RgbImage};
use imageproc::drawing::{
    draw_filled_circle_mut, draw_hollow_rect_mut, draw_line_segment_mut, draw_text_mut,
};
use imageproc::rect::Rect;
use ndarray::{ArrayView2, Axis};
use thiserror::Error;

use crate::frame_result::{reverse_channels, FrameResult};
use crate::skeleton::SKELETON;

const BOX_COLOR: Rgb<u8> = Rgb([255, 56, 56]);
const JOINT_COLOR: Rgb<u8> = Rgb([51, 255, 51]);
const LIMB_COLOR: Rgb<u8> = Rgb([51, 153, 255]);
const LABEL_COLOR: Rgb<u8> = Rgb([255, 255, 255]);
const LABEL_FONT_SIZE: f32 = 20.0;
const JOINT_RADIUS: i32 = 5;
/// Joints below this visibility are neither marked nor connected.
const VISIBILITY_THRESHOLD: f32 = 0.5;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("resize buffer: {0}")]
    Buffer(#[from] fast_image_resize::ImageBufferError),
    #[error("resize: {0}")]
    Resize(#[from] fast_image_resize::ResizeError),
}

/// Draws detection batches onto frame buffers.
///
/// The label font is an explicit handle owned by the caller; without one,
/// boxes, joints and limbs are still drawn and labels are skipped.
pub struct Visualizer {
    font: Option<FontArc>,
    font_scale: PxScale,
    joint_radius: i32,
}

impl Default for Visualizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Visualizer {
    /// A visualizer without a label font.
    pub fn new() -> Self {
        Self {
            font: None,
            font_scale: PxScale::from(LABEL_FONT_SIZE),
            joint_radius: JOINT_RADIUS,
        }
    }

    /// A visualizer that also draws `"{class} {confidence}"` labels.
    pub fn with_font(font: FontArc) -> Self {
        Self {
            font: Some(font),
            ..Self::new()
        }
    }

    /// Renders all detections onto a copy of the frame and rescales the
    /// result to `round(width * scale), round(height * scale)` with a
    /// Lanczos3 filter.
    ///
    /// Returns a new buffer in display channel order; `frame` is left
    /// untouched. `scale` must be positive.
    pub fn render(&self, frame: &FrameResult, scale: f32) -> Result<RgbImage, RenderError> {
        debug_assert!(scale > 0.0, "scale must be positive");

        // Undo the assembly-time channel reversal so drawing happens in
        // display order; grayscale frames pass through as-is.
        let mut canvas = reverse_channels(frame.image().clone()).to_rgb8();

        let boxes = frame.detections().boxes();
        let keypoints = frame.detections().keypoints();
        for row in 0..frame.detections().len() {
            let record = boxes.row(row);
            self.draw_box(&mut canvas, record[0], record[1], record[2], record[3]);
            self.draw_label(
                &mut canvas,
                frame.class_name(record[5] as usize),
                record[4],
                record[0],
                record[1],
            );
            self.draw_skeleton(&mut canvas, keypoints.index_axis(Axis(0), row));
        }

        let (width, height) = canvas.dimensions();
        let new_width = (width as f32 * scale).round() as u32;
        let new_height = (height as f32 * scale).round() as u32;
        if (new_width, new_height) == (width, height) {
            return Ok(canvas);
        }
        resize(canvas, new_width, new_height)
    }

    fn draw_box(&self, canvas: &mut RgbImage, x1: f32, y1: f32, x2: f32, y2: f32) {
        let width = x2 - x1;
        let height = y2 - y1;
        // Degenerate boxes pass through the batch untouched; there is just
        // nothing to outline.
        if width < 1.0 || height < 1.0 {
            return;
        }
        let rect = Rect::at(x1 as i32, y1 as i32).of_size(width as u32, height as u32);
        draw_hollow_rect_mut(canvas, rect, BOX_COLOR);
        if width >= 3.0 && height >= 3.0 {
            let inner = Rect::at(x1 as i32 + 1, y1 as i32 + 1)
                .of_size(width as u32 - 2, height as u32 - 2);
            draw_hollow_rect_mut(canvas, inner, BOX_COLOR);
        }
    }

    fn draw_label(&self, canvas: &mut RgbImage, name: &str, confidence: f32, x: f32, y: f32) {
        let Some(font) = &self.font else {
            return;
        };
        let label = format!("{name} {confidence:.2}");
        let text_y = (y as i32 - LABEL_FONT_SIZE as i32 - 2).max(0);
        draw_text_mut(
            canvas,
            LABEL_COLOR,
            x as i32,
            text_y,
            self.font_scale,
            font,
            &label,
        );
    }

    fn draw_skeleton(&self, canvas: &mut RgbImage, joints: ArrayView2<'_, f32>) {
        for [a, b] in SKELETON {
            // Edges referencing joints beyond this batch's K are skipped.
            if a >= joints.nrows() || b >= joints.nrows() {
                continue;
            }
            let (start, end) = (joints.row(a), joints.row(b));
            if start[2] < VISIBILITY_THRESHOLD || end[2] < VISIBILITY_THRESHOLD {
                continue;
            }
            draw_line_segment_mut(
                canvas,
                (start[0], start[1]),
                (end[0], end[1]),
                LIMB_COLOR,
            );
        }
        // Joint markers sit on top of the limb lines.
        for joint in joints.outer_iter() {
            if joint[2] < VISIBILITY_THRESHOLD {
                continue;
            }
            draw_filled_circle_mut(
                canvas,
                (joint[0] as i32, joint[1] as i32),
                self.joint_radius,
                JOINT_COLOR,
            );
        }
    }
}

fn resize(canvas: RgbImage, new_width: u32, new_height: u32) -> Result<RgbImage, RenderError> {
    let (width, height) = canvas.dimensions();
    let src = Image::from_vec_u8(width, height, canvas.into_raw(), PixelType::U8x3)?;
    let mut dst = Image::new(new_width, new_height, PixelType::U8x3);
    let mut resizer = Resizer::new();
    resizer.resize(
        &src,
        &mut dst,
        &ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Lanczos3)),
    )?;
    Ok(RgbImage::from_raw(new_width, new_height, dst.into_vec()).unwrap())
}
