//! Synthetic detector output and capture images
//!
//! Landmark sets shaped like a 468-point face mesh, plus images with known
//! Laplacian behaviour, so the capture pipeline can be exercised without a
//! camera or a face detector.

use crate::landmarks::{eye_indices, FACE_MESH_POINTS};
use crate::types::{Eye, FrameResult, NormalizedPoint};
use image::{Rgb, RgbImage};
use std::f32::consts::TAU;

/// Offset of each eye from the face center in normalized image units.
const EYE_OFFSET_X: f32 = 0.1;
const EYE_OFFSET_Y: f32 = -0.05;

/// A face whose geometry is fully controlled by the test.
///
/// Non-eye mesh points lie on an ellipse around `center`, so the face box is
/// exactly `center ± radius`. Eye contours are ellipses `eye_width` wide. The
/// subject's right eye sits on the image's left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyntheticFace {
    pub center: NormalizedPoint,
    pub radius_x: f32,
    pub radius_y: f32,
    pub eye_width: f32,
}

impl Default for SyntheticFace {
    fn default() -> Self {
        Self {
            center: NormalizedPoint::new(0.5, 0.5),
            radius_x: 0.2,
            radius_y: 0.28,
            eye_width: 0.08,
        }
    }
}

impl SyntheticFace {
    /// A face positioned so that `eye` sits exactly at the image center.
    pub fn centered_on(eye: Eye) -> Self {
        let offset = Self::eye_offset(eye);
        Self {
            center: NormalizedPoint::new(0.5 - offset.x, 0.5 - offset.y),
            ..Self::default()
        }
    }

    pub fn with_eye_width(mut self, eye_width: f32) -> Self {
        self.eye_width = eye_width;
        self
    }

    /// Move the whole face by (`dx`, `dy`) normalized units.
    pub fn shifted(mut self, dx: f32, dy: f32) -> Self {
        self.center.x += dx;
        self.center.y += dy;
        self
    }

    fn eye_offset(eye: Eye) -> NormalizedPoint {
        match eye {
            Eye::Right => NormalizedPoint::new(-EYE_OFFSET_X, EYE_OFFSET_Y),
            Eye::Left => NormalizedPoint::new(EYE_OFFSET_X, EYE_OFFSET_Y),
        }
    }

    pub fn eye_center(&self, eye: Eye) -> NormalizedPoint {
        let offset = Self::eye_offset(eye);
        NormalizedPoint::new(self.center.x + offset.x, self.center.y + offset.y)
    }

    /// Full 468-point mesh for this face.
    pub fn landmarks(&self) -> Vec<NormalizedPoint> {
        let mut points: Vec<NormalizedPoint> = (0..FACE_MESH_POINTS)
            .map(|i| {
                let angle = TAU * i as f32 / FACE_MESH_POINTS as f32;
                NormalizedPoint::new(
                    self.center.x + self.radius_x * angle.cos(),
                    self.center.y + self.radius_y * angle.sin(),
                )
            })
            .collect();

        for eye in [Eye::Right, Eye::Left] {
            let c = self.eye_center(eye);
            let indices = eye_indices(eye);
            for (k, &index) in indices.iter().enumerate() {
                let angle = TAU * k as f32 / indices.len() as f32;
                points[index] = NormalizedPoint::new(
                    c.x + self.eye_width / 2.0 * angle.cos(),
                    c.y + self.eye_width / 4.0 * angle.sin(),
                );
            }
        }
        points
    }

    /// A detector result containing just this face.
    pub fn frame(&self, image_width: u32, image_height: u32) -> FrameResult {
        FrameResult::new(vec![self.landmarks()], image_width, image_height)
    }
}

/// Detector result for a face with `eye` exactly centered.
pub fn synthetic_frame(eye: Eye, image_width: u32, image_height: u32) -> FrameResult {
    SyntheticFace::centered_on(eye).frame(image_width, image_height)
}

/// High-contrast checkerboard; scores far above any sensible threshold.
pub fn checkerboard(width: u32, height: u32, cell: u32) -> RgbImage {
    let cell = cell.max(1);
    RgbImage::from_fn(width, height, |x, y| {
        if (x / cell + y / cell) % 2 == 0 {
            Rgb([255, 255, 255])
        } else {
            Rgb([0, 0, 0])
        }
    })
}

/// Uniform image; its Laplacian is zero everywhere.
pub fn flat(width: u32, height: u32, value: u8) -> RgbImage {
    RgbImage::from_pixel(width, height, Rgb([value, value, value]))
}

/// Shallow horizontal ramp with no hard edges, standing in for a defocused shot.
pub fn soft_gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, _| {
        let v = 96u32.saturating_add(x / 16).min(255) as u8;
        Rgb([v, v, v])
    })
}
