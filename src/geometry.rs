//! Bounding boxes over landmark subsets and the detector-to-view projection.
//!
//! Two scaling policies exist and they are not interchangeable:
//! [`FitMode::Contain`] letterboxes a finished still into the view, while
//! [`FitMode::Cover`] fills the viewport the way the live preview does.
//! Targeting math for the live stream must always use `Cover`, otherwise
//! every overlay and centering decision is offset.

use crate::types::{NormalizedPoint, ViewPoint, Viewport};
use serde::{Deserialize, Serialize};

/// Axis-aligned box in normalized detector coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl BoundingBox {
    pub fn center_x(&self) -> f32 {
        (self.min_x + self.max_x) / 2.0
    }

    pub fn center_y(&self) -> f32 {
        (self.min_y + self.max_y) / 2.0
    }

    pub fn center(&self) -> NormalizedPoint {
        NormalizedPoint::new(self.center_x(), self.center_y())
    }

    pub fn width(&self) -> f32 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f32 {
        self.max_y - self.min_y
    }
}

/// Fold min/max over the landmarks selected by `indices`.
///
/// Indices past the end of `landmarks` are skipped. Returns `None` when no
/// landmark was selected.
pub fn bounding_box(landmarks: &[NormalizedPoint], indices: &[usize]) -> Option<BoundingBox> {
    indices
        .iter()
        .filter_map(|&i| landmarks.get(i))
        .fold(None, |acc: Option<BoundingBox>, p| {
            Some(match acc {
                None => BoundingBox {
                    min_x: p.x,
                    min_y: p.y,
                    max_x: p.x,
                    max_y: p.y,
                },
                Some(b) => BoundingBox {
                    min_x: b.min_x.min(p.x),
                    min_y: b.min_y.min(p.y),
                    max_x: b.max_x.max(p.x),
                    max_y: b.max_y.max(p.y),
                },
            })
        })
}

/// Bounding box over every landmark of a face.
pub fn bounding_box_all(landmarks: &[NormalizedPoint]) -> Option<BoundingBox> {
    let indices: Vec<usize> = (0..landmarks.len()).collect();
    bounding_box(landmarks, &indices)
}

/// How a source image is scaled into the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitMode {
    /// Uniform scale so the whole source fits (still results).
    Contain,
    /// Uniform scale so the source fills the view (live preview).
    Cover,
}

/// Uniform scale + centering offset mapping normalized source points into view space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    pub scale: f32,
    pub offset_x: f32,
    pub offset_y: f32,
    source_width: f32,
    source_height: f32,
}

impl ViewTransform {
    pub fn new(
        source_width: u32,
        source_height: u32,
        view_width: f32,
        view_height: f32,
        mode: FitMode,
    ) -> Self {
        let sw = source_width.max(1) as f32;
        let sh = source_height.max(1) as f32;
        let sx = view_width / sw;
        let sy = view_height / sh;
        let scale = match mode {
            FitMode::Contain => sx.min(sy),
            FitMode::Cover => sx.max(sy),
        };

        Self {
            scale,
            offset_x: (view_width - sw * scale) / 2.0,
            offset_y: (view_height - sh * scale) / 2.0,
            source_width: sw,
            source_height: sh,
        }
    }

    /// Convenience constructor for a [`Viewport`].
    pub fn for_viewport(source_width: u32, source_height: u32, view: Viewport, mode: FitMode) -> Self {
        Self::new(source_width, source_height, view.width, view.height, mode)
    }

    pub fn project(&self, p: NormalizedPoint) -> ViewPoint {
        ViewPoint {
            x: p.x * self.source_width * self.scale + self.offset_x,
            y: p.y * self.source_height * self.scale + self.offset_y,
        }
    }

    pub fn project_box(&self, b: &BoundingBox) -> ViewRect {
        let tl = self.project(NormalizedPoint::new(b.min_x, b.min_y));
        let br = self.project(NormalizedPoint::new(b.max_x, b.max_y));
        ViewRect {
            left: tl.x,
            top: tl.y,
            right: br.x,
            bottom: br.y,
        }
    }
}

/// Project a single normalized point (free-function form).
pub fn project(
    point: NormalizedPoint,
    source_width: u32,
    source_height: u32,
    view_width: f32,
    view_height: f32,
    mode: FitMode,
) -> ViewPoint {
    ViewTransform::new(source_width, source_height, view_width, view_height, mode).project(point)
}

/// Rectangle in view pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewRect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl ViewRect {
    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }
}

/// Centered square whose side is `fraction` of the shorter view dimension.
pub fn alignment_box(view: Viewport, fraction: f32) -> ViewRect {
    let side = view.width.min(view.height) * fraction;
    let left = (view.width - side) / 2.0;
    let top = (view.height - side) / 2.0;
    ViewRect {
        left,
        top,
        right: left + side,
        bottom: top + side,
    }
}
