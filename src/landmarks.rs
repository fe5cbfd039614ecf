//! Face-mesh landmark index sets and the per-frame boxes the orchestrator needs.

use crate::geometry::{bounding_box, bounding_box_all, BoundingBox};
use crate::types::{Eye, FrameResult};

/// Contour of the subject's right eye in the 468-point face mesh.
pub const RIGHT_EYE_LANDMARKS: [usize; 16] = [
    33, 7, 163, 144, 145, 153, 154, 155, 133, 173, 157, 158, 159, 160, 161, 246,
];

/// Contour of the subject's left eye in the 468-point face mesh.
pub const LEFT_EYE_LANDMARKS: [usize; 16] = [
    263, 249, 390, 373, 374, 380, 381, 382, 362, 398, 384, 385, 386, 387, 388, 466,
];

/// Number of points the detector emits per face.
pub const FACE_MESH_POINTS: usize = 468;

pub fn eye_indices(eye: Eye) -> &'static [usize] {
    match eye {
        Eye::Right => &RIGHT_EYE_LANDMARKS,
        Eye::Left => &LEFT_EYE_LANDMARKS,
    }
}

/// Face and target-eye boxes of the first face in a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameBoxes {
    pub face: BoundingBox,
    pub eye: BoundingBox,
}

/// Extract the boxes for `eye`; `None` means a detection dropout for this frame.
pub fn frame_boxes(frame: &FrameResult, eye: Eye) -> Option<FrameBoxes> {
    let face = frame.first_face()?;
    Some(FrameBoxes {
        face: bounding_box_all(face)?,
        eye: bounding_box(face, eye_indices(eye))?,
    })
}
