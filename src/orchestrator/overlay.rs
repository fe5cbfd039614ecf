use crate::geometry::ViewRect;
use crate::types::Eye;
use serde::{Deserialize, Serialize};

/// What the preview overlay should draw. Rendering itself lives in the UI.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GuideOverlay {
    /// Eye whose landmark box is highlighted.
    pub target_eye: Option<Eye>,
    /// Crosshair at the view center.
    pub show_centering_guide: bool,
    /// Box the operator aligns the zoomed eye with.
    pub alignment_box: Option<ViewRect>,
}

impl GuideOverlay {
    pub fn centering(eye: Eye) -> Self {
        Self {
            target_eye: Some(eye),
            show_centering_guide: true,
            alignment_box: None,
        }
    }

    pub fn alignment(rect: ViewRect) -> Self {
        Self {
            target_eye: None,
            show_centering_guide: false,
            alignment_box: Some(rect),
        }
    }

    pub fn is_clear(&self) -> bool {
        *self == Self::default()
    }
}
