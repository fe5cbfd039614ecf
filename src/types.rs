//! Shared value types passed between the detector, the camera adapter and
//! the capture orchestrator.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which eye is being photographed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Eye {
    Right,
    Left,
}

impl Eye {
    /// Lowercase name used inside operator prompts ("right eye").
    pub fn as_str(&self) -> &'static str {
        match self {
            Eye::Right => "right",
            Eye::Left => "left",
        }
    }

    /// Capitalized name used in progress messages and file names.
    pub fn title(&self) -> &'static str {
        match self {
            Eye::Right => "Right",
            Eye::Left => "Left",
        }
    }
}

impl fmt::Display for Eye {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A landmark position normalized to the detector input image (0.0..=1.0).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NormalizedPoint {
    pub x: f32,
    pub y: f32,
}

impl NormalizedPoint {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// A point in view (preview widget) pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ViewPoint {
    pub x: f32,
    pub y: f32,
}

/// One detector result: landmarks for every detected face plus the size of
/// the image the detector ran on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameResult {
    pub faces: Vec<Vec<NormalizedPoint>>,
    pub image_width: u32,
    pub image_height: u32,
}

impl FrameResult {
    pub fn new(faces: Vec<Vec<NormalizedPoint>>, image_width: u32, image_height: u32) -> Self {
        Self {
            faces,
            image_width,
            image_height,
        }
    }

    /// A frame in which nothing was detected.
    pub fn empty(image_width: u32, image_height: u32) -> Self {
        Self::new(Vec::new(), image_width, image_height)
    }

    /// Landmarks of the first detected face, if any.
    pub fn first_face(&self) -> Option<&[NormalizedPoint]> {
        self.faces.first().map(Vec::as_slice).filter(|f| !f.is_empty())
    }
}

/// Size of the on-screen preview the overlays and targeting math refer to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn center(&self) -> ViewPoint {
        ViewPoint {
            x: self.width / 2.0,
            y: self.height / 2.0,
        }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1080.0, 1920.0)
    }
}

/// Opaque reference to a captured image held by an [`crate::store::ImageStore`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageHandle(pub String);

impl ImageHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Sequence number tagging a camera command and its completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CommandId(pub u64);

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cmd#{}", self.0)
    }
}
