/// Capture quality gating
///
/// Scores saved images with a discrete Laplacian edge response so the
/// capture loop can keep sharp shots and retake blurry ones.
pub mod sharpness;

pub use sharpness::{laplacian_sharpness, SharpnessEvaluator, SharpnessVerdict};
