//! Testing utilities for eyecapture
//!
//! Synthetic landmarks, images with known sharpness, and a simulated camera
//! for exercising the capture sequence without hardware.

pub mod sim_camera;
pub mod synthetic_data;

pub use sim_camera::{CommandLog, SimulatedCamera, SimulatedCameraConfig};
pub use synthetic_data::{
    checkerboard, flat, soft_gradient, synthetic_frame, SyntheticFace,
};
