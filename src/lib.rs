//! eyecapture: landmark-guided two-eye photographic capture
//!
//! Drives a camera through a guided sequence for each eye of a participant:
//! meter exposure on the face, wait for the eye to be centered and held
//! steady, zoom in, lock focus, then capture a series of photos, retaking
//! any that fail a Laplacian sharpness check.
//!
//! # Layout
//! - [`orchestrator`]: the sans-IO capture state machine
//! - [`session`]: tokio runner that executes the machine's actions
//! - [`camera`] / [`store`]: seams for the camera pipeline and saved images
//! - [`quality`]: sharpness scoring
//! - [`geometry`] / [`landmarks`]: boxes and view-space projection
//!
//! # Usage
//! ```rust,ignore
//! use eyecapture::{CaptureSession, EyeCaptureConfig};
//!
//! let (handle, mut updates) =
//!     CaptureSession::new(EyeCaptureConfig::load_or_default()).spawn(camera, completions, store);
//! handle.start_for("P042")?;
//! while let Some(update) = updates.recv().await {
//!     println!("{:?}", update);
//! }
//! ```
pub mod camera;
pub mod config;
pub mod errors;
pub mod geometry;
pub mod invariants;
pub mod landmarks;
pub mod orchestrator;
pub mod quality;
pub mod session;
pub mod store;
pub mod timing;
pub mod types;

// Testing utilities - synthetic landmarks, images and a simulated camera
pub mod testing;

// Re-exports for convenience
pub use camera::{CameraCommand, CameraCompletion, CameraDevice, CameraOp, CompletionOutcome};
pub use config::{CaptureParameters, EyeCaptureConfig};
pub use errors::CaptureError;
pub use orchestrator::{Action, CaptureOrchestrator, Event, SessionSummary, Stage};
pub use quality::{laplacian_sharpness, SharpnessEvaluator};
pub use session::{CaptureSession, SessionHandle, SessionUpdate};
pub use store::{DiskImageStore, ImageStore, MemoryImageStore};
pub use types::{Eye, FrameResult, ImageHandle, NormalizedPoint, Viewport};

/// Initialize logging for the capture system
pub fn init_logging() {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "eyecapture=info");
    }
    let _ = env_logger::try_init();
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Get crate information
pub fn get_info() -> CrateInfo {
    CrateInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: DESCRIPTION.to_string(),
    }
}

/// Crate information structure
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CrateInfo {
    pub name: String,
    pub version: String,
    pub description: String,
}
