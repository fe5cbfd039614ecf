//! Capture orchestration state machine.
//!
//! [`CaptureOrchestrator`] is sans-IO: it consumes [`Event`]s one at a time
//! and answers each with a list of [`Action`]s (camera commands, timers,
//! status messages, overlay updates). The session runner executes the
//! actions and feeds their results back as events, which keeps every
//! transition on a single logical thread.

pub mod machine;
pub mod overlay;
pub mod state;

pub use machine::CaptureOrchestrator;
pub use overlay::GuideOverlay;
pub use state::{KeptImage, SessionOutcome, SessionState, SessionSummary, Stage};

use crate::camera::{CameraCommand, CameraCompletion};
use crate::timing::TimerKind;
use crate::types::{CommandId, FrameResult, ImageHandle, Viewport};
use std::time::Duration;

/// Inputs to the state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Start { participant: Option<String> },
    Stop { reason: String },
    Frame(FrameResult),
    Camera(CameraCompletion),
    /// Sharpness of the image produced by capture command `id`.
    Scored {
        id: CommandId,
        image: ImageHandle,
        score: f64,
    },
    TimerFired { timer: TimerKind, generation: u64 },
    ViewportChanged(Viewport),
    /// Camera provider lost or failed to initialise.
    CameraUnavailable { reason: String },
}

/// Side effects requested by the state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Camera(CameraCommand),
    StartTimer {
        timer: TimerKind,
        generation: u64,
        delay: Duration,
    },
    /// Load the image and report its sharpness as [`Event::Scored`].
    Score { id: CommandId, image: ImageHandle },
    Discard(ImageHandle),
    Status(String),
    Overlay(GuideOverlay),
    StageChanged { stage: Stage, generation: u64 },
    Finished(SessionSummary),
}
