use super::machine::{
    MSG_CAPTURE_FAILED, MSG_FOCUS_FAILED, MSG_METERING_FAILED, MSG_STOPPED, MSG_ZOOM_FAILED,
};
use crate::errors::CaptureError;
use crate::geometry::BoundingBox;
use crate::types::{Eye, ImageHandle};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Stages of the capture sequence. `Idle` is both initial and terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    Idle,
    AwaitingPreCaptureMetering,
    AwaitingCentering,
    AwaitingStability,
    ReadyToCapture,
    LockingFocus,
    Capturing,
    AwaitingRecenter,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Idle => "IDLE",
            Stage::AwaitingPreCaptureMetering => "AWAITING_PRE_CAPTURE_METERING",
            Stage::AwaitingCentering => "AWAITING_CENTERING",
            Stage::AwaitingStability => "AWAITING_STABILITY",
            Stage::ReadyToCapture => "READY_TO_CAPTURE",
            Stage::LockingFocus => "LOCKING_FOCUS",
            Stage::Capturing => "CAPTURING",
            Stage::AwaitingRecenter => "AWAITING_RECENTER",
        }
    }

    /// Stages in which live frames are dropped without inspection.
    pub fn pauses_detection(&self) -> bool {
        matches!(
            self,
            Stage::ReadyToCapture | Stage::LockingFocus | Stage::Capturing
        )
    }

    /// Centering stage to fall back to for `eye`.
    pub fn centering_for(eye: Eye) -> Self {
        match eye {
            Eye::Right => Stage::AwaitingCentering,
            Eye::Left => Stage::AwaitingRecenter,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A capture that passed the sharpness gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeptImage {
    pub eye: Eye,
    pub image: ImageHandle,
    pub score: f64,
}

/// Everything the orchestrator knows about the running session.
///
/// Reset wholesale when a session starts or ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub stage: Stage,
    pub eye: Eye,
    /// Sharp images kept for the current eye.
    pub captured: u32,
    /// Face box the stability check compares against.
    pub reference_box: Option<BoundingBox>,
    pub detection_paused: bool,
    pub last_status: Option<String>,
    pub session_id: Option<Uuid>,
    pub participant: String,
    pub started_at: Option<DateTime<Utc>>,
    /// Shutter releases, including retakes.
    pub attempts: u32,
    pub discarded: u32,
    pub kept: Vec<KeptImage>,
}

impl SessionState {
    pub fn new(participant: impl Into<String>) -> Self {
        Self {
            stage: Stage::Idle,
            eye: Eye::Right,
            captured: 0,
            reference_box: None,
            detection_paused: false,
            last_status: None,
            session_id: None,
            participant: participant.into(),
            started_at: None,
            attempts: 0,
            discarded: 0,
            kept: Vec::new(),
        }
    }

    /// Record `message` as emitted; false when it repeats the previous one.
    pub fn should_emit(&mut self, message: &str) -> bool {
        if self.last_status.as_deref() == Some(message) {
            return false;
        }
        self.last_status = Some(message.to_string());
        true
    }

    pub fn kept_for(&self, eye: Eye) -> impl Iterator<Item = &KeptImage> {
        self.kept.iter().filter(move |k| k.eye == eye)
    }
}

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SessionOutcome {
    Completed,
    Aborted { reason: String },
}

/// Report emitted when a session returns to idle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: Option<Uuid>,
    pub participant: String,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: DateTime<Utc>,
    #[serde(flatten)]
    pub outcome: SessionOutcome,
    pub kept: Vec<KeptImage>,
    pub attempts: u32,
    pub discarded: u32,
}

impl SessionSummary {
    pub fn from_state(state: &SessionState, outcome: SessionOutcome) -> Self {
        Self {
            session_id: state.session_id,
            participant: state.participant.clone(),
            started_at: state.started_at,
            finished_at: Utc::now(),
            outcome,
            kept: state.kept.clone(),
            attempts: state.attempts,
            discarded: state.discarded,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self.outcome, SessionOutcome::Completed)
    }

    /// The error behind an abort. An operator stop is not a failure.
    pub fn failure(&self) -> Option<CaptureError> {
        let SessionOutcome::Aborted { reason } = &self.outcome else {
            return None;
        };
        match reason.as_str() {
            MSG_STOPPED => None,
            MSG_FOCUS_FAILED => Some(CaptureError::FocusFailed(reason.clone())),
            MSG_METERING_FAILED | MSG_ZOOM_FAILED | MSG_CAPTURE_FAILED => {
                Some(CaptureError::CameraCommandFailed(reason.clone()))
            }
            _ => Some(CaptureError::InitializationError(reason.clone())),
        }
    }
}
