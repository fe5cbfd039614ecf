//! Camera device seam.
//!
//! The live camera pipeline is an external collaborator. The orchestrator
//! talks to it only through tagged, non-blocking commands; a device answers
//! every tracked command exactly once on the [`CompletionSender`] it was
//! built with, echoing the command's [`CommandId`].

use crate::types::{CommandId, ImageHandle, ViewPoint};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;

/// Which 3A routines a metering request engages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MeteringFlags {
    pub auto_focus: bool,
    pub auto_exposure: bool,
    pub auto_white_balance: bool,
}

impl MeteringFlags {
    pub const AF: Self = Self {
        auto_focus: true,
        auto_exposure: false,
        auto_white_balance: false,
    };

    pub const AE_AWB: Self = Self {
        auto_focus: false,
        auto_exposure: true,
        auto_white_balance: true,
    };
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeteringRequest {
    pub point: ViewPoint,
    pub flags: MeteringFlags,
    pub auto_cancel: Duration,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CameraOp {
    MeterAndFocus(MeteringRequest),
    SetZoom { ratio: f32 },
    /// Lock or release auto-exposure, and auto-white-balance along with it
    /// when `white_balance` is set.
    LockExposureWhiteBalance { locked: bool, white_balance: bool },
    CancelFocusAndMetering,
    Capture { file_name: String },
}

/// Resource class a command occupies while in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandKind {
    Metering,
    Zoom,
    ExposureLock,
    Cancel,
    Capture,
}

impl CameraOp {
    pub fn kind(&self) -> CommandKind {
        match self {
            CameraOp::MeterAndFocus(_) => CommandKind::Metering,
            CameraOp::SetZoom { .. } => CommandKind::Zoom,
            CameraOp::LockExposureWhiteBalance { .. } => CommandKind::ExposureLock,
            CameraOp::CancelFocusAndMetering => CommandKind::Cancel,
            CameraOp::Capture { .. } => CommandKind::Capture,
        }
    }

    /// Whether the device reports a completion for this op.
    pub fn expects_completion(&self) -> bool {
        matches!(
            self,
            CameraOp::MeterAndFocus(_) | CameraOp::SetZoom { .. } | CameraOp::Capture { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraCommand {
    pub id: CommandId,
    pub op: CameraOp,
}

/// Successful result of a tracked command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CompletionOutcome {
    Metered { focus_locked: bool },
    Zoomed { ratio: f32 },
    Captured(ImageHandle),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraCompletion {
    pub id: CommandId,
    pub result: Result<CompletionOutcome, String>,
}

impl CameraCompletion {
    pub fn ok(id: CommandId, outcome: CompletionOutcome) -> Self {
        Self {
            id,
            result: Ok(outcome),
        }
    }

    pub fn failed(id: CommandId, reason: impl Into<String>) -> Self {
        Self {
            id,
            result: Err(reason.into()),
        }
    }
}

pub type CompletionSender = mpsc::UnboundedSender<CameraCompletion>;
pub type CompletionReceiver = mpsc::UnboundedReceiver<CameraCompletion>;

/// Channel a device reports completions on.
pub fn completion_channel() -> (CompletionSender, CompletionReceiver) {
    mpsc::unbounded_channel()
}

/// Static device limits the orchestrator plans against.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraCapabilities {
    pub max_zoom_ratio: f32,
    /// Whether auto-white-balance can be locked alongside exposure.
    pub white_balance_lock: bool,
}

impl Default for CameraCapabilities {
    fn default() -> Self {
        Self {
            max_zoom_ratio: 1.0,
            white_balance_lock: true,
        }
    }
}

/// A singly-owned camera. `submit` must not block.
pub trait CameraDevice: Send {
    fn capabilities(&self) -> CameraCapabilities;

    fn submit(&mut self, command: CameraCommand);
}

impl<T: CameraDevice + ?Sized> CameraDevice for Box<T> {
    fn capabilities(&self) -> CameraCapabilities {
        (**self).capabilities()
    }

    fn submit(&mut self, command: CameraCommand) {
        (**self).submit(command)
    }
}
