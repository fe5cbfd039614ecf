//! Shared helpers for driving the orchestrator step by step.
#![allow(dead_code)]

use eyecapture::camera::{CameraCommand, CameraCompletion, CameraOp, CompletionOutcome};
use eyecapture::config::CaptureParameters;
use eyecapture::orchestrator::{Action, CaptureOrchestrator, Event, SessionSummary, Stage};
use eyecapture::testing::SyntheticFace;
use eyecapture::timing::TimerKind;
use eyecapture::types::{CommandId, Eye, ImageHandle, Viewport};

/// Square view and square detector input, so Cover projection is the identity
/// scaled by 1000.
pub const VIEW: f32 = 1000.0;
pub const FRAME: u32 = 1000;

pub fn orchestrator(params: CaptureParameters) -> CaptureOrchestrator {
    CaptureOrchestrator::new(params, Viewport::new(VIEW, VIEW), 10.0, "participant")
}

/// The tracked camera command issued in `actions`, if any.
pub fn tracked(actions: &[Action]) -> Option<CameraCommand> {
    actions.iter().rev().find_map(|a| match a {
        Action::Camera(c) if c.op.expects_completion() => Some(c.clone()),
        _ => None,
    })
}

pub fn camera_ops(actions: &[Action]) -> Vec<CameraOp> {
    actions
        .iter()
        .filter_map(|a| match a {
            Action::Camera(c) => Some(c.op.clone()),
            _ => None,
        })
        .collect()
}

/// Generation of the `kind` timer started in `actions`.
pub fn timer(actions: &[Action], kind: TimerKind) -> Option<u64> {
    actions.iter().find_map(|a| match a {
        Action::StartTimer {
            timer, generation, ..
        } if *timer == kind => Some(*generation),
        _ => None,
    })
}

pub fn statuses(actions: &[Action]) -> Vec<String> {
    actions
        .iter()
        .filter_map(|a| match a {
            Action::Status(s) => Some(s.clone()),
            _ => None,
        })
        .collect()
}

pub fn stages(actions: &[Action]) -> Vec<Stage> {
    actions
        .iter()
        .filter_map(|a| match a {
            Action::StageChanged { stage, .. } => Some(*stage),
            _ => None,
        })
        .collect()
}

pub fn finished(actions: &[Action]) -> Option<SessionSummary> {
    actions.iter().find_map(|a| match a {
        Action::Finished(s) => Some(s.clone()),
        _ => None,
    })
}

pub fn score_request(actions: &[Action]) -> Option<(CommandId, ImageHandle)> {
    actions.iter().find_map(|a| match a {
        Action::Score { id, image } => Some((*id, image.clone())),
        _ => None,
    })
}

/// Feeds events to an orchestrator and plays the part of a cooperative camera.
pub struct Driver {
    pub o: CaptureOrchestrator,
    pub log: Vec<Action>,
}

impl Driver {
    pub fn new(params: CaptureParameters) -> Self {
        Self {
            o: orchestrator(params),
            log: Vec::new(),
        }
    }

    pub fn send(&mut self, event: Event) -> Vec<Action> {
        let actions = self.o.handle(event);
        self.log.extend(actions.iter().cloned());
        actions
    }

    pub fn start(&mut self, participant: &str) -> Vec<Action> {
        self.send(Event::Start {
            participant: Some(participant.to_string()),
        })
    }

    pub fn frame(&mut self, face: SyntheticFace) -> Vec<Action> {
        self.send(Event::Frame(face.frame(FRAME, FRAME)))
    }

    pub fn centered(&mut self, eye: Eye) -> Vec<Action> {
        self.frame(SyntheticFace::centered_on(eye))
    }

    pub fn complete(&mut self, actions: &[Action], outcome: CompletionOutcome) -> Vec<Action> {
        let cmd = tracked(actions).expect("no tracked command in actions");
        self.send(Event::Camera(CameraCompletion::ok(cmd.id, outcome)))
    }

    pub fn fail(&mut self, actions: &[Action], reason: &str) -> Vec<Action> {
        let cmd = tracked(actions).expect("no tracked command in actions");
        self.send(Event::Camera(CameraCompletion::failed(cmd.id, reason)))
    }

    /// Complete the tracked command in `actions` successfully.
    pub fn ack(&mut self, actions: &[Action]) -> Vec<Action> {
        let cmd = tracked(actions).expect("no tracked command in actions");
        let outcome = match cmd.op {
            CameraOp::MeterAndFocus(_) => CompletionOutcome::Metered { focus_locked: true },
            CameraOp::SetZoom { ratio } => CompletionOutcome::Zoomed { ratio },
            CameraOp::Capture { file_name } => CompletionOutcome::Captured(ImageHandle::new(file_name)),
            other => panic!("{:?} is not tracked", other),
        };
        self.send(Event::Camera(CameraCompletion::ok(cmd.id, outcome)))
    }

    pub fn fire(&mut self, actions: &[Action], kind: TimerKind) -> Vec<Action> {
        let generation = timer(actions, kind).unwrap_or_else(|| panic!("no {:?} timer", kind));
        self.send(Event::TimerFired {
            timer: kind,
            generation,
        })
    }

    /// From a centering stage with nothing in flight to the first capture command.
    pub fn centering_to_capture(&mut self, eye: Eye) -> Vec<Action> {
        let a = self.centered(eye);
        let a = self.fire(&a, TimerKind::StabilityConfirm);
        let a = self.ack(&a);
        let a = self.fire(&a, TimerKind::FocusConfirm);
        self.ack(&a)
    }

    /// From idle to the first right-eye capture command.
    pub fn to_first_capture(&mut self, participant: &str) -> Vec<Action> {
        self.start(participant);
        let a = self.centered(Eye::Right);
        self.ack(&a);
        self.centering_to_capture(Eye::Right)
    }

    /// Complete the capture in `actions`, score it, then fire the inter-shot
    /// timer. Returns what the timer produced.
    pub fn shoot(&mut self, actions: &[Action], score: f64) -> Vec<Action> {
        let a = self.ack(actions);
        let (id, image) = score_request(&a).expect("capture was not sent for scoring");
        let a = self.send(Event::Scored { id, image, score });
        self.fire(&a, TimerKind::InterShot)
    }

    pub fn capture_names(&self) -> Vec<String> {
        camera_ops(&self.log)
            .into_iter()
            .filter_map(|op| match op {
                CameraOp::Capture { file_name } => Some(file_name),
                _ => None,
            })
            .collect()
    }
}
