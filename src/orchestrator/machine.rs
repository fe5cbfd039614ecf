use super::overlay::GuideOverlay;
use super::state::{KeptImage, SessionOutcome, SessionState, SessionSummary, Stage};
use super::{Action, Event};
use crate::camera::{
    CameraCommand, CameraCompletion, CameraOp, CommandKind, CompletionOutcome, MeteringFlags,
    MeteringRequest,
};
use crate::check_invariant;
use crate::config::CaptureParameters;
use crate::geometry::{alignment_box, BoundingBox, FitMode, ViewTransform};
use crate::invariants::{CAMERA_RESTORED_ON_IDLE, CURRENT_GENERATION_ONLY, ONE_OUTSTANDING_COMMAND};
use crate::landmarks::frame_boxes;
use crate::quality::SharpnessEvaluator;
use crate::timing::TimerKind;
use crate::types::{CommandId, Eye, FrameResult, ImageHandle, ViewPoint, Viewport};
use chrono::Utc;
use uuid::Uuid;

pub const MSG_PREPARING: &str = "Preparing camera...";
pub const MSG_CAMERA_READY: &str = "Camera ready. Please align your right eye.";
pub const MSG_EYE_CENTERED: &str = "Eye centered. Hold steady.";
pub const MSG_MOVEMENT: &str = "Movement detected. Please re-center and hold steady.";
pub const MSG_ALIGN_BOX: &str = "Align your eye with the box.";
pub const MSG_FOCUS_LOCKED: &str = "Focus locked. Capturing...";
pub const MSG_RIGHT_DONE: &str = "Right eye done. Please align your left eye with the crosshair.";
pub const MSG_ALL_DONE: &str = "All captures finished.";
pub const MSG_STOPPED: &str = "Capture stopped.";
pub const MSG_FOCUS_FAILED: &str = "Focus failed. Please try again.";
pub const MSG_METERING_FAILED: &str = "Metering failed. Please try again.";
pub const MSG_ZOOM_FAILED: &str = "Zoom failed. Please try again.";
pub const MSG_CAPTURE_FAILED: &str = "Photo capture failed.";

fn align_prompt(eye: Eye) -> String {
    format!("Please align your {} eye with the crosshair.", eye.as_str())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Outstanding {
    id: CommandId,
    kind: CommandKind,
    /// Issued while tearing a session down; its result belongs to no session.
    cleanup: bool,
}

/// The capture state machine. See the module docs for the event/action model.
#[derive(Debug)]
pub struct CaptureOrchestrator {
    params: CaptureParameters,
    sharpness: SharpnessEvaluator,
    viewport: Viewport,
    max_zoom_ratio: f32,
    white_balance_lock: bool,
    default_participant: String,
    state: SessionState,
    /// Bumped on every stage change; deferred events carry it.
    generation: u64,
    next_command: u64,
    outstanding: Option<Outstanding>,
    awaiting_score: Option<CommandId>,
    last_eye_box: Option<BoundingBox>,
    overlay: GuideOverlay,
    actions: Vec<Action>,
}

impl CaptureOrchestrator {
    pub fn new(
        params: CaptureParameters,
        viewport: Viewport,
        max_zoom_ratio: f32,
        default_participant: impl Into<String>,
    ) -> Self {
        let default_participant = default_participant.into();
        Self {
            sharpness: SharpnessEvaluator::new(params.min_sharpness),
            params,
            viewport,
            max_zoom_ratio: max_zoom_ratio.max(1.0),
            white_balance_lock: true,
            state: SessionState::new(default_participant.clone()),
            default_participant,
            generation: 0,
            next_command: 1,
            outstanding: None,
            awaiting_score: None,
            last_eye_box: None,
            overlay: GuideOverlay::default(),
            actions: Vec::new(),
        }
    }

    /// Lock exposure only, leaving white balance automatic, on devices that
    /// cannot lock it.
    pub fn with_white_balance_lock(mut self, supported: bool) -> Self {
        self.white_balance_lock = supported;
        self
    }

    pub fn stage(&self) -> Stage {
        self.state.stage
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn params(&self) -> &CaptureParameters {
        &self.params
    }

    pub fn overlay(&self) -> GuideOverlay {
        self.overlay
    }

    /// Whether a tracked camera command is awaiting its completion.
    pub fn has_outstanding_command(&self) -> bool {
        self.outstanding.is_some()
    }

    /// Process one event and return the side effects it produced.
    pub fn handle(&mut self, event: Event) -> Vec<Action> {
        match event {
            Event::Start { participant } => self.on_start(participant),
            Event::Stop { reason } => self.abort(&reason),
            Event::Frame(frame) => self.on_frame(&frame),
            Event::Camera(completion) => self.on_completion(completion),
            Event::Scored { id, image, score } => self.on_scored(id, image, score),
            Event::TimerFired { timer, generation } => self.on_timer(timer, generation),
            Event::ViewportChanged(viewport) => {
                log::debug!("Viewport now {}x{}", viewport.width, viewport.height);
                self.viewport = viewport;
            }
            Event::CameraUnavailable { reason } => {
                log::error!("Camera unavailable: {}", reason);
                if self.state.stage == Stage::Idle {
                    self.status(&reason);
                } else {
                    self.abort(&reason);
                }
            }
        }
        std::mem::take(&mut self.actions)
    }


    fn on_start(&mut self, participant: Option<String>) {
        if self.state.stage != Stage::Idle {
            log::warn!("Start ignored: session already in {}", self.state.stage);
            return;
        }

        let participant = participant.unwrap_or_else(|| self.default_participant.clone());
        self.state = SessionState::new(participant);
        self.state.session_id = Some(Uuid::new_v4());
        self.state.started_at = Some(Utc::now());
        self.last_eye_box = None;

        log::info!(
            "Starting capture session {:?} for {}",
            self.state.session_id,
            self.state.participant
        );
        self.set_stage(Stage::AwaitingPreCaptureMetering);
        self.status(MSG_PREPARING);
    }

    fn abort(&mut self, reason: &str) {
        if self.state.stage == Stage::Idle {
            log::debug!("Stop ignored while idle");
            return;
        }
        log::warn!("Aborting capture in {}: {}", self.state.stage, reason);
        self.end_session(
            SessionOutcome::Aborted {
                reason: reason.to_string(),
            },
            reason,
        );
    }

    fn finish(&mut self) {
        log::info!(
            "Capture session complete: {} kept, {} retakes",
            self.state.kept.len(),
            self.state.discarded
        );
        self.end_session(SessionOutcome::Completed, MSG_ALL_DONE);
    }

    fn end_session(&mut self, outcome: SessionOutcome, message: &str) {
        let summary = SessionSummary::from_state(&self.state, outcome);

        // Anything still in flight belongs to the session being torn down.
        self.outstanding = None;
        self.awaiting_score = None;
        self.restore_camera();

        let participant = self.state.participant.clone();
        self.state = SessionState::new(participant);
        self.last_eye_box = None;
        self.set_overlay(GuideOverlay::default());
        self.set_stage(Stage::Idle);
        self.status(message);
        self.actions.push(Action::Finished(summary));
    }

    fn restore_camera(&mut self) {
        self.issue_untracked(CameraOp::CancelFocusAndMetering);
        self.issue_untracked(CameraOp::LockExposureWhiteBalance {
            locked: false,
            white_balance: self.white_balance_lock,
        });
        self.issue(CameraOp::SetZoom { ratio: 1.0 }, true);
        check_invariant!(
            matches!(self.outstanding, Some(Outstanding { kind: CommandKind::Zoom, .. })),
            CAMERA_RESTORED_ON_IDLE,
            "restore_camera"
        );
    }


    fn on_frame(&mut self, frame: &FrameResult) {
        if self.state.stage == Stage::Idle || self.state.detection_paused {
            return;
        }

        let Some(boxes) = frame_boxes(frame, self.state.eye) else {
            log::trace!("No face in frame; staying in {}", self.state.stage);
            return;
        };
        self.last_eye_box = Some(boxes.eye);

        if let Some(pending) = self.outstanding {
            log::trace!("Frame skipped while {} ({:?}) is in flight", pending.id, pending.kind);
            return;
        }

        let transform = ViewTransform::for_viewport(
            frame.image_width,
            frame.image_height,
            self.viewport,
            FitMode::Cover,
        );

        match self.state.stage {
            Stage::AwaitingPreCaptureMetering => {
                let point = transform.project(boxes.face.center());
                log::debug!("Metering exposure at ({:.1}, {:.1})", point.x, point.y);
                self.issue_tracked(CameraOp::MeterAndFocus(MeteringRequest {
                    point,
                    flags: MeteringFlags::AE_AWB,
                    auto_cancel: self.params.metering_auto_cancel(),
                }));
            }
            Stage::AwaitingCentering | Stage::AwaitingRecenter => {
                self.set_overlay(GuideOverlay::centering(self.state.eye));
                let eye_center = transform.project(boxes.eye.center());
                if self.is_centered(eye_center) {
                    self.state.reference_box = Some(boxes.face);
                    self.set_stage(Stage::AwaitingStability);
                    self.status(MSG_EYE_CENTERED);
                    self.start_timer(TimerKind::StabilityConfirm, self.params.stability_delay());
                } else {
                    self.status(&align_prompt(self.state.eye));
                }
            }
            Stage::AwaitingStability => {
                let moved = self
                    .state
                    .reference_box
                    .map(|r| (boxes.face.center_x() - r.center_x()).abs() > self.params.stability_threshold)
                    .unwrap_or(false);
                if moved {
                    log::debug!("Face moved; back to centering");
                    self.state.reference_box = None;
                    self.set_stage(Stage::centering_for(self.state.eye));
                    self.set_overlay(GuideOverlay::centering(self.state.eye));
                    self.status(MSG_MOVEMENT);
                } else {
                    self.state.reference_box = Some(boxes.face);
                }
            }
            _ => {}
        }
    }

    /// Per-axis distance of `eye_center` from the view center against the
    /// centering threshold scaled by that axis' view dimension.
    fn is_centered(&self, eye_center: ViewPoint) -> bool {
        let c = self.viewport.center();
        let dx = (eye_center.x - c.x).abs();
        let dy = (eye_center.y - c.y).abs();
        dx < self.params.center_threshold * self.viewport.width
            && dy < self.params.center_threshold * self.viewport.height
    }


    fn on_timer(&mut self, timer: TimerKind, generation: u64) {
        if generation != self.generation {
            log::debug!(
                "Stale {:?} timer (generation {} != {}) ignored",
                timer,
                generation,
                self.generation
            );
            return;
        }
        check_invariant!(generation == self.generation, CURRENT_GENERATION_ONLY, "on_timer");

        match (timer, self.state.stage) {
            (TimerKind::StabilityConfirm, Stage::AwaitingStability) => self.enter_ready_to_capture(),
            (TimerKind::FocusConfirm, Stage::ReadyToCapture) => self.enter_locking_focus(),
            (TimerKind::InterShot, Stage::Capturing) => self.next_shot(),
            (timer, stage) => log::debug!("{:?} timer has nothing to do in {}", timer, stage),
        }
    }

    fn enter_ready_to_capture(&mut self) {
        self.set_stage(Stage::ReadyToCapture);
        self.set_overlay(GuideOverlay::default());

        let ratio = self.zoom_ratio_for(self.last_eye_box);
        log::info!("Eye stable; zooming to {:.2}x", ratio);
        self.issue_tracked(CameraOp::SetZoom { ratio });
    }

    /// Zoom that makes the eye span `target_eye_fraction` of the view width.
    fn zoom_ratio_for(&self, eye: Option<BoundingBox>) -> f32 {
        let Some(eye) = eye else {
            return 1.0;
        };
        let eye_width_in_view = eye.width() * self.viewport.width;
        let desired = self.viewport.width * self.params.target_eye_fraction;
        let ratio = desired / eye_width_in_view;
        if ratio.is_finite() {
            ratio.clamp(1.0, self.max_zoom_ratio)
        } else {
            self.max_zoom_ratio
        }
    }

    fn enter_locking_focus(&mut self) {
        self.set_stage(Stage::LockingFocus);
        self.issue_untracked(CameraOp::CancelFocusAndMetering);
        self.issue_tracked(CameraOp::MeterAndFocus(MeteringRequest {
            point: self.viewport.center(),
            flags: MeteringFlags::AF,
            auto_cancel: self.params.focus_auto_cancel(),
        }));
    }


    fn on_completion(&mut self, completion: CameraCompletion) {
        let Some(done) = self.outstanding.filter(|o| o.id == completion.id) else {
            log::warn!("Ignoring stale completion for {}", completion.id);
            return;
        };
        check_invariant!(done.id == completion.id, CURRENT_GENERATION_ONLY, "on_completion");
        self.outstanding = None;

        if done.cleanup {
            match completion.result {
                Ok(_) => log::debug!("Zoom reset after session end acknowledged"),
                Err(e) => log::warn!("Zoom reset after session end failed: {}", e),
            }
            return;
        }

        match (done.kind, self.state.stage, completion.result) {
            (CommandKind::Metering, Stage::AwaitingPreCaptureMetering, Ok(_)) => {
                self.issue_untracked(CameraOp::LockExposureWhiteBalance {
                    locked: true,
                    white_balance: self.white_balance_lock,
                });
                self.set_stage(Stage::AwaitingCentering);
                self.set_overlay(GuideOverlay::centering(Eye::Right));
                self.status(MSG_CAMERA_READY);
            }
            (CommandKind::Metering, Stage::AwaitingPreCaptureMetering, Err(e)) => {
                log::error!("Pre-capture metering failed: {}", e);
                self.abort(MSG_METERING_FAILED);
            }
            (CommandKind::Zoom, Stage::ReadyToCapture, Ok(_)) => {
                self.set_overlay(GuideOverlay::alignment(alignment_box(
                    self.viewport,
                    self.params.alignment_box_fraction,
                )));
                self.status(MSG_ALIGN_BOX);
                self.start_timer(TimerKind::FocusConfirm, self.params.focus_confirm_delay());
            }
            (CommandKind::Zoom, _, Err(e)) => {
                log::error!("Zoom failed: {}", e);
                self.abort(MSG_ZOOM_FAILED);
            }
            (CommandKind::Zoom, _, Ok(_)) => {
                log::debug!("Left-eye zoom reset acknowledged");
            }
            (CommandKind::Metering, Stage::LockingFocus, Ok(CompletionOutcome::Metered { focus_locked: true })) => {
                self.status(MSG_FOCUS_LOCKED);
                self.set_stage(Stage::Capturing);
                self.state.captured = 0;
                self.next_shot();
            }
            (CommandKind::Metering, Stage::LockingFocus, result) => {
                log::error!("Autofocus did not lock: {:?}", result);
                self.abort(MSG_FOCUS_FAILED);
            }
            (CommandKind::Capture, Stage::Capturing, Ok(CompletionOutcome::Captured(image))) => {
                log::debug!("Captured {}; scoring", image);
                self.awaiting_score = Some(completion.id);
                self.actions.push(Action::Score {
                    id: completion.id,
                    image,
                });
            }
            (CommandKind::Capture, Stage::Capturing, result) => {
                log::error!("Capture failed: {:?}", result);
                self.abort(MSG_CAPTURE_FAILED);
            }
            (kind, stage, _) => {
                log::debug!("{:?} completion ignored in {}", kind, stage);
            }
        }
    }


    fn next_shot(&mut self) {
        if self.state.stage != Stage::Capturing {
            return;
        }

        if self.state.captured >= self.params.images_per_eye {
            match self.state.eye {
                Eye::Right => self.switch_to_left_eye(),
                Eye::Left => self.finish(),
            }
            return;
        }

        let file_name = format!(
            "{}_{}_{}.jpg",
            self.state.participant,
            self.state.eye.title(),
            self.state.captured + 1
        );
        self.state.attempts += 1;
        self.issue_tracked(CameraOp::Capture { file_name });
    }

    fn on_scored(&mut self, id: CommandId, image: ImageHandle, score: f64) {
        if self.awaiting_score != Some(id) || self.state.stage != Stage::Capturing {
            log::warn!("Ignoring stale score for {} ({})", image, id);
            return;
        }
        self.awaiting_score = None;

        let eye = self.state.eye;
        let target = self.params.images_per_eye;
        if self.sharpness.accepts(score) {
            self.state.captured += 1;
            self.state.kept.push(KeptImage {
                eye,
                image,
                score,
            });
            let msg = format!("{} eye photo {}/{} saved.", eye.title(), self.state.captured, target);
            log::info!("{} (sharpness {:.2})", msg, score);
            self.status(&msg);
        } else {
            self.state.discarded += 1;
            self.actions.push(Action::Discard(image));
            let msg = format!(
                "{} eye photo {}/{} is not sharp enough. Retaking.",
                eye.title(),
                self.state.captured + 1,
                target
            );
            log::info!("{} (sharpness {:.2})", msg, score);
            self.status(&msg);
        }

        self.start_timer(TimerKind::InterShot, self.params.inter_shot_delay());
    }

    fn switch_to_left_eye(&mut self) {
        self.state.eye = Eye::Left;
        self.state.captured = 0;
        self.state.reference_box = None;
        self.last_eye_box = None;
        self.set_stage(Stage::AwaitingRecenter);

        self.issue_untracked(CameraOp::CancelFocusAndMetering);
        self.issue_tracked(CameraOp::SetZoom { ratio: 1.0 });
        self.set_overlay(GuideOverlay::centering(Eye::Left));
        self.status(MSG_RIGHT_DONE);
    }


    fn set_stage(&mut self, stage: Stage) {
        if stage != self.state.stage {
            log::info!("Capture stage {} -> {}", self.state.stage, stage);
        }
        self.state.stage = stage;
        self.state.detection_paused = stage.pauses_detection();
        self.generation += 1;
        self.actions.push(Action::StageChanged {
            stage,
            generation: self.generation,
        });
    }

    fn start_timer(&mut self, timer: TimerKind, delay: std::time::Duration) {
        self.actions.push(Action::StartTimer {
            timer,
            generation: self.generation,
            delay,
        });
    }

    fn status(&mut self, message: &str) {
        if self.state.should_emit(message) {
            self.actions.push(Action::Status(message.to_string()));
        }
    }

    fn set_overlay(&mut self, overlay: GuideOverlay) {
        if overlay != self.overlay {
            self.overlay = overlay;
            self.actions.push(Action::Overlay(overlay));
        }
    }

    fn allocate_id(&mut self) -> CommandId {
        let id = CommandId(self.next_command);
        self.next_command += 1;
        id
    }

    fn issue_tracked(&mut self, op: CameraOp) -> CommandId {
        self.issue(op, false)
    }

    fn issue(&mut self, op: CameraOp, cleanup: bool) -> CommandId {
        check_invariant!(
            self.outstanding.is_none(),
            ONE_OUTSTANDING_COMMAND,
            "issue_tracked"
        );
        let id = self.allocate_id();
        self.outstanding = Some(Outstanding {
            id,
            kind: op.kind(),
            cleanup,
        });
        self.actions.push(Action::Camera(CameraCommand { id, op }));
        id
    }

    fn issue_untracked(&mut self, op: CameraOp) {
        let id = self.allocate_id();
        self.actions.push(Action::Camera(CameraCommand { id, op }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn orchestrator() -> CaptureOrchestrator {
        CaptureOrchestrator::new(
            CaptureParameters::default(),
            Viewport::new(1000.0, 1000.0),
            10.0,
            "p",
        )
    }

    fn eye_box(width: f32) -> BoundingBox {
        BoundingBox {
            min_x: 0.5 - width / 2.0,
            min_y: 0.48,
            max_x: 0.5 + width / 2.0,
            max_y: 0.52,
        }
    }

    #[test]
    fn test_zoom_ratio_targets_fraction_of_view() {
        let o = orchestrator();
        // eye spans 0.1 of the view; 0.4 / 0.1 = 4x
        assert!((o.zoom_ratio_for(Some(eye_box(0.1))) - 4.0).abs() < 1e-4);
    }

    #[test]
    fn test_zoom_ratio_is_clamped() {
        let o = orchestrator();
        assert_eq!(o.zoom_ratio_for(Some(eye_box(0.01))), 10.0);
        assert_eq!(o.zoom_ratio_for(Some(eye_box(0.9))), 1.0);
        assert_eq!(o.zoom_ratio_for(Some(eye_box(0.0))), 10.0);
        assert_eq!(o.zoom_ratio_for(None), 1.0);
    }

    #[test]
    fn test_start_is_ignored_when_running() {
        let mut o = orchestrator();
        o.handle(Event::Start { participant: None });
        let actions = o.handle(Event::Start { participant: None });
        assert!(actions.is_empty());
        assert_eq!(o.stage(), Stage::AwaitingPreCaptureMetering);
    }

    #[test]
    fn test_stop_while_idle_is_noop() {
        let mut o = orchestrator();
        let actions = o.handle(Event::Stop {
            reason: MSG_STOPPED.into(),
        });
        assert!(actions.is_empty());
    }

    #[test]
    fn test_sharpness_threshold_comes_from_params() {
        let params = CaptureParameters {
            min_sharpness: 25.0,
            ..Default::default()
        };
        let o = CaptureOrchestrator::new(params, Viewport::new(1000.0, 1000.0), 10.0, "p");
        assert_eq!(o.sharpness.min_score(), 25.0);
        assert!(o.sharpness.accepts(25.0));
        assert!(!o.sharpness.accepts(24.99));
    }

    #[test]
    fn test_centering_thresholds_scale_per_axis() {
        let mut o = orchestrator();
        o.viewport = Viewport::new(1000.0, 2000.0);
        // 0.05 * 1000 = 50 horizontally, 0.05 * 2000 = 100 vertically
        assert!(o.is_centered(ViewPoint { x: 549.0, y: 1099.0 }));
        assert!(!o.is_centered(ViewPoint { x: 550.0, y: 1000.0 }));
        assert!(!o.is_centered(ViewPoint { x: 500.0, y: 1100.0 }));
    }
}
