//! Async runner that drives a [`CaptureOrchestrator`] on tokio.
//!
//! One task owns the orchestrator and the camera. Control requests, camera
//! completions, sharpness results, timer firings and detector frames are
//! all funnelled into that task and applied one at a time, so the state
//! machine never sees concurrent input. Frames go through a latest-only
//! [`FrameSlot`]; scoring runs on the blocking pool.

pub mod frames;

pub use frames::{FrameSender, FrameSlot};

use crate::camera::{CameraDevice, CompletionReceiver};
use crate::config::EyeCaptureConfig;
use crate::errors::CaptureError;
use crate::orchestrator::machine::MSG_STOPPED;
use crate::orchestrator::{Action, CaptureOrchestrator, Event, GuideOverlay, SessionSummary, Stage};
use crate::quality::laplacian_sharpness;
use crate::store::ImageStore;
use crate::timing::Timers;
use crate::types::{CommandId, Eye, FrameResult, ImageHandle, Viewport};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Notifications for the UI layer.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionUpdate {
    Status(String),
    Stage(Stage),
    Overlay(GuideOverlay),
    Finished(SessionSummary),
}

/// Point-in-time view of the running session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub stage: Stage,
    pub eye: Eye,
    pub captured: u32,
    pub attempts: u32,
    pub discarded: u32,
    pub last_status: Option<String>,
}

impl SessionSnapshot {
    fn of(orchestrator: &CaptureOrchestrator) -> Self {
        let state = orchestrator.state();
        Self {
            stage: state.stage,
            eye: state.eye,
            captured: state.captured,
            attempts: state.attempts,
            discarded: state.discarded,
            last_status: state.last_status.clone(),
        }
    }
}

#[derive(Debug)]
enum Control {
    Start(Option<String>),
    Stop(String),
    Viewport(Viewport),
    CameraUnavailable(String),
    Shutdown,
}

#[derive(Debug)]
struct Scored {
    id: CommandId,
    image: ImageHandle,
    score: f64,
}

/// Builder for a session runner.
pub struct CaptureSession {
    config: EyeCaptureConfig,
}

impl CaptureSession {
    pub fn new(config: EyeCaptureConfig) -> Self {
        Self { config }
    }

    /// Spawn the runner on the current tokio runtime.
    ///
    /// `completions` must be the receiving end of the channel `camera`
    /// reports on. The effective zoom ceiling is the lower of the device
    /// limit and the configured one.
    pub fn spawn<C, S>(
        self,
        camera: C,
        completions: CompletionReceiver,
        store: S,
    ) -> (SessionHandle, mpsc::UnboundedReceiver<SessionUpdate>)
    where
        C: CameraDevice + 'static,
        S: ImageStore + 'static,
    {
        let caps = camera.capabilities();
        let max_zoom = caps.max_zoom_ratio.min(self.config.camera.max_zoom_ratio);
        log::info!(
            "Spawning capture session (max zoom {:.2}x, AWB lock {}, {} images per eye)",
            max_zoom,
            caps.white_balance_lock,
            self.config.capture.images_per_eye
        );

        let orchestrator = CaptureOrchestrator::new(
            self.config.capture.clone(),
            self.config.camera.viewport(),
            max_zoom,
            self.config.storage.participant_id.clone(),
        )
        .with_white_balance_lock(caps.white_balance_lock);

        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let (updates_tx, updates_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(SessionSnapshot::of(&orchestrator));
        let frames = Arc::new(FrameSlot::new());

        let runner = Runner {
            orchestrator,
            camera: Box::new(camera),
            store: Arc::new(store),
            updates: updates_tx,
            snapshot: snapshot_tx,
            frames: frames.clone(),
        };
        let task = tokio::spawn(runner.run(control_rx, completions));

        (
            SessionHandle {
                control: control_tx,
                frames,
                snapshot: snapshot_rx,
                task: Some(task),
            },
            updates_rx,
        )
    }
}

/// Owner-side handle to a running session.
///
/// Dropping the handle closes the frame slot and stops the runner.
#[derive(Debug)]
pub struct SessionHandle {
    control: mpsc::UnboundedSender<Control>,
    frames: Arc<FrameSlot>,
    snapshot: watch::Receiver<SessionSnapshot>,
    task: Option<JoinHandle<()>>,
}

impl SessionHandle {
    fn send(&self, control: Control) -> Result<(), CaptureError> {
        self.control
            .send(control)
            .map_err(|_| CaptureError::SessionClosed)
    }

    /// Start a session for the configured default participant.
    pub fn start(&self) -> Result<(), CaptureError> {
        self.send(Control::Start(None))
    }

    pub fn start_for(&self, participant: impl Into<String>) -> Result<(), CaptureError> {
        self.send(Control::Start(Some(participant.into())))
    }

    pub fn stop(&self, reason: impl Into<String>) -> Result<(), CaptureError> {
        self.send(Control::Stop(reason.into()))
    }

    pub fn set_viewport(&self, viewport: Viewport) -> Result<(), CaptureError> {
        self.send(Control::Viewport(viewport))
    }

    /// Report that the camera provider went away.
    pub fn camera_unavailable(&self, reason: impl Into<String>) -> Result<(), CaptureError> {
        self.send(Control::CameraUnavailable(reason.into()))
    }

    /// Offer a detector result. Never blocks; an unread frame is replaced.
    pub fn submit_frame(&self, frame: FrameResult) {
        self.frames.push(frame);
    }

    /// Cloneable sender for a detector running elsewhere.
    pub fn frame_sender(&self) -> FrameSender {
        FrameSender::new(self.frames.clone())
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn stage(&self) -> Stage {
        self.snapshot.borrow().stage
    }

    /// Wait until the session reaches `stage`.
    pub async fn wait_for_stage(&mut self, stage: Stage) -> Result<(), CaptureError> {
        self.snapshot
            .wait_for(|s| s.stage == stage)
            .await
            .map(|_| ())
            .map_err(|_| CaptureError::SessionClosed)
    }

    /// Frames replaced or ignored before the runner looked at them.
    pub fn dropped_frames(&self) -> u64 {
        self.frames.dropped()
    }

    /// Stop the runner and wait for it to exit. A live session is aborted.
    pub async fn shutdown(mut self) -> Result<(), CaptureError> {
        let _ = self.control.send(Control::Shutdown);
        self.frames.close();
        if let Some(task) = self.task.take() {
            task.await
                .map_err(|e| CaptureError::InitializationError(format!("Runner task failed: {}", e)))?;
        }
        Ok(())
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.frames.close();
    }
}

struct Runner {
    orchestrator: CaptureOrchestrator,
    camera: Box<dyn CameraDevice>,
    store: Arc<dyn ImageStore>,
    updates: mpsc::UnboundedSender<SessionUpdate>,
    snapshot: watch::Sender<SessionSnapshot>,
    frames: Arc<FrameSlot>,
}

impl Runner {
    async fn run(
        mut self,
        mut control: mpsc::UnboundedReceiver<Control>,
        mut completions: CompletionReceiver,
    ) {
        let (mut timers, mut fired) = Timers::new();
        let (scores_tx, mut scores) = mpsc::unbounded_channel::<Scored>();
        let frames = self.frames.clone();

        loop {
            tokio::select! {
                biased;

                request = control.recv() => match request {
                    Some(Control::Start(participant)) => {
                        self.dispatch(Event::Start { participant }, &mut timers, &scores_tx);
                    }
                    Some(Control::Stop(reason)) => {
                        self.dispatch(Event::Stop { reason }, &mut timers, &scores_tx);
                    }
                    Some(Control::Viewport(viewport)) => {
                        self.dispatch(Event::ViewportChanged(viewport), &mut timers, &scores_tx);
                    }
                    Some(Control::CameraUnavailable(reason)) => {
                        self.dispatch(Event::CameraUnavailable { reason }, &mut timers, &scores_tx);
                    }
                    Some(Control::Shutdown) | None => break,
                },
                Some(completion) = completions.recv() => {
                    self.dispatch(Event::Camera(completion), &mut timers, &scores_tx);
                }
                Some(result) = scores.recv() => {
                    let event = Event::Scored {
                        id: result.id,
                        image: result.image,
                        score: result.score,
                    };
                    self.dispatch(event, &mut timers, &scores_tx);
                }
                Some(timer) = fired.recv() => {
                    let event = Event::TimerFired {
                        timer: timer.timer,
                        generation: timer.generation,
                    };
                    self.dispatch(event, &mut timers, &scores_tx);
                }
                frame = frames.next() => match frame {
                    Some(_) if self.orchestrator.state().detection_paused => {
                        log::trace!("Frame dropped while detection is paused");
                        frames.record_drop();
                    }
                    Some(frame) => self.dispatch(Event::Frame(frame), &mut timers, &scores_tx),
                    None => {
                        log::debug!("Frame source closed");
                        break;
                    }
                },
            }
        }

        if self.orchestrator.stage() != Stage::Idle {
            self.dispatch(
                Event::Stop {
                    reason: MSG_STOPPED.to_string(),
                },
                &mut timers,
                &scores_tx,
            );
        }
        timers.cancel_all();
        log::info!(
            "Capture session runner stopped ({} frames dropped)",
            frames.dropped()
        );
    }

    fn dispatch(
        &mut self,
        event: Event,
        timers: &mut Timers,
        scores: &mpsc::UnboundedSender<Scored>,
    ) {
        for action in self.orchestrator.handle(event) {
            self.execute(action, timers, scores);
        }
        self.snapshot.send_replace(SessionSnapshot::of(&self.orchestrator));
    }

    fn execute(
        &mut self,
        action: Action,
        timers: &mut Timers,
        scores: &mpsc::UnboundedSender<Scored>,
    ) {
        match action {
            Action::Camera(command) => {
                log::debug!("Submitting {} {:?}", command.id, command.op);
                self.camera.submit(command);
            }
            Action::StartTimer {
                timer,
                generation,
                delay,
            } => timers.schedule(timer, generation, delay),
            Action::Score { id, image } => self.spawn_scoring(id, image, scores.clone()),
            // Inline: the retake reuses the file name and must not race the removal.
            Action::Discard(image) => {
                if let Err(e) = self.store.discard(&image) {
                    log::warn!("Failed to discard {}: {}", image, e);
                }
            }
            Action::Status(message) => self.publish(SessionUpdate::Status(message)),
            Action::Overlay(overlay) => self.publish(SessionUpdate::Overlay(overlay)),
            Action::StageChanged { stage, generation } => {
                timers.cancel_before(generation);
                self.publish(SessionUpdate::Stage(stage));
            }
            Action::Finished(summary) => self.publish(SessionUpdate::Finished(summary)),
        }
    }

    /// Score off the runner task. An image that cannot be loaded scores 0.0
    /// and is therefore retaken.
    fn spawn_scoring(&self, id: CommandId, image: ImageHandle, scores: mpsc::UnboundedSender<Scored>) {
        let store = self.store.clone();
        tokio::spawn(async move {
            let handle = image.clone();
            let result =
                tokio::task::spawn_blocking(move || store.load(&handle).map(|img| laplacian_sharpness(&img)))
                    .await;
            let score = match result {
                Ok(Ok(score)) => score,
                Ok(Err(e)) => {
                    log::warn!("Could not load {} for scoring: {}", image, e);
                    0.0
                }
                Err(e) => {
                    log::error!("Scoring task for {} failed: {}", image, e);
                    0.0
                }
            };
            let _ = scores.send(Scored { id, image, score });
        });
    }

    fn publish(&self, update: SessionUpdate) {
        if self.updates.send(update).is_err() {
            log::trace!("No listener for session updates");
        }
    }
}
