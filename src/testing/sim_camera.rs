//! Camera simulator for offline runs
//!
//! Completes every tracked command after a fixed latency on the tokio
//! runtime and writes synthetic captures into a [`MemoryImageStore`].

use super::synthetic_data::{checkerboard, soft_gradient};
use crate::camera::{
    CameraCapabilities, CameraCommand, CameraCompletion, CameraDevice, CameraOp, CommandKind,
    CompletionOutcome, CompletionSender,
};
use crate::store::MemoryImageStore;
use crate::types::ImageHandle;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Behaviour of a [`SimulatedCamera`].
#[derive(Debug, Clone)]
pub struct SimulatedCameraConfig {
    pub latency: Duration,
    pub max_zoom_ratio: f32,
    /// Whether autofocus requests report a lock.
    pub focus_locks: bool,
    /// Reported as [`CameraCapabilities::white_balance_lock`].
    pub white_balance_lock: bool,
    /// Fail every tracked command of this kind.
    pub fail: Option<CommandKind>,
    /// Sharp (`true`) or blurry (`false`) per shot, cycled.
    pub sharpness_plan: Vec<bool>,
    pub image_size: (u32, u32),
}

impl Default for SimulatedCameraConfig {
    fn default() -> Self {
        Self {
            latency: Duration::from_millis(30),
            max_zoom_ratio: 10.0,
            focus_locks: true,
            white_balance_lock: true,
            fail: None,
            sharpness_plan: vec![true],
            image_size: (64, 48),
        }
    }
}

/// Shared record of everything submitted to a simulated camera.
#[derive(Debug, Clone, Default)]
pub struct CommandLog {
    commands: Arc<Mutex<Vec<CameraCommand>>>,
}

impl CommandLog {
    fn push(&self, command: CameraCommand) {
        self.commands
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(command);
    }

    pub fn commands(&self) -> Vec<CameraCommand> {
        self.commands
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn zoom_ratios(&self) -> Vec<f32> {
        self.commands()
            .into_iter()
            .filter_map(|c| match c.op {
                CameraOp::SetZoom { ratio } => Some(ratio),
                _ => None,
            })
            .collect()
    }

    pub fn capture_names(&self) -> Vec<String> {
        self.commands()
            .into_iter()
            .filter_map(|c| match c.op {
                CameraOp::Capture { file_name } => Some(file_name),
                _ => None,
            })
            .collect()
    }
}

/// A [`CameraDevice`] that needs no hardware. Requires a tokio runtime.
#[derive(Debug)]
pub struct SimulatedCamera {
    config: SimulatedCameraConfig,
    completions: CompletionSender,
    store: MemoryImageStore,
    log: CommandLog,
    shots: usize,
}

impl SimulatedCamera {
    pub fn new(
        config: SimulatedCameraConfig,
        completions: CompletionSender,
        store: MemoryImageStore,
    ) -> Self {
        Self {
            config,
            completions,
            store,
            log: CommandLog::default(),
            shots: 0,
        }
    }

    pub fn log(&self) -> CommandLog {
        self.log.clone()
    }

    fn outcome(&mut self, op: &CameraOp) -> Result<CompletionOutcome, String> {
        if self.config.fail == Some(op.kind()) {
            return Err(format!("simulated {:?} failure", op.kind()));
        }
        match op {
            CameraOp::MeterAndFocus(request) => Ok(CompletionOutcome::Metered {
                focus_locked: !request.flags.auto_focus || self.config.focus_locks,
            }),
            CameraOp::SetZoom { ratio } => Ok(CompletionOutcome::Zoomed {
                ratio: ratio.clamp(1.0, self.config.max_zoom_ratio),
            }),
            CameraOp::Capture { file_name } => {
                let sharp = if self.config.sharpness_plan.is_empty() {
                    true
                } else {
                    self.config.sharpness_plan[self.shots % self.config.sharpness_plan.len()]
                };
                self.shots += 1;

                let (w, h) = self.config.image_size;
                let image = if sharp {
                    checkerboard(w, h, 4)
                } else {
                    soft_gradient(w, h)
                };
                let handle = ImageHandle::new(file_name.clone());
                self.store
                    .insert(handle.clone(), image)
                    .map_err(|e| e.to_string())?;
                Ok(CompletionOutcome::Captured(handle))
            }
            CameraOp::LockExposureWhiteBalance { .. } | CameraOp::CancelFocusAndMetering => {
                Err("untracked op has no completion".to_string())
            }
        }
    }
}

impl CameraDevice for SimulatedCamera {
    fn capabilities(&self) -> CameraCapabilities {
        CameraCapabilities {
            max_zoom_ratio: self.config.max_zoom_ratio,
            white_balance_lock: self.config.white_balance_lock,
        }
    }

    fn submit(&mut self, command: CameraCommand) {
        self.log.push(command.clone());
        if !command.op.expects_completion() {
            log::trace!("Simulated camera applied {:?}", command.op);
            return;
        }

        let completion = CameraCompletion {
            id: command.id,
            result: self.outcome(&command.op),
        };
        let tx = self.completions.clone();
        let latency = self.config.latency;
        tokio::spawn(async move {
            tokio::time::sleep(latency).await;
            let _ = tx.send(completion);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::completion_channel;
    use crate::store::ImageStore;
    use crate::types::CommandId;

    #[tokio::test(start_paused = true)]
    async fn test_capture_writes_image_and_completes() {
        let (tx, mut rx) = completion_channel();
        let store = MemoryImageStore::new();
        let mut camera = SimulatedCamera::new(SimulatedCameraConfig::default(), tx, store.clone());

        camera.submit(CameraCommand {
            id: CommandId(3),
            op: CameraOp::Capture {
                file_name: "p_Right_1.jpg".into(),
            },
        });
        let done = rx.recv().await.unwrap();
        assert_eq!(done.id, CommandId(3));
        let handle = ImageHandle::new("p_Right_1.jpg");
        assert_eq!(done.result, Ok(CompletionOutcome::Captured(handle.clone())));
        assert!(store.load(&handle).is_ok());
        assert_eq!(camera.log().capture_names(), vec!["p_Right_1.jpg".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_configured_failure() {
        let (tx, mut rx) = completion_channel();
        let config = SimulatedCameraConfig {
            fail: Some(CommandKind::Zoom),
            ..Default::default()
        };
        let mut camera = SimulatedCamera::new(config, tx, MemoryImageStore::new());
        camera.submit(CameraCommand {
            id: CommandId(1),
            op: CameraOp::SetZoom { ratio: 2.0 },
        });
        assert!(rx.recv().await.unwrap().result.is_err());
    }
}
