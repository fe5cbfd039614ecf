//! Deferred transitions for the capture sequence.
//!
//! Each timer is tagged with the orchestrator generation it was scheduled
//! under. The orchestrator ignores firings from older generations, and the
//! runner also aborts timers that a stage change has made obsolete.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimerKind {
    /// Eye held steady long enough: promote to ready-to-capture.
    StabilityConfirm,
    /// Zoom settled: lock focus.
    FocusConfirm,
    /// Pause between shots of the series.
    InterShot,
}

/// A timer that has elapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerFired {
    pub timer: TimerKind,
    pub generation: u64,
}

/// Pending tokio timers owned by the session runner.
#[derive(Debug)]
pub struct Timers {
    tx: mpsc::UnboundedSender<TimerFired>,
    pending: Vec<(u64, JoinHandle<()>)>,
}

impl Timers {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TimerFired>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                tx,
                pending: Vec::new(),
            },
            rx,
        )
    }

    /// Fire `timer` after `delay`, tagged with `generation`.
    pub fn schedule(&mut self, timer: TimerKind, generation: u64, delay: Duration) {
        self.pending.retain(|(_, h)| !h.is_finished());
        let tx = self.tx.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(TimerFired { timer, generation });
        });
        self.pending.push((generation, handle));
    }

    /// Abort every timer scheduled before `generation`.
    pub fn cancel_before(&mut self, generation: u64) {
        self.pending.retain(|(g, h)| {
            if *g < generation {
                h.abort();
                false
            } else {
                true
            }
        });
    }

    pub fn cancel_all(&mut self) {
        for (_, h) in self.pending.drain(..) {
            h.abort();
        }
    }

    pub fn pending(&self) -> usize {
        self.pending.iter().filter(|(_, h)| !h.is_finished()).count()
    }
}

impl Drop for Timers {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
