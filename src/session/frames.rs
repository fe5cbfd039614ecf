use crate::types::FrameResult;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;

/// Latest-only mailbox between the detector and the session runner.
///
/// A new frame replaces an unread one, so a slow consumer never builds a
/// backlog; replaced frames are counted as dropped.
#[derive(Debug, Default)]
pub struct FrameSlot {
    inner: Mutex<SlotInner>,
    notify: Notify,
}

#[derive(Debug, Default)]
struct SlotInner {
    latest: Option<FrameResult>,
    dropped: u64,
    closed: bool,
}

impl FrameSlot {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SlotInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store `frame`, replacing any unread one. Never blocks on the consumer.
    pub fn push(&self, frame: FrameResult) {
        let mut g = self.lock();
        if g.closed {
            return;
        }
        if g.latest.replace(frame).is_some() {
            g.dropped = g.dropped.saturating_add(1);
        }
        drop(g);
        self.notify.notify_one();
    }

    pub fn take(&self) -> Option<FrameResult> {
        self.lock().latest.take()
    }

    /// Wait for the next frame; `None` once the slot is closed and drained.
    pub async fn next(&self) -> Option<FrameResult> {
        loop {
            {
                let mut g = self.lock();
                if let Some(frame) = g.latest.take() {
                    return Some(frame);
                }
                if g.closed {
                    return None;
                }
            }
            self.notify.notified().await;
        }
    }

    /// Count a frame that was consumed but deliberately not processed.
    pub fn record_drop(&self) {
        let mut g = self.lock();
        g.dropped = g.dropped.saturating_add(1);
    }

    pub fn dropped(&self) -> u64 {
        self.lock().dropped
    }

    pub fn close(&self) {
        self.lock().closed = true;
        self.notify.notify_waiters();
        self.notify.notify_one();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }
}

/// Detector-side handle for pushing frames into a running session.
#[derive(Debug, Clone)]
pub struct FrameSender {
    slot: Arc<FrameSlot>,
}

impl FrameSender {
    pub(crate) fn new(slot: Arc<FrameSlot>) -> Self {
        Self { slot }
    }

    pub fn send(&self, frame: FrameResult) {
        self.slot.push(frame);
    }

    pub fn is_closed(&self) -> bool {
        self.slot.is_closed()
    }
}
