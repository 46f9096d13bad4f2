//! The Ingress Queue: an ordered, unbounded buffer between the client read loop
//! and the backend session.
//!
//! Pushing never suspends, so a slow backend can't stall the client read loop.
//! The price is memory: the queue is unbounded, and `depth()` is exposed so the
//! caller can watch it instead of blocking.

use crate::frame::MediaFrame;
use futures::Stream;
use std::{
    pin::Pin,
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicUsize, Ordering},
    },
    task::{Context, Poll},
};
use tokio::sync::mpsc;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("ingress queue is closed")]
    Closed,
}

struct Shared {
    tx: Mutex<Option<mpsc::UnboundedSender<MediaFrame>>>,
    depth: AtomicUsize,
}

/// Producer half. Cloning shares the same underlying queue.
#[derive(Clone)]
pub struct IngressQueue {
    shared: Arc<Shared>,
}

/// Consumer half, handed to the backend session.
pub struct IngressReceiver {
    rx: mpsc::UnboundedReceiver<MediaFrame>,
    shared: Arc<Shared>,
}

impl IngressQueue {
    pub fn new() -> (IngressQueue, IngressReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            tx: Mutex::new(Some(tx)),
            depth: AtomicUsize::new(0),
        });
        (
            IngressQueue {
                shared: shared.clone(),
            },
            IngressReceiver { rx, shared },
        )
    }

    /// Appends a frame and returns the queue depth after the push.
    pub fn push(&self, frame: MediaFrame) -> Result<usize, QueueError> {
        let guard = self
            .shared
            .tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let tx = guard.as_ref().ok_or(QueueError::Closed)?;

        // Count first so the consumer can never observe a frame it hasn't been charged for.
        let depth = self.shared.depth.fetch_add(1, Ordering::AcqRel) + 1;
        if tx.send(frame).is_err() {
            self.shared.depth.fetch_sub(1, Ordering::AcqRel);
            return Err(QueueError::Closed);
        }
        Ok(depth)
    }

    /// Signals end-of-input. Returns `true` only for the call that actually closed it.
    pub fn close(&self) -> bool {
        let closed = self
            .shared
            .tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .is_some();
        if closed {
            tracing::debug!("Ingress queue closed.");
        }
        closed
    }

    pub fn is_closed(&self) -> bool {
        self.shared
            .tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// Frames pushed but not yet taken by the backend.
    pub fn depth(&self) -> usize {
        self.shared.depth.load(Ordering::Acquire)
    }
}

impl IngressReceiver {
    /// Waits for the next frame. `None` once the queue is closed and drained.
    pub async fn recv(&mut self) -> Option<MediaFrame> {
        let frame = self.rx.recv().await;
        if frame.is_some() {
            self.shared.depth.fetch_sub(1, Ordering::AcqRel);
        }
        frame
    }

    /// Takes a frame if one is ready without waiting.
    pub fn try_recv(&mut self) -> Option<MediaFrame> {
        let frame = self.rx.try_recv().ok();
        if frame.is_some() {
            self.shared.depth.fetch_sub(1, Ordering::AcqRel);
        }
        frame
    }
}

impl Stream for IngressReceiver {
    type Item = MediaFrame;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<MediaFrame>> {
        let this = self.get_mut();
        let polled = this.rx.poll_recv(cx);
        if let Poll::Ready(Some(_)) = &polled {
            this.shared.depth.fetch_sub(1, Ordering::AcqRel);
        }
        polled
    }
}
