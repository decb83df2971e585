//! Inbound delivery buffering.

use std::collections::VecDeque;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::futures::Notified;
use tokio::sync::Notify;
use tracing::{debug, warn};

#[cfg(test)]
#[path = "inbound_tests.rs"]
mod tests;

/// Bounded FIFO of inbound deliveries plus a read cursor into the front one.
///
/// Written by the transport event pump, drained by `receive` on the caller
/// side. Receivers park on the notify handle between checks; no await ever
/// happens under the lock.
pub(crate) struct Inbound {
    queue: Mutex<Queue>,
    notify: Notify,
}

struct Queue {
    deliveries: VecDeque<Bytes>,
    /// Read offset into the front delivery. Strictly less than the front
    /// delivery's length whenever one exists.
    cursor: usize,
    capacity: usize,
}

impl Inbound {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            queue: Mutex::new(Queue {
                deliveries: VecDeque::new(),
                cursor: 0,
                capacity: capacity.max(1),
            }),
            notify: Notify::new(),
        }
    }

    /// Append one delivery and wake pending receivers.
    ///
    /// When the queue is full the oldest delivery is dropped, unread bytes
    /// included. With capacity 1 this degenerates to keeping only the latest
    /// delivery.
    pub(crate) fn push(&self, payload: Bytes) {
        if payload.is_empty() {
            debug!("ignoring empty delivery");
            return;
        }
        {
            let mut queue = self.queue.lock();
            if queue.deliveries.len() == queue.capacity {
                queue.deliveries.pop_front();
                queue.cursor = 0;
                warn!(
                    capacity = queue.capacity,
                    "inbound queue full, dropping oldest delivery"
                );
            }
            queue.deliveries.push_back(payload);
        }
        self.notify.notify_waiters();
    }

    /// Copy bytes from the front delivery into `buf`, advancing the cursor.
    ///
    /// Returns `None` when nothing is buffered. A fully consumed delivery is
    /// popped; a short read leaves the remainder in place for the next call.
    /// A single call never crosses a delivery boundary.
    pub(crate) fn copy_into(&self, buf: &mut [u8]) -> Option<usize> {
        let mut guard = self.queue.lock();
        let queue = &mut *guard;
        let front = queue.deliveries.front()?;
        let n = buf.len().min(front.len() - queue.cursor);
        buf[..n].copy_from_slice(&front[queue.cursor..queue.cursor + n]);
        let consumed = queue.cursor + n == front.len();
        queue.cursor += n;
        if consumed {
            queue.deliveries.pop_front();
            queue.cursor = 0;
        }
        Some(n)
    }

    /// Whether unread bytes are buffered.
    pub(crate) fn data_available(&self) -> bool {
        let queue = self.queue.lock();
        queue
            .deliveries
            .front()
            .is_some_and(|d| queue.cursor < d.len())
    }

    /// Discard everything buffered.
    pub(crate) fn clear(&self) {
        let mut queue = self.queue.lock();
        queue.deliveries.clear();
        queue.cursor = 0;
    }

    /// Wake pending receivers without delivering data, so they can re-check
    /// the transport state.
    pub(crate) fn wake(&self) {
        self.notify.notify_waiters();
    }

    /// Wait handle for the next push or wake. Must be enabled before
    /// re-checking the queue, or a push landing in between is missed.
    pub(crate) fn notified(&self) -> Notified<'_> {
        self.notify.notified()
    }
}
