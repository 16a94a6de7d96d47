//! In-flight request bookkeeping.
//!
//! Every dispatched request holds an [`InFlightGuard`] until its transport call
//! resolves. The tracker publishes its size on a watch channel so `stop()` can
//! wait for zero without polling.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use uuid::Uuid;

/// Unique id of one dispatched request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Bookkeeping entry for a request whose completion has not been observed.
#[derive(Debug, Clone)]
pub struct PendingRequest {
    pub id: RequestId,
    pub method: String,
    pub url: String,
    pub submitted_at: Instant,
}

impl PendingRequest {
    pub fn age(&self) -> Duration {
        self.submitted_at.elapsed()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InflightSnapshot {
    pub in_flight: usize,
    /// Age of the oldest outstanding request, if any.
    pub oldest_age_ms: Option<u64>,
}

/// Counts outstanding requests and signals when the count drops to zero.
pub struct InFlightTracker {
    pending: Mutex<HashMap<RequestId, PendingRequest>>,
    count: watch::Sender<usize>,
}

impl InFlightTracker {
    pub fn new() -> Self {
        let (count, _) = watch::channel(0);
        Self {
            pending: Mutex::new(HashMap::new()),
            count,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<RequestId, PendingRequest>> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Record a request as in flight. The returned guard deregisters it exactly once.
    pub fn register(
        self: &Arc<Self>,
        method: impl Into<String>,
        url: impl Into<String>,
    ) -> InFlightGuard {
        let id = RequestId::new();
        let entry = PendingRequest {
            id,
            method: method.into(),
            url: url.into(),
            submitted_at: Instant::now(),
        };

        let mut pending = self.lock();
        pending.insert(id, entry);
        self.count.send_replace(pending.len());

        InFlightGuard {
            tracker: Arc::clone(self),
            id,
            released: false,
        }
    }

    /// Returns false when `id` was already removed (completed or abandoned).
    fn deregister(&self, id: RequestId) -> bool {
        let mut pending = self.lock();
        let removed = pending.remove(&id).is_some();
        if removed {
            self.count.send_replace(pending.len());
        }
        removed
    }

    pub fn len(&self) -> usize {
        *self.count.borrow()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Wait until no request is in flight or `timeout` elapses. Returns true when drained.
    pub async fn await_drain(&self, timeout: Duration) -> bool {
        let mut rx = self.count.subscribe();
        let drained = tokio::time::timeout(timeout, rx.wait_for(|n| *n == 0)).await;
        matches!(drained, Ok(Ok(_)))
    }

    /// Forget every outstanding request. Their guards become no-ops.
    pub fn abandon_all(&self) -> Vec<PendingRequest> {
        let mut pending = self.lock();
        let abandoned: Vec<PendingRequest> = pending.drain().map(|(_, p)| p).collect();
        self.count.send_replace(0);
        abandoned
    }

    pub fn snapshot(&self) -> InflightSnapshot {
        let pending = self.lock();
        InflightSnapshot {
            in_flight: pending.len(),
            oldest_age_ms: pending
                .values()
                .map(|p| p.age().as_millis() as u64)
                .max(),
        }
    }
}

impl Default for InFlightTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Registration handle of one in-flight request.
///
/// Dropping the guard deregisters as well, so a dispatch task torn down by its
/// runtime never leaks a count.
pub struct InFlightGuard {
    tracker: Arc<InFlightTracker>,
    id: RequestId,
    released: bool,
}

impl InFlightGuard {
    pub fn id(&self) -> RequestId {
        self.id
    }

    /// Deregister now. Returns false if the request had been abandoned by a timed-out drain.
    pub fn complete(mut self) -> bool {
        self.released = true;
        self.tracker.deregister(self.id)
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if !self.released {
            self.tracker.deregister(self.id);
        }
    }
}
