use tokio::task::AbortHandle;
use tokio::time::Instant;

use promfan_core::error::Result;
use promfan_core::metrics::{MergedSnapshot, Snapshot};

/// Completion callback for one scatter-gather operation.
///
/// `Sync` is required so the registry holding it can be shared across the
/// runtime's worker threads.
pub type Completion = Box<dyn FnOnce(Result<MergedSnapshot>) + Send + Sync + 'static>;

/// In-flight state of one operation.
///
/// Only ever reached through the correlator's registry. Whoever removes the
/// entry from the registry owns `on_complete` and is the only caller of it.
pub(crate) struct PendingOperation {
    /// Replies still awaited.
    pub expected: usize,
    /// Replies collected so far, in arrival order.
    pub received: Vec<Snapshot>,
    pub on_complete: Completion,
    /// Scheduled timeout task.
    pub deadline: AbortHandle,
    pub started: Instant,
}

impl PendingOperation {
    pub fn new(expected: usize, on_complete: Completion, deadline: AbortHandle) -> Self {
        Self {
            expected,
            received: Vec::with_capacity(expected),
            on_complete,
            deadline,
            started: Instant::now(),
        }
    }

    /// Record one reply. Returns true once nothing more is expected.
    pub fn record(&mut self, snapshot: Snapshot) -> bool {
        self.received.push(snapshot);
        self.expected = self.expected.saturating_sub(1);
        self.expected == 0
    }
}
