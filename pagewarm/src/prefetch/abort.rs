//! Abort handles and the registry that issues them.
//!
//! Every prefetch command owns an [`AbortHandle`]. Handles are issued by an
//! [`AbortRegistry`], which remembers the page each handle was created for so
//! that whole groups can be cancelled by cause (rapid navigation, network
//! change, unmount) without callers tracking individual handles.
//!
//! Cancellation is cooperative: tripping a handle never interrupts a running
//! future. Executors observe it through [`AbortHandle::is_aborted`] or by
//! awaiting [`AbortHandle::cancelled`].

use std::collections::HashMap;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;

// =============================================================================
// Abort Handle
// =============================================================================

/// A one-shot cancellation flag.
///
/// Clones share the same underlying state. Once aborted, a handle reports
/// aborted forever.
#[derive(Clone, Debug, Default)]
pub struct AbortHandle {
    token: CancellationToken,
}

impl AbortHandle {
    /// Creates a handle in the not-aborted state.
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// Trips the handle.
    ///
    /// Returns `true` only when this call performed the transition. Aborting
    /// an already-aborted handle is a no-op and returns `false`.
    pub fn abort(&self) -> bool {
        if self.token.is_cancelled() {
            return false;
        }
        self.token.cancel();
        true
    }

    /// Returns true once the handle has been aborted.
    pub fn is_aborted(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Completes when the handle is aborted.
    ///
    /// Executors can race this against their own work to stop early.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }
}

// =============================================================================
// Abort Registry
// =============================================================================

#[derive(Debug)]
struct RegisteredHandle {
    page: u32,
    handle: AbortHandle,
}

/// Issues abort handles keyed by request id and cancels them in bulk.
///
/// Entries are removed when they are cancelled through one of the bulk
/// operations or when their owner calls [`release`](Self::release).
#[derive(Debug, Default)]
pub struct AbortRegistry {
    handles: Mutex<HashMap<String, RegisteredHandle>>,
}

impl AbortRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates and registers a handle for a prefetch of `page`.
    ///
    /// A previous handle registered under the same request id is aborted and
    /// replaced.
    pub fn create_for_prefetch(&self, page: u32, request_id: &str) -> AbortHandle {
        let handle = AbortHandle::new();
        let previous = self.handles.lock().insert(
            request_id.to_string(),
            RegisteredHandle {
                page,
                handle: handle.clone(),
            },
        );
        if let Some(previous) = previous {
            previous.handle.abort();
            debug!(request_id, page, "Replaced existing abort handle");
        }
        handle
    }

    /// Aborts every handle that is not for `current_page`.
    ///
    /// Returns the number of handles newly aborted by this call.
    pub fn cancel_rapid_navigation(&self, current_page: u32) -> usize {
        let drained: Vec<RegisteredHandle> = {
            let mut handles = self.handles.lock();
            let stale: Vec<String> = handles
                .iter()
                .filter(|(_, entry)| entry.page != current_page)
                .map(|(id, _)| id.clone())
                .collect();
            stale.iter().filter_map(|id| handles.remove(id)).collect()
        };
        let aborted = abort_all(drained);
        debug!(current_page, aborted, "Cancelled prefetches after rapid navigation");
        aborted
    }

    /// Aborts every registered handle because network conditions changed.
    pub fn cancel_on_network_change(&self) -> usize {
        let aborted = abort_all(self.drain());
        debug!(aborted, "Cancelled prefetches after network change");
        aborted
    }

    /// Aborts every registered handle because the host is going away.
    pub fn cancel_on_unmount(&self) -> usize {
        let aborted = abort_all(self.drain());
        debug!(aborted, "Cancelled prefetches on unmount");
        aborted
    }

    /// Forgets a handle without aborting it.
    pub fn release(&self, request_id: &str) {
        self.handles.lock().remove(request_id);
    }

    /// Returns true if a handle is registered under `request_id`.
    pub fn contains(&self, request_id: &str) -> bool {
        self.handles.lock().contains_key(request_id)
    }

    /// Number of registered handles.
    pub fn len(&self) -> usize {
        self.handles.lock().len()
    }

    /// Returns true if no handles are registered.
    pub fn is_empty(&self) -> bool {
        self.handles.lock().is_empty()
    }

    fn drain(&self) -> Vec<RegisteredHandle> {
        self.handles.lock().drain().map(|(_, entry)| entry).collect()
    }
}

/// Aborts outside the registry lock and counts real transitions.
fn abort_all(entries: Vec<RegisteredHandle>) -> usize {
    entries
        .into_iter()
        .filter(|entry| entry.handle.abort())
        .count()
}
