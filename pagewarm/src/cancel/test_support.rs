//! Recording cancellation target for handler and chain tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use super::handler::CancellationTarget;

/// Records every call and returns preset counts.
#[derive(Default)]
pub(crate) struct RecordingTarget {
    cancelled_pages: Mutex<Vec<u32>>,
    rapid_navigation_pages: Mutex<Vec<u32>>,
    clears: AtomicUsize,
    unmounts: AtomicUsize,
    network_changes: AtomicUsize,
    page_removals: AtomicUsize,
    rapid_aborts: AtomicUsize,
    queue_clears: AtomicUsize,
    network_aborts: AtomicUsize,
}

impl RecordingTarget {
    pub(crate) fn set_page_removals(&self, count: usize) {
        self.page_removals.store(count, Ordering::SeqCst);
    }

    pub(crate) fn set_rapid_aborts(&self, count: usize) {
        self.rapid_aborts.store(count, Ordering::SeqCst);
    }

    pub(crate) fn set_queue_clears(&self, count: usize) {
        self.queue_clears.store(count, Ordering::SeqCst);
    }

    pub(crate) fn set_network_aborts(&self, count: usize) {
        self.network_aborts.store(count, Ordering::SeqCst);
    }

    pub(crate) fn cancelled_pages(&self) -> Vec<u32> {
        self.cancelled_pages.lock().clone()
    }

    pub(crate) fn rapid_navigation_pages(&self) -> Vec<u32> {
        self.rapid_navigation_pages.lock().clone()
    }

    pub(crate) fn clears(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }

    pub(crate) fn unmounts(&self) -> usize {
        self.unmounts.load(Ordering::SeqCst)
    }

    pub(crate) fn network_changes(&self) -> usize {
        self.network_changes.load(Ordering::SeqCst)
    }
}

impl CancellationTarget for RecordingTarget {
    fn cancel_page(&self, page: u32) -> usize {
        self.cancelled_pages.lock().push(page);
        self.page_removals.load(Ordering::SeqCst)
    }

    fn clear_queue(&self) -> usize {
        self.clears.fetch_add(1, Ordering::SeqCst);
        self.queue_clears.load(Ordering::SeqCst)
    }

    fn cancel_rapid_navigation(&self, current_page: u32) -> usize {
        self.rapid_navigation_pages.lock().push(current_page);
        self.rapid_aborts.load(Ordering::SeqCst)
    }

    fn cancel_on_network_change(&self) -> usize {
        self.network_changes.fetch_add(1, Ordering::SeqCst);
        self.network_aborts.load(Ordering::SeqCst)
    }

    fn cancel_on_unmount(&self) -> usize {
        self.unmounts.fetch_add(1, Ordering::SeqCst);
        0
    }
}
