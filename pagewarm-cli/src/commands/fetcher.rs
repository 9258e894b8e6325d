//! Simulated page fetcher.
//!
//! Stands in for a real page loader: every fetch sleeps for a fixed latency
//! and fails with a configurable probability. Fetches watch their abort
//! handle and return early when cancelled.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use pagewarm::navigation::PageFetcher;
use pagewarm::prefetch::{AbortHandle, FetchError};
use parking_lot::Mutex;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::trace;

/// Fetcher with fixed latency and random failures.
pub struct SimulatedFetcher {
    latency: Duration,
    failure_rate: f64,
    rng: Mutex<SmallRng>,
    started: AtomicU64,
    interrupted: Arc<AtomicU64>,
}

impl SimulatedFetcher {
    /// `failure_rate` is clamped to `0.0..=1.0`.
    pub fn new(latency: Duration, failure_rate: f64, seed: u64) -> Self {
        Self {
            latency,
            failure_rate: failure_rate.clamp(0.0, 1.0),
            rng: Mutex::new(SmallRng::seed_from_u64(seed)),
            started: AtomicU64::new(0),
            interrupted: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Fetches that began executing.
    pub fn started(&self) -> u64 {
        self.started.load(Ordering::Relaxed)
    }

    /// Fetches that stopped early because their handle was aborted.
    pub fn interrupted(&self) -> u64 {
        self.interrupted.load(Ordering::Relaxed)
    }
}

impl PageFetcher for SimulatedFetcher {
    fn fetch(&self, page: u32, abort: AbortHandle) -> BoxFuture<'static, Result<(), FetchError>> {
        self.started.fetch_add(1, Ordering::Relaxed);
        let fails = self.rng.lock().gen_bool(self.failure_rate);
        let latency = self.latency;
        let interrupted = Arc::clone(&self.interrupted);

        async move {
            tokio::select! {
                _ = abort.cancelled() => {
                    interrupted.fetch_add(1, Ordering::Relaxed);
                    trace!(page, "Simulated fetch interrupted");
                    Ok(())
                }
                _ = tokio::time::sleep(latency) => {
                    if fails {
                        Err(FetchError::new(format!("simulated failure loading page {}", page)))
                    } else {
                        Ok(())
                    }
                }
            }
        }
        .boxed()
    }
}
