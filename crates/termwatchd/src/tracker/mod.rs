//! Window tracker: the fixed-interval refresh loop.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐ tick ┌────────────────────┐ Arc<WindowSnapshot> ┌───────────────┐
//! │   interval   │─────▶│ RefreshCycle       │────────────────────▶│ watch channel │
//! │ (tokio task) │      │ (spawn_blocking)   │                     └───────┬───────┘
//! └──────────────┘      └────────────────────┘                             │ borrow
//!                                                                          ▼
//!                                                                  ┌───────────────┐
//!                                                                  │ TrackerHandle │
//!                                                                  └───────────────┘
//! ```
//!
//! A tick that arrives while the previous cycle is still running is
//! skipped. A cycle that yields nothing new leaves the previous snapshot
//! in place, so readers always see a complete snapshot.
//!
//! # Panic-Free Guarantees
//!
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - A cycle that panics is logged; the lock it poisoned is recovered and
//!   the loop carries on with the next tick

mod cycle;
mod handle;

pub use cycle::{CycleOutcome, CycleSources, RefreshCycle, SkipReason};
pub use handle::TrackerHandle;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use termwatch_core::{WindowId, WindowSnapshot};
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::focus::{FocusError, WindowFocuser};

// ============================================================================
// Seams
// ============================================================================

/// Read access to the latest published snapshot.
pub trait SnapshotProvider: Send + Sync {
    fn snapshot(&self) -> Arc<WindowSnapshot>;
}

/// Focus-by-id. Blocking; async callers should use `spawn_blocking`.
pub trait FocusHandler: Send + Sync {
    fn focus(&self, id: WindowId) -> Result<(), FocusError>;
}

/// Errors from the tracker loop.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("refresh cycle task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

// ============================================================================
// Tracker
// ============================================================================

/// Owns the refresh cycle and the publishing side of the snapshot channel.
pub struct Tracker {
    cycle: RefreshCycle,
    sender: watch::Sender<Arc<WindowSnapshot>>,
    generation: u64,
}

impl Tracker {
    /// Creates a tracker and its handle. Nothing runs until [`tick`] or
    /// [`spawn`] is called.
    ///
    /// [`tick`]: Tracker::tick
    /// [`spawn`]: Tracker::spawn
    pub fn new(cycle: RefreshCycle, focuser: Arc<dyn WindowFocuser>) -> (Self, TrackerHandle) {
        let (sender, receiver) = watch::channel(Arc::new(WindowSnapshot::default()));
        let tracker = Self {
            cycle,
            sender,
            generation: 0,
        };
        (tracker, TrackerHandle::new(receiver, focuser))
    }

    /// Runs one cycle and publishes its result. Blocking.
    pub fn tick(&mut self) -> CycleOutcome {
        let outcome = self.cycle.run();
        if let CycleOutcome::Publish(windows) = &outcome {
            self.generation += 1;
            let snapshot = WindowSnapshot::new(self.generation, windows.clone());
            self.sender.send_replace(Arc::new(snapshot));
        }
        outcome
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn cycle(&self) -> &RefreshCycle {
        &self.cycle
    }

    /// Drives [`tick`](Tracker::tick) every `period` until `cancel` fires.
    pub fn spawn(self, period: Duration, cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
        let tracker = Arc::new(Mutex::new(self));
        let busy = Arc::new(AtomicBool::new(false));

        tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            info!(interval_ms = period.as_millis() as u64, "Window tracker started");

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        info!("Window tracker shutdown requested");
                        break;
                    }

                    _ = ticker.tick() => {
                        if busy.swap(true, Ordering::AcqRel) {
                            debug!("Previous cycle still running, skipping tick");
                            continue;
                        }

                        let tracker = Arc::clone(&tracker);
                        let busy = Arc::clone(&busy);
                        tokio::spawn(async move {
                            if let Err(e) = run_blocking_tick(tracker).await {
                                error!(error = %e, "Refresh cycle failed");
                            }
                            busy.store(false, Ordering::Release);
                        });
                    }
                }
            }
        })
    }
}

async fn run_blocking_tick(tracker: Arc<Mutex<Tracker>>) -> Result<(), TrackerError> {
    tokio::task::spawn_blocking(move || {
        let mut tracker = tracker.lock().unwrap_or_else(|poisoned| {
            warn!("Previous refresh cycle panicked, recovering tracker state");
            poisoned.into_inner()
        });
        if let CycleOutcome::Skipped(reason) = tracker.tick() {
            debug!(?reason, "Cycle skipped");
        }
    })
    .await?;
    Ok(())
}
