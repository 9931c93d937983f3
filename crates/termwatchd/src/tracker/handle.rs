//! Client interface for the window tracker.
//!
//! `TrackerHandle` is cheap to clone and is what the query server holds.
//! Reads never block on a running cycle: the latest snapshot is an `Arc`
//! swapped into a watch channel.

use std::sync::Arc;

use termwatch_core::{WindowId, WindowSnapshot};
use tokio::sync::watch;
use tracing::warn;

use super::{FocusHandler, SnapshotProvider};
use crate::focus::{FocusError, WindowFocuser};

#[derive(Clone)]
pub struct TrackerHandle {
    snapshots: watch::Receiver<Arc<WindowSnapshot>>,
    focuser: Arc<dyn WindowFocuser>,
}

impl TrackerHandle {
    pub fn new(snapshots: watch::Receiver<Arc<WindowSnapshot>>, focuser: Arc<dyn WindowFocuser>) -> Self {
        Self { snapshots, focuser }
    }

    /// Latest published snapshot.
    pub fn latest(&self) -> Arc<WindowSnapshot> {
        Arc::clone(&self.snapshots.borrow())
    }

    /// Waits until a snapshot with at least `generation` is published.
    ///
    /// Returns `None` if the tracker stopped first.
    pub async fn wait_for_generation(&self, generation: u64) -> Option<Arc<WindowSnapshot>> {
        let mut rx = self.snapshots.clone();
        let snapshot = rx.wait_for(|s| s.generation >= generation).await.ok()?;
        Some(Arc::clone(&snapshot))
    }

    /// Focuses a window from the latest snapshot. Blocking.
    pub fn focus_window(&self, id: WindowId) -> Result<(), FocusError> {
        if self.latest().find(&id).is_none() {
            warn!(window = %id, "Focus requested for unknown window");
            return Err(FocusError::TargetNotFound(id));
        }

        self.focuser.focus(id).map_err(|e| {
            warn!(window = %id, error = %e, "Focus failed");
            e
        })
    }
}

impl SnapshotProvider for TrackerHandle {
    fn snapshot(&self) -> Arc<WindowSnapshot> {
        self.latest()
    }
}

impl FocusHandler for TrackerHandle {
    fn focus(&self, id: WindowId) -> Result<(), FocusError> {
        self.focus_window(id)
    }
}
