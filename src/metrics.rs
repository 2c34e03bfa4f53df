// Performance metrics module
//
// Lightweight counters for the sync engine: how often the store rebuilt versus
// patched in place, and whether every binding handle created was released.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Sync-engine metrics.
///
/// Uses atomic operations for thread-safe metric tracking without locks. One
/// instance is shared through an `Arc` by the store, the reorder coordinator
/// and the binding manager of a session.
#[derive(Debug)]
pub struct Metrics {
    /// Full re-derivations of a store's sequence
    pub rebuilds: AtomicU64,

    /// Moves applied to a store's sequence in place
    pub point_moves: AtomicU64,

    /// Order patches a store recognised as its own and skipped
    pub suppressed_rebuilds: AtomicU64,

    /// Foreign order patches applied without a rebuild
    pub patches_applied: AtomicU64,

    /// Gestures rejected at start or cancelled at drop
    pub rejected_gestures: AtomicU64,

    /// Rows bound to an item
    pub binds: AtomicU64,

    /// Rows unbound from an item
    pub unbinds: AtomicU64,

    /// Observer handles currently held by bound rows
    pub live_handles: AtomicU64,

    /// Handles whose release reported a failure
    pub release_failures: AtomicU64,

    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            rebuilds: AtomicU64::new(0),
            point_moves: AtomicU64::new(0),
            suppressed_rebuilds: AtomicU64::new(0),
            patches_applied: AtomicU64::new(0),
            rejected_gestures: AtomicU64::new(0),
            binds: AtomicU64::new(0),
            unbinds: AtomicU64::new(0),
            live_handles: AtomicU64::new(0),
            release_failures: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_rebuild(&self) {
        self.rebuilds.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_point_move(&self) {
        self.point_moves.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_suppressed_rebuild(&self) {
        self.suppressed_rebuilds.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_patch_applied(&self) {
        self.patches_applied.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected_gesture(&self) {
        self.rejected_gestures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a bind that created `handles` observer handles
    pub fn record_bind(&self, handles: usize) {
        self.binds.fetch_add(1, Ordering::Relaxed);
        self.live_handles.fetch_add(handles as u64, Ordering::Relaxed);
    }

    /// Record an unbind that released `handles` observer handles, `failed` of
    /// which reported an error
    pub fn record_unbind(&self, handles: usize, failed: usize) {
        self.unbinds.fetch_add(1, Ordering::Relaxed);
        self.live_handles.fetch_sub(handles as u64, Ordering::Relaxed);
        self.release_failures.fetch_add(failed as u64, Ordering::Relaxed);
    }

    pub fn live_handles(&self) -> u64 {
        self.live_handles.load(Ordering::Relaxed)
    }

    /// Get total uptime
    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Log metrics summary
    pub fn log_summary(&self) {
        tracing::info!("=== Sync Metrics Summary ===");
        tracing::info!("Uptime: {:.2}s", self.uptime().as_secs_f64());
        tracing::info!(
            "Store: {} rebuilds, {} point moves, {} suppressed, {} patches applied",
            self.rebuilds.load(Ordering::Relaxed),
            self.point_moves.load(Ordering::Relaxed),
            self.suppressed_rebuilds.load(Ordering::Relaxed),
            self.patches_applied.load(Ordering::Relaxed)
        );
        tracing::info!(
            "Rows: {} binds, {} unbinds, {} live handles, {} release failures",
            self.binds.load(Ordering::Relaxed),
            self.unbinds.load(Ordering::Relaxed),
            self.live_handles(),
            self.release_failures.load(Ordering::Relaxed)
        );
        tracing::info!(
            "Rejected gestures: {}",
            self.rejected_gestures.load(Ordering::Relaxed)
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
