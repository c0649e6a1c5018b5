use std::sync::atomic::{AtomicBool, Ordering};

/// The one-way TTD-reached and finalized-PoS transitions, shared by every component that must
/// know which side of the Merge the chain currently sits on.
///
/// Both flags only ever go `false → true`; a monotone flag needs no locking beyond a
/// release-store/acquire-load discipline, so every component that reads it holds a shared
/// reference rather than a lock guard.
#[derive(Debug, Default)]
pub struct MergeLatch {
    ttd_reached: AtomicBool,
    pos_finalized: AtomicBool,
}

impl MergeLatch {
    /// Creates a latch in the `PreMerge` state.
    pub const fn new() -> Self {
        Self { ttd_reached: AtomicBool::new(false), pos_finalized: AtomicBool::new(false) }
    }

    /// Returns whether the TTD has been reached (`PreMerge` → `Transitioned` has fired).
    pub fn ttd_reached(&self) -> bool {
        self.ttd_reached.load(Ordering::Acquire)
    }

    /// Returns whether PoS finality has been observed (`Transitioned` → `Finalized` has fired).
    pub fn pos_finalized(&self) -> bool {
        self.pos_finalized.load(Ordering::Acquire)
    }

    /// Latches `ttdReached`. Idempotent: latching an already-latched flag is a no-op.
    ///
    /// Returns `true` if this call performed the transition (i.e. the flag was previously unset).
    pub fn latch_ttd_reached(&self) -> bool {
        !self.ttd_reached.swap(true, Ordering::AcqRel)
    }

    /// Latches `posFinalized`. Idempotent, and implies `ttdReached`: a finalized pointer cannot
    /// exist pre-Merge, so latching finality also latches the TTD flag if it hasn't fired yet.
    ///
    /// Returns `true` if this call performed the `posFinalized` transition.
    pub fn latch_pos_finalized(&self) -> bool {
        self.ttd_reached.store(true, Ordering::Release);
        !self.pos_finalized.swap(true, Ordering::AcqRel)
    }

    /// Returns `true` while the pre-Merge sealing loop is still permitted to run.
    pub fn sealing_loop_active(&self) -> bool {
        !self.ttd_reached()
    }

    /// Returns `true` once legacy (pre-Merge) sync should be abandoned.
    pub fn legacy_sync_abandoned(&self) -> bool {
        self.pos_finalized()
    }
}
