use alloy_primitives::B256;
use engine_reth_primitives::SealedHeader;
use schnellru::{ByLength, LruMap};

/// Default bound on the number of invalid headers retained.
///
/// Mirrors [`reth_engine_payload_cache::DEFAULT_CACHE_CAPACITY`](../reth_engine_payload_cache/constant.DEFAULT_CACHE_CAPACITY.html)'s
/// rationale: unbounded retention of rejected blocks from a misbehaving or adversarial peer would
/// be a memory-growth vector, and a consensus client does not re-submit the same invalid payload
/// indefinitely.
pub const DEFAULT_INVALID_HEADER_CACHE_CAPACITY: u32 = 256;

/// Remembers headers that failed validation, so that any descendant submitted later can be
/// rejected immediately with the correct `latestValidHash` instead of being re-validated (and
/// re-failing) from scratch.
#[derive(Debug)]
pub struct InvalidHeaderCache {
    headers: LruMap<B256, SealedHeader, ByLength>,
}

impl Default for InvalidHeaderCache {
    fn default() -> Self {
        Self::new(DEFAULT_INVALID_HEADER_CACHE_CAPACITY)
    }
}

impl InvalidHeaderCache {
    /// Creates a cache bounded to `capacity` entries.
    pub fn new(capacity: u32) -> Self {
        Self { headers: LruMap::new(ByLength::new(capacity)) }
    }

    /// Returns the cached header for `hash`, if it was previously marked invalid.
    pub fn get(&mut self, hash: &B256) -> Option<SealedHeader> {
        self.headers.get(hash).cloned()
    }

    /// Marks `header` as invalid.
    pub fn insert(&mut self, header: SealedHeader) {
        self.headers.insert(header.hash(), header);
    }

    /// Marks `descendant_hash` as invalid because it descends from `invalid_ancestor`, which is
    /// already known to be invalid. Propagates the rejection down the submitted chain without
    /// re-running validation on a block whose ancestor has already failed.
    pub fn insert_with_invalid_ancestor(
        &mut self,
        descendant_hash: B256,
        invalid_ancestor: SealedHeader,
    ) {
        self.headers.insert(descendant_hash, invalid_ancestor);
    }
}
