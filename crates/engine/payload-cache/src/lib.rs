//! Bounded, single-writer caches bridging the gap between the four Engine API calls.
//!
//! Two maps, each a strict-LRU `schnellru::LruMap` bounded by entry count: assembled payloads
//! keyed by payload identifier (read once by `getPayload`), and buffered blocks keyed by block
//! hash (read once a subsequent fork-choice update resolves their parent). The buffered map
//! stores the full sealed block rather than just the header: the data model describes it as a
//! "buffered header", but a `forkchoiceUpdated` that resolves one must still execute and insert
//! it (testable properties scenario 2), which needs the transaction list too. Neither map is
//! locked: the concurrency model gives the payload cache single-threaded access from the event
//! loop that owns the Engine API surface.

use alloy_rpc_types_engine::PayloadId;
use engine_reth_primitives::{SealedBlock, B256};
use schnellru::{ByLength, LruMap};

/// Default bound for both maps.
///
/// Not documented upstream; the design notes call this an open question and ask for a small
/// constant to be picked explicitly. 10 matches what a consensus client's own re-request window
/// typically needs (it rarely asks for a payload it requested more than a handful of
/// `forkchoiceUpdated` calls ago), and keeps worst-case memory bounded to a handful of blocks.
pub const DEFAULT_CACHE_CAPACITY: u32 = 10;

/// Holds assembled payloads pending `getPayload`, and blocks buffered while their parent is
/// unknown or unvalidated, pending a `forkchoiceUpdated` that resolves them.
#[derive(Debug)]
pub struct PayloadCache {
    assembled: LruMap<PayloadId, SealedBlock, ByLength>,
    buffered: LruMap<B256, SealedBlock, ByLength>,
}

impl Default for PayloadCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl PayloadCache {
    /// Creates a cache with both maps bounded to `capacity` entries.
    pub fn new(capacity: u32) -> Self {
        Self {
            assembled: LruMap::new(ByLength::new(capacity)),
            buffered: LruMap::new(ByLength::new(capacity)),
        }
    }

    /// Stores a freshly assembled payload, evicting the least-recently-used entry if the map is
    /// at capacity.
    pub fn insert_assembled(&mut self, id: PayloadId, block: SealedBlock) {
        self.assembled.insert(id, block);
    }

    /// Retrieves a previously assembled payload by identifier.
    ///
    /// Per the getPayload contract this does not remove the entry: a consensus client is allowed
    /// to call `getPayload` more than once for the same identifier, and the cache's own LRU
    /// eviction — not a one-shot take — governs its lifetime.
    pub fn get_assembled(&mut self, id: &PayloadId) -> Option<&SealedBlock> {
        self.assembled.get(id).map(|block| &*block)
    }

    /// Buffers a block whose parent was not yet known or validated, keyed by the block's own
    /// hash so a later `forkchoiceUpdated` can resolve it.
    pub fn buffer_block(&mut self, hash: B256, block: SealedBlock) {
        self.buffered.insert(hash, block);
    }

    /// Looks up (without removing) a buffered block by hash.
    pub fn get_buffered(&mut self, hash: &B256) -> Option<&SealedBlock> {
        self.buffered.get(hash).map(|block| &*block)
    }

    /// Removes and returns a buffered block, used once a fork-choice update resolves it into the
    /// canonical chain.
    pub fn take_buffered(&mut self, hash: &B256) -> Option<SealedBlock> {
        self.buffered.remove(hash)
    }

    /// Number of assembled payloads currently cached.
    pub fn assembled_len(&self) -> usize {
        self.assembled.len()
    }

    /// Number of buffered blocks currently cached.
    pub fn buffered_len(&self) -> usize {
        self.buffered.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_consensus::Header as AlloyHeader;
    use engine_reth_primitives::{Block, BlockBody};

    fn sealed_block(number: u64) -> SealedBlock {
        let header = AlloyHeader { number, ..Default::default() };
        Block { header, body: BlockBody::default() }.seal_slow()
    }

    #[test]
    fn assembled_payload_round_trips() {
        let mut cache = PayloadCache::new(2);
        let id = PayloadId::new([1u8; 8]);
        let block = sealed_block(1);
        cache.insert_assembled(id, block.clone());
        assert_eq!(cache.get_assembled(&id), Some(&block));
    }

    #[test]
    fn capacity_evicts_least_recently_used() {
        let mut cache = PayloadCache::new(2);
        let a = PayloadId::new([1u8; 8]);
        let b = PayloadId::new([2u8; 8]);
        let c = PayloadId::new([3u8; 8]);
        cache.insert_assembled(a, sealed_block(1));
        cache.insert_assembled(b, sealed_block(2));
        cache.insert_assembled(c, sealed_block(3));
        assert_eq!(cache.assembled_len(), 2);
        assert!(cache.get_assembled(&a).is_none());
        assert!(cache.get_assembled(&b).is_some());
        assert!(cache.get_assembled(&c).is_some());
    }

    #[test]
    fn buffered_block_can_be_taken_once() {
        let mut cache = PayloadCache::new(4);
        let block = sealed_block(1);
        let hash = block.hash();
        cache.buffer_block(hash, block);
        assert!(cache.get_buffered(&hash).is_some());
        assert!(cache.take_buffered(&hash).is_some());
        assert!(cache.take_buffered(&hash).is_none());
    }
}
