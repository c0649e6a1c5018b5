use alloy_primitives::{B256, U256};
use engine_reth_primitives::{transactions_root, Block, BlockBody, Header, SealedBlock, SealedHeader};
use reth_engine_primitives::{ChainDatabase, EngineError, StateExecutor, TransactionPoolHandle};

use crate::invalid_headers::InvalidHeaderCache;

/// Upper bound the chain inserter enforces on `extraData`: Clique's 32-byte vanity prefix plus its
/// 65-byte seal (EIP-225). The Engine API's stricter 32-byte cap on post-Merge payloads is checked
/// closer to the wire, in the beacon consensus engine's `newPayload` handler.
const MAX_EXTRA_DATA_WITH_CLIQUE_SEAL: usize = 32 + 65;

/// Why [`ChainInserter::insert_side_block`] rejected a block.
///
/// Mirrors the failure modes named in the component design for `insertSideBlock`.
#[derive(Debug, thiserror::Error)]
pub enum ChainInsertError {
    /// A structural header check failed (gas accounting, base fee formula, extra data length,
    /// timestamp ordering, or a transactions-root mismatch against the body).
    #[error("header rejected: {0}")]
    HeaderRejected(String),
    /// The state executor reported a failure running the block's transactions.
    #[error("transaction rejected at index {index}: {reason}")]
    TxRejected {
        /// Index of the offending transaction within the block body.
        index: usize,
        /// Human-readable rejection reason.
        reason: String,
    },
    /// Execution succeeded but produced a state or receipts root different from the one the
    /// header advertised.
    #[error("state mismatch: expected {expected}, got {got}")]
    StateMismatch {
        /// Root advertised by the header.
        expected: B256,
        /// Root actually produced by execution.
        got: B256,
    },
    /// The chain database rejected the write.
    #[error(transparent)]
    Storage(#[from] EngineError),
}

/// Validates a candidate block against its parent and, on success, persists it as a
/// non-canonical side block; also performs the atomic canonical-index rewrite that promotes a
/// side block (or an existing branch) to the canonical tip.
///
/// Holds no internal locking: per the concurrency model the payload cache and the chain
/// inserter's own bookkeeping (the invalid-header cache) are only ever touched from the single
/// event-loop thread that also owns the Engine API surface.
pub struct ChainInserter<D, X> {
    db: D,
    executor: X,
    invalid_headers: InvalidHeaderCache,
}

impl<D, X> ChainInserter<D, X>
where
    D: ChainDatabase,
    X: StateExecutor,
{
    /// Creates a new chain inserter over the given chain database and state executor.
    pub fn new(db: D, executor: X) -> Self {
        Self { db, executor, invalid_headers: InvalidHeaderCache::default() }
    }

    /// Returns a reference to the underlying chain database.
    pub const fn database(&self) -> &D {
        &self.db
    }

    /// Returns a reference to the underlying state executor.
    pub const fn executor(&self) -> &X {
        &self.executor
    }

    /// Records `header` as invalid so that descendants submitted later are rejected immediately.
    pub fn mark_invalid(&mut self, header: SealedHeader) {
        self.invalid_headers.insert(header);
    }

    /// Walks `parent_hash` up through the invalid-header cache until it finds an ancestor that is
    /// either present in the chain database or has no recorded (invalid) parent, returning its
    /// hash. Returns the zero hash if no such ancestor is found, mirroring the "parent is the
    /// terminal PoW block" edge case in the invalid-payload response rules.
    pub async fn latest_valid_hash_for_invalid_payload(&mut self, parent_hash: B256) -> B256 {
        if self.db.header_by_hash(parent_hash).await.is_some() {
            return parent_hash;
        }

        let mut current = parent_hash;
        while let Some(header) = self.invalid_headers.get(&current) {
            current = header.parent_hash;
            if self.db.header_by_hash(current).await.is_some() {
                return current;
            }
        }
        B256::ZERO
    }

    /// Checks whether `hash` is a known-invalid header or the descendant of one, propagating the
    /// rejection to `head` if so, and returning the ready-to-send invalid status.
    pub async fn check_invalid_ancestor(
        &mut self,
        hash: B256,
        head: B256,
    ) -> Option<reth_engine_primitives::PayloadStatus> {
        let invalid = self.invalid_headers.get(&hash)?;
        let latest_valid_hash = self.latest_valid_hash_for_invalid_payload(invalid.parent_hash).await;
        self.invalid_headers.insert_with_invalid_ancestor(head, invalid);
        Some(reth_engine_primitives::PayloadStatus::invalid(
            latest_valid_hash,
            "links to a previously rejected payload",
        ))
    }

    /// Walks ancestors of `from` until one with total difficulty at or above `ttd` is found,
    /// returning its hash; returns the zero hash if every ancestor (including `from`) predates
    /// the Merge.
    pub async fn latest_valid_ancestor(&self, from: B256, ttd: U256) -> B256 {
        let mut current = from;
        loop {
            let Some(td) = self.db.total_difficulty_by_hash(current).await else {
                return B256::ZERO;
            };
            if td >= ttd {
                return current;
            }
            let Some(header) = self.db.header_by_hash(current).await else {
                return B256::ZERO;
            };
            if header.number == 0 {
                return B256::ZERO;
            }
            current = header.parent_hash;
        }
    }

    /// Validates `header`/`body` against `parent` and, on success, persists the block as a
    /// non-canonical side block. Does not touch the canonical-number index.
    pub async fn insert_side_block(
        &mut self,
        parent: &SealedHeader,
        header: Header,
        body: BlockBody,
    ) -> Result<SealedBlock, ChainInsertError> {
        if header.gas_used > header.gas_limit {
            return Err(ChainInsertError::HeaderRejected(format!(
                "gasUsed {} exceeds gasLimit {}",
                header.gas_used, header.gas_limit
            )));
        }

        // The Engine API's own extraData <= 32 byte cap is enforced at the payload assembler and
        // newPayload boundary instead: the chain inserter also has to accept Clique-sealed
        // headers, whose extraData carries a 32-byte vanity prefix plus a 65-byte seal (EIP-225).
        if header.extra_data.len() > MAX_EXTRA_DATA_WITH_CLIQUE_SEAL {
            return Err(ChainInsertError::HeaderRejected(format!(
                "extraData length {} exceeds {MAX_EXTRA_DATA_WITH_CLIQUE_SEAL}",
                header.extra_data.len()
            )));
        }

        if header.timestamp <= parent.timestamp {
            return Err(ChainInsertError::HeaderRejected("invalid timestamp".to_string()));
        }

        let expected_tx_root = transactions_root(&body.transactions);
        if header.transactions_root != expected_tx_root {
            return Err(ChainInsertError::HeaderRejected(format!(
                "transactions root mismatch: header {}, computed {expected_tx_root}",
                header.transactions_root
            )));
        }

        let outcome = self
            .executor
            .execute(parent, &header, &body)
            .await
            .map_err(|err| ChainInsertError::TxRejected { index: 0, reason: err.to_string() })?;

        if outcome.state_root != header.state_root {
            return Err(ChainInsertError::StateMismatch {
                expected: header.state_root,
                got: outcome.state_root,
            });
        }

        if outcome.receipts_root != header.receipts_root {
            return Err(ChainInsertError::StateMismatch {
                expected: header.receipts_root,
                got: outcome.receipts_root,
            });
        }

        let block = Block { header, body }.seal_slow();
        self.db
            .insert_side_block(&block, &outcome)
            .await
            .map_err(ChainInsertError::Storage)?;

        Ok(block)
    }

    /// Atomically rewrites the canonical-number index so `header` becomes the canonical tip, and
    /// notifies the transaction pool of the new head.
    pub async fn set_canonical(
        &mut self,
        header: &SealedHeader,
        pool: &dyn TransactionPoolHandle,
    ) -> Result<(), EngineError> {
        self.db.set_canonical(header).await?;
        pool.head_changed(header).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_consensus::Header as AlloyHeader;
    use alloy_primitives::{Address, BlockNumber, Bloom, Bytes};
    use async_trait::async_trait;
    use reth_engine_primitives::ExecutionOutcome;
    use std::{collections::HashMap, sync::Mutex};

    #[derive(Default)]
    struct StubDb {
        side_blocks: Mutex<Vec<B256>>,
        total_difficulty: HashMap<B256, U256>,
        headers: HashMap<B256, SealedHeader>,
    }

    #[async_trait]
    impl ChainDatabase for StubDb {
        async fn header_by_hash(&self, hash: B256) -> Option<SealedHeader> {
            self.headers.get(&hash).cloned()
        }

        async fn canonical_header_by_number(&self, _number: BlockNumber) -> Option<SealedHeader> {
            None
        }

        async fn canonical_hash_by_number(&self, _number: BlockNumber) -> Option<B256> {
            None
        }

        async fn total_difficulty_by_hash(&self, hash: B256) -> Option<U256> {
            self.total_difficulty.get(&hash).copied()
        }

        async fn canonical_tip(&self) -> SealedHeader {
            SealedHeader::seal_slow(AlloyHeader::default())
        }

        async fn insert_side_block(
            &self,
            block: &SealedBlock,
            _outcome: &ExecutionOutcome,
        ) -> Result<(), EngineError> {
            self.side_blocks.lock().unwrap().push(block.hash());
            Ok(())
        }

        async fn set_canonical(&self, _header: &SealedHeader) -> Result<(), EngineError> {
            Ok(())
        }

        async fn set_finalized(&self, _hash: B256) -> Result<(), EngineError> {
            Ok(())
        }

        async fn set_safe(&self, _hash: B256) -> Result<(), EngineError> {
            Ok(())
        }
    }

    struct StubExecutor;

    #[async_trait]
    impl StateExecutor for StubExecutor {
        async fn execute(
            &self,
            _parent: &SealedHeader,
            header: &Header,
            _body: &BlockBody,
        ) -> Result<ExecutionOutcome, EngineError> {
            Ok(ExecutionOutcome {
                state_root: header.state_root,
                receipts_root: header.receipts_root,
                logs_bloom: Bloom::default(),
                gas_used: header.gas_used,
            })
        }

        async fn have_block_and_state(&self, _hash: B256) -> bool {
            true
        }
    }

    struct StubPool;

    #[async_trait]
    impl TransactionPoolHandle for StubPool {
        async fn current_head(&self) -> B256 {
            B256::ZERO
        }

        async fn assemble_block(
            &self,
            _parent: B256,
            _timestamp: u64,
            _prev_randao: B256,
            _suggested_fee_recipient: Address,
            _gas_limit: u64,
        ) -> Result<Vec<Bytes>, EngineError> {
            Ok(vec![])
        }

        async fn head_changed(&self, _new_head: &SealedHeader) {}
    }

    #[tokio::test]
    async fn rejects_non_increasing_timestamp() {
        let mut inserter = ChainInserter::new(StubDb::default(), StubExecutor);
        let parent = SealedHeader::seal_slow(AlloyHeader { number: 1, timestamp: 100, ..Default::default() });
        let header =
            AlloyHeader { number: 2, parent_hash: parent.hash(), timestamp: 100, ..Default::default() };
        let err = inserter
            .insert_side_block(&parent, header, BlockBody::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ChainInsertError::HeaderRejected(_)));
    }

    #[tokio::test]
    async fn accepts_matching_roots_and_persists() {
        let mut inserter = ChainInserter::new(StubDb::default(), StubExecutor);
        let parent = SealedHeader::seal_slow(AlloyHeader { number: 1, timestamp: 100, ..Default::default() });
        let empty_root = transactions_root(&[]);
        let header = AlloyHeader {
            number: 2,
            parent_hash: parent.hash(),
            timestamp: 101,
            transactions_root: empty_root,
            ..Default::default()
        };
        let block = inserter
            .insert_side_block(&parent, header, BlockBody::default())
            .await
            .unwrap();
        assert_eq!(block.number(), 2);
        assert_eq!(inserter.db.side_blocks.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn latest_valid_ancestor_stops_at_ttd() {
        let genesis = SealedHeader::seal_slow(AlloyHeader { number: 0, ..Default::default() });
        let mid = SealedHeader::seal_slow(AlloyHeader {
            number: 1,
            parent_hash: genesis.hash(),
            ..Default::default()
        });

        let mut db = StubDb::default();
        db.total_difficulty.insert(genesis.hash(), U256::from(5));
        db.total_difficulty.insert(mid.hash(), U256::from(15));
        db.headers.insert(genesis.hash(), genesis.clone());
        db.headers.insert(mid.hash(), mid.clone());

        let inserter = ChainInserter::new(db, StubExecutor);
        let ancestor = inserter.latest_valid_ancestor(mid.hash(), U256::from(10)).await;
        assert_eq!(ancestor, mid.hash());

        let ancestor = inserter.latest_valid_ancestor(genesis.hash(), U256::from(10)).await;
        assert_eq!(ancestor, B256::ZERO);
    }
}
