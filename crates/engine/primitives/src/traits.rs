use crate::error::EngineError;
use alloy_primitives::{Address, BlockNumber, B256, U256};
use async_trait::async_trait;
use engine_reth_primitives::{Header, SealedBlock, SealedHeader};

/// Execution outcome of running a block's transactions against its parent's post-state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutionOutcome {
    /// State root after applying the block.
    pub state_root: B256,
    /// Root of the block's receipts trie.
    pub receipts_root: B256,
    /// Bloom filter over all logs emitted.
    pub logs_bloom: alloy_primitives::Bloom,
    /// Total gas used by the block.
    pub gas_used: u64,
}

/// The EVM interpreter and account state database, referenced only by the contract this
/// subsystem needs: execute a block against its parent's state, and report whether a given
/// block's post-state is available locally.
///
/// Out of scope per the purpose & scope section; this trait is the narrow seam the Engine
/// subsystem calls through rather than depending on the executor's implementation.
#[async_trait]
pub trait StateExecutor: Send + Sync {
    /// Executes `body`'s transactions against the post-state of `parent`, returning the
    /// resulting state root, receipts root, logs bloom and gas used, or an error describing why
    /// execution failed (becomes `PayloadStatusEnum::Invalid`).
    async fn execute(
        &self,
        parent: &SealedHeader,
        header: &Header,
        body: &engine_reth_primitives::BlockBody,
    ) -> Result<ExecutionOutcome, EngineError>;

    /// Returns whether the post-state for the block identified by `hash` is available locally.
    ///
    /// `false` models a snap-sync gap: the header is known but the state behind it has not been
    /// downloaded, which the newPayload algorithm must treat as recoverable (`ACCEPTED`), not a
    /// validation failure.
    async fn have_block_and_state(&self, hash: B256) -> bool;
}

/// The chain database: header/body/receipt storage, the total-difficulty index, and the
/// canonical-number index.
///
/// Ownership per the data model: the chain database exclusively owns persisted headers, bodies,
/// receipts and the canonical-number index. The engine subsystem only ever holds references to
/// entries by hash.
#[async_trait]
pub trait ChainDatabase: Send + Sync {
    /// Looks up a header by hash, searching both the canonical and the non-canonical side-block
    /// sets.
    async fn header_by_hash(&self, hash: B256) -> Option<SealedHeader>;

    /// Looks up the canonical header at a given block number.
    async fn canonical_header_by_number(&self, number: BlockNumber) -> Option<SealedHeader>;

    /// Returns the hash currently indexed as canonical at `number`, if any.
    async fn canonical_hash_by_number(&self, number: BlockNumber) -> Option<B256>;

    /// Returns the total difficulty accumulated up to and including `hash`, if known.
    async fn total_difficulty_by_hash(&self, hash: B256) -> Option<U256>;

    /// Returns the current canonical chain tip.
    async fn canonical_tip(&self) -> SealedHeader;

    /// Persists `block` and `outcome` as a non-canonical side block: header, body, receipts and
    /// the total-difficulty index are updated, but the canonical-number index is left untouched.
    async fn insert_side_block(
        &self,
        block: &SealedBlock,
        outcome: &ExecutionOutcome,
    ) -> Result<(), EngineError>;

    /// Atomically rewrites the canonical-number index so that `header` becomes the canonical
    /// tip, walking back to the nearest common ancestor and re-applying the new branch forward.
    /// Either the whole rewrite is observable or none of it is, per the atomicity requirement.
    async fn set_canonical(&self, header: &SealedHeader) -> Result<(), EngineError>;

    /// Persists the finalized-block pointer.
    async fn set_finalized(&self, hash: B256) -> Result<(), EngineError>;

    /// Persists the safe-block pointer.
    async fn set_safe(&self, hash: B256) -> Result<(), EngineError>;
}

/// The transaction pool's narrow message interface, per the design notes' translation of
/// callback hooks into a typed interface.
#[async_trait]
pub trait TransactionPoolHandle: Send + Sync {
    /// Returns the block hash the pool currently considers its head, used to detect whether the
    /// pool needs to rebase before assembling against a new parent.
    async fn current_head(&self) -> B256;

    /// Asks the pool to produce an ordered transaction list honoring `gas_limit`, built against
    /// `parent` with the given post-Merge environment.
    async fn assemble_block(
        &self,
        parent: B256,
        timestamp: u64,
        prev_randao: B256,
        suggested_fee_recipient: Address,
        gas_limit: u64,
    ) -> Result<Vec<alloy_primitives::Bytes>, EngineError>;

    /// Notifies the pool that the canonical head changed, so it can drop now-included or
    /// now-invalid transactions and rebase its pending set.
    async fn head_changed(&self, new_head: &SealedHeader);
}
