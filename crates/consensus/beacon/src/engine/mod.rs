//! The beacon consensus engine: the actor that owns the merge latch, the payload cache and the
//! fork-choice state, and drives the chain inserter and payload assembler in response to the four
//! Engine API calls.
//!
//! One actor per running node, reached only through a [`BeaconConsensusEngineHandle`]. Every
//! message is processed to completion before the next is read off the channel, which is what
//! gives the concurrency model's single-writer guarantee on the payload cache and the
//! forkchoice-state tracker: two concurrent `forkchoiceUpdated` calls are serialized by the
//! channel itself, not by a lock.

mod error;
mod event;
mod forkchoice;
mod handle;
mod message;
mod wire;

pub use error::{BeaconForkChoiceUpdateError, BeaconOnNewPayloadError};
pub use event::{BeaconConsensusEngineEvent, EventListeners};
pub use forkchoice::ForkchoiceStateTracker;
pub use handle::BeaconConsensusEngineHandle;
pub use message::{BeaconEngineMessage, OnForkChoiceUpdated};
pub use wire::{block_from_payload, payload_from_block};

use alloy_primitives::{B256, U256};
use alloy_rpc_types_engine::{
    ExecutionPayloadV1, ForkchoiceState, PayloadAttributes, PayloadId, TransitionConfiguration,
};
use engine_reth_primitives::SealedHeader;
use reth_engine_payload_cache::PayloadCache;
use reth_engine_primitives::{
    ChainDatabase, EngineError, MergeLatch, PayloadStatus, StateExecutor, TransactionPoolHandle,
};
use reth_engine_tree::ChainInserter;
use std::sync::Arc;
use tokio::sync::mpsc;

/// `extraData` may not exceed 32 bytes on a post-Merge payload, per the data model's Block Header
/// invariant.
const MAX_PAYLOAD_EXTRA_DATA_BYTES: usize = 32;

/// Configuration the beacon consensus engine needs at construction time: the values that, per the
/// data model, are derived from genesis and compared bit-exact against the consensus client's.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// The terminal total difficulty.
    pub ttd: U256,
    /// The transition configuration returned verbatim by `exchangeTransitionConfiguration`.
    pub transition_configuration: TransitionConfiguration,
    /// Bound on both payload-cache maps; see [`reth_engine_payload_cache::DEFAULT_CACHE_CAPACITY`].
    pub payload_cache_capacity: u32,
}

/// The Engine API driver: implements the newPayload / forkchoiceUpdated / getPayload /
/// exchangeTransitionConfiguration algorithms from the component design over a generic chain
/// database, state executor and transaction pool.
pub struct BeaconConsensusEngine<D, X, P> {
    inserter: ChainInserter<D, X>,
    pool: P,
    cache: PayloadCache,
    latch: Arc<MergeLatch>,
    config: EngineConfig,
    fcu_tracker: ForkchoiceStateTracker,
    finalized: Option<SealedHeader>,
    safe: Option<SealedHeader>,
    listeners: EventListeners,
    rx: mpsc::UnboundedReceiver<BeaconEngineMessage>,
}

impl<D, X, P> BeaconConsensusEngine<D, X, P>
where
    D: ChainDatabase,
    X: StateExecutor,
    P: TransactionPoolHandle,
{
    /// Spawns a new engine actor, returning the cheaply cloneable handle used to reach it and the
    /// actor itself, which the caller is responsible for driving with [`Self::run`] (e.g. via
    /// `tokio::spawn`).
    pub fn new(
        db: D,
        executor: X,
        pool: P,
        latch: Arc<MergeLatch>,
        config: EngineConfig,
    ) -> (BeaconConsensusEngineHandle, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        let engine = Self {
            inserter: ChainInserter::new(db, executor),
            pool,
            cache: PayloadCache::new(config.payload_cache_capacity),
            latch,
            config,
            fcu_tracker: ForkchoiceStateTracker::default(),
            finalized: None,
            safe: None,
            listeners: EventListeners::default(),
            rx,
        };
        (BeaconConsensusEngineHandle::new(tx), engine)
    }

    /// Drives the actor to completion, processing messages until every handle has been dropped.
    pub async fn run(mut self) {
        while let Some(message) = self.rx.recv().await {
            self.handle_message(message).await;
        }
        tracing::debug!(target: "engine::tree", "beacon consensus engine shutting down, no handles remain");
    }

    async fn handle_message(&mut self, message: BeaconEngineMessage) {
        match message {
            BeaconEngineMessage::NewPayload { payload, tx } => {
                let status = self.on_new_payload(payload).await;
                let _ = tx.send(Ok(status));
            }
            BeaconEngineMessage::ForkchoiceUpdated { state, payload_attrs, tx } => {
                let result = self.on_forkchoice_updated(state, payload_attrs).await;
                let _ = tx.send(result);
            }
            BeaconEngineMessage::GetPayload { id, tx } => {
                let _ = tx.send(self.get_payload(id));
            }
            BeaconEngineMessage::ExchangeTransitionConfiguration { config, tx } => {
                let _ = tx.send(self.exchange_transition_configuration(config).await);
            }
            BeaconEngineMessage::EventListener(listener) => {
                self.listeners.push(listener);
            }
        }
    }

    /// `engine_newPayloadV1`.
    pub async fn on_new_payload(&mut self, payload: ExecutionPayloadV1) -> PayloadStatus {
        let advertised_hash = payload.block_hash;
        let block = block_from_payload(payload);
        let sealed = block.seal_slow();

        if sealed.hash() != advertised_hash {
            return PayloadStatus::invalid_block_hash(format!(
                "computed hash {} does not match advertised hash {advertised_hash}",
                sealed.hash()
            ));
        }

        if self.inserter.database().header_by_hash(sealed.hash()).await.is_some() {
            return PayloadStatus::valid(sealed.hash());
        }

        // The Engine API's extraData <= 32 byte cap applies to post-Merge payloads specifically;
        // the chain inserter's own bound is wider to admit Clique-sealed headers.
        if sealed.header().extra_data.len() > MAX_PAYLOAD_EXTRA_DATA_BYTES {
            return PayloadStatus::invalid(
                B256::ZERO,
                format!(
                    "extraData length {} exceeds {MAX_PAYLOAD_EXTRA_DATA_BYTES}",
                    sealed.header().extra_data.len()
                ),
            );
        }

        if let Some(status) =
            self.inserter.check_invalid_ancestor(sealed.header().parent_hash, sealed.hash()).await
        {
            return status;
        }

        let Some(parent) = self.inserter.database().header_by_hash(sealed.parent_hash()).await
        else {
            tracing::debug!(target: "engine::tree", hash = %sealed.hash(), "buffering payload with unknown parent");
            self.cache.buffer_block(sealed.hash(), sealed.clone());
            self.listeners.notify(BeaconConsensusEngineEvent::PayloadBuffered { hash: sealed.hash() });
            return PayloadStatus::syncing();
        };

        let Some(parent_td) = self.inserter.database().total_difficulty_by_hash(parent.hash()).await
        else {
            return PayloadStatus::invalid_terminal_block("parent total difficulty unknown");
        };
        if parent_td < self.config.ttd {
            return PayloadStatus::invalid_terminal_block(format!(
                "parent total difficulty {parent_td} below configured TTD {}",
                self.config.ttd
            ));
        }

        if sealed.header().timestamp <= parent.timestamp {
            let current_head = self.inserter.database().canonical_tip().await.hash();
            return PayloadStatus::invalid(current_head, "Invalid timestamp");
        }

        if !self.inserter.executor().have_block_and_state(parent.hash()).await {
            let ancestor = self.inserter.latest_valid_ancestor(parent.hash(), self.config.ttd).await;
            self.cache.buffer_block(sealed.hash(), sealed.clone());
            return PayloadStatus::accepted(ancestor);
        }

        let header = sealed.header().clone();
        let body = sealed.body.clone();
        match self.inserter.insert_side_block(&parent, header, body).await {
            Ok(block) => {
                if self.latch.latch_ttd_reached() {
                    self.listeners.notify(BeaconConsensusEngineEvent::TtdReached { hash: block.hash() });
                }
                PayloadStatus::valid(block.hash())
            }
            Err(err) => {
                let ancestor = self.inserter.latest_valid_ancestor(parent.hash(), self.config.ttd).await;
                self.inserter.mark_invalid(sealed.sealed_header().clone());
                PayloadStatus::invalid(ancestor, err.to_string())
            }
        }
    }

    /// `engine_forkchoiceUpdatedV1`.
    pub async fn on_forkchoice_updated(
        &mut self,
        state: ForkchoiceState,
        attrs: Option<PayloadAttributes>,
    ) -> Result<OnForkChoiceUpdated, EngineError> {
        if state.head_block_hash.is_zero() {
            return Ok(OnForkChoiceUpdated {
                payload_status: PayloadStatus::invalid_with_zero_hash("head block hash is zero"),
                payload_id: None,
            });
        }

        let head = match self.resolve_head(state.head_block_hash).await? {
            ResolvedHead::Header(header) => header,
            ResolvedHead::Syncing => {
                return Ok(OnForkChoiceUpdated { payload_status: PayloadStatus::syncing(), payload_id: None });
            }
            ResolvedHead::Invalid(status) => {
                return Ok(OnForkChoiceUpdated { payload_status: status, payload_id: None });
            }
        };

        if self.latch.ttd_reached() && head.difficulty != U256::ZERO {
            return Ok(OnForkChoiceUpdated {
                payload_status: PayloadStatus::invalid(
                    self.inserter.database().canonical_tip().await.hash(),
                    "pre-merge reorg forbidden after transition",
                ),
                payload_id: None,
            });
        }

        let already_canonical =
            self.inserter.database().canonical_hash_by_number(head.number).await == Some(head.hash());
        if !already_canonical {
            if let Err(err) = self.inserter.set_canonical(&head, &self.pool).await {
                let ancestor = self.inserter.latest_valid_ancestor(head.parent_hash, self.config.ttd).await;
                return Ok(OnForkChoiceUpdated {
                    payload_status: PayloadStatus::invalid(ancestor, err.to_string()),
                    payload_id: None,
                });
            }
            self.listeners
                .notify(BeaconConsensusEngineEvent::CanonicalChainCommitted { head: head.clone() });
        }

        if !state.finalized_block_hash.is_zero() {
            self.set_pointer_if_canonical(state.finalized_block_hash, PointerKind::Finalized).await?;
        }
        if !state.safe_block_hash.is_zero() {
            self.set_pointer_if_canonical(state.safe_block_hash, PointerKind::Safe).await?;
        }

        self.fcu_tracker.set(state);

        let payload_id = if let Some(attrs) = attrs {
            let (block, id) =
                reth_ethereum_payload_builder::assemble(&head, &attrs, &self.pool, self.inserter.executor())
                    .await?;
            self.cache.insert_assembled(id, block);
            Some(id)
        } else {
            None
        };

        Ok(OnForkChoiceUpdated { payload_status: PayloadStatus::valid(head.hash()), payload_id })
    }

    /// Resolves a fork-choice head hash either from the chain database, or, if buffered, by
    /// executing and inserting it now that fork-choice has asked for it by hash (scenario 2 in the
    /// testable properties: a payload buffered for an unknown parent is resolved once a later
    /// `forkchoiceUpdated` references it after the parent became known).
    async fn resolve_head(&mut self, hash: B256) -> Result<ResolvedHead, EngineError> {
        if let Some(header) = self.inserter.database().header_by_hash(hash).await {
            return Ok(ResolvedHead::Header(header));
        }

        let Some(buffered) = self.cache.take_buffered(&hash) else {
            return Ok(ResolvedHead::Syncing);
        };

        let Some(parent) = self.inserter.database().header_by_hash(buffered.parent_hash()).await else {
            self.cache.buffer_block(hash, buffered);
            return Ok(ResolvedHead::Syncing);
        };

        let header = buffered.header().clone();
        let body = buffered.body.clone();
        match self.inserter.insert_side_block(&parent, header, body).await {
            Ok(block) => Ok(ResolvedHead::Header(block.sealed_header().clone())),
            Err(err) => {
                let ancestor = self.inserter.latest_valid_ancestor(parent.hash(), self.config.ttd).await;
                Ok(ResolvedHead::Invalid(PayloadStatus::invalid(ancestor, err.to_string())))
            }
        }
    }

    async fn set_pointer_if_canonical(
        &mut self,
        hash: B256,
        kind: PointerKind,
    ) -> Result<(), EngineError> {
        let header = self
            .inserter
            .database()
            .header_by_hash(hash)
            .await
            .ok_or_else(|| EngineError::InvalidForkChoiceState(format!("{kind:?} hash {hash} is unknown")))?;

        let canonical = self.inserter.database().canonical_hash_by_number(header.number).await;
        if canonical != Some(hash) {
            return Err(EngineError::InvalidForkChoiceState(format!(
                "{kind:?} hash {hash} is not on the canonical chain"
            )));
        }

        match kind {
            PointerKind::Finalized => {
                if let Some(existing) = &self.finalized {
                    if header.number < existing.number {
                        // finalized may only move forward; silently keep the existing pointer.
                        return Ok(());
                    }
                }
                let first_finality = self.latch.latch_pos_finalized();
                if first_finality {
                    self.listeners.notify(BeaconConsensusEngineEvent::PosFinalized { hash });
                }
                self.inserter.database().set_finalized(hash).await?;
                self.finalized = Some(header);
            }
            PointerKind::Safe => {
                self.inserter.database().set_safe(hash).await?;
                self.safe = Some(header);
            }
        }
        Ok(())
    }

    /// `engine_getPayloadV1`.
    pub fn get_payload(&mut self, id: PayloadId) -> Result<ExecutionPayloadV1, EngineError> {
        self.cache
            .get_assembled(&id)
            .map(payload_from_block)
            .ok_or(EngineError::UnknownPayload(id))
    }

    /// `engine_exchangeTransitionConfigurationV1`.
    pub async fn exchange_transition_configuration(
        &self,
        cl: TransitionConfiguration,
    ) -> Result<TransitionConfiguration, EngineError> {
        let local = &self.config.transition_configuration;
        if cl.terminal_total_difficulty != local.terminal_total_difficulty {
            return Err(EngineError::TransitionConfigurationMismatch(format!(
                "consensus client TTD {} does not match configured TTD {}",
                cl.terminal_total_difficulty, local.terminal_total_difficulty
            )));
        }

        if !cl.terminal_block_hash.is_zero() {
            let number: u64 = cl.terminal_block_number.to();
            let header = self
                .inserter
                .database()
                .canonical_header_by_number(number)
                .await
                .ok_or_else(|| {
                    EngineError::TransitionConfigurationMismatch(format!(
                        "no local header at terminal block number {number}"
                    ))
                })?;
            if header.hash() != cl.terminal_block_hash {
                return Err(EngineError::TransitionConfigurationMismatch(format!(
                    "terminal block hash mismatch at number {number}: local {}, remote {}",
                    header.hash(),
                    cl.terminal_block_hash
                )));
            }
        }

        Ok(local.clone())
    }
}

enum ResolvedHead {
    Header(SealedHeader),
    Syncing,
    Invalid(PayloadStatus),
}

#[derive(Debug, Clone, Copy)]
enum PointerKind {
    Finalized,
    Safe,
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_consensus::Header as AlloyHeader;
    use alloy_primitives::{Address, Bloom, Bytes};
    use async_trait::async_trait;
    use engine_reth_primitives::{transactions_root, Block, BlockBody, Header, SealedBlock};
    use reth_engine_primitives::ExecutionOutcome;
    use std::{
        collections::HashMap,
        sync::Mutex,
    };

    #[derive(Default)]
    struct FakeDb {
        headers: Mutex<HashMap<B256, SealedHeader>>,
        canonical: Mutex<HashMap<u64, B256>>,
        total_difficulty: Mutex<HashMap<B256, U256>>,
        tip: Mutex<B256>,
        finalized: Mutex<Option<B256>>,
        safe: Mutex<Option<B256>>,
    }

    impl FakeDb {
        fn insert_canonical(&self, header: SealedHeader, td: U256) {
            let hash = header.hash();
            let number = header.number;
            self.total_difficulty.lock().unwrap().insert(hash, td);
            self.headers.lock().unwrap().insert(hash, header);
            self.canonical.lock().unwrap().insert(number, hash);
            *self.tip.lock().unwrap() = hash;
        }
    }

    #[async_trait]
    impl ChainDatabase for FakeDb {
        async fn header_by_hash(&self, hash: B256) -> Option<SealedHeader> {
            self.headers.lock().unwrap().get(&hash).cloned()
        }

        async fn canonical_header_by_number(&self, number: u64) -> Option<SealedHeader> {
            let hash = *self.canonical.lock().unwrap().get(&number)?;
            self.headers.lock().unwrap().get(&hash).cloned()
        }

        async fn canonical_hash_by_number(&self, number: u64) -> Option<B256> {
            self.canonical.lock().unwrap().get(&number).copied()
        }

        async fn total_difficulty_by_hash(&self, hash: B256) -> Option<U256> {
            self.total_difficulty.lock().unwrap().get(&hash).copied()
        }

        async fn canonical_tip(&self) -> SealedHeader {
            let hash = *self.tip.lock().unwrap();
            self.headers.lock().unwrap().get(&hash).cloned().unwrap()
        }

        async fn insert_side_block(
            &self,
            block: &SealedBlock,
            _outcome: &ExecutionOutcome,
        ) -> Result<(), EngineError> {
            let hash = block.hash();
            let td = self
                .total_difficulty
                .lock()
                .unwrap()
                .get(&block.parent_hash())
                .copied()
                .unwrap_or(U256::ZERO);
            self.total_difficulty.lock().unwrap().insert(hash, td + U256::from(1));
            self.headers.lock().unwrap().insert(hash, block.sealed_header().clone());
            Ok(())
        }

        async fn set_canonical(&self, header: &SealedHeader) -> Result<(), EngineError> {
            self.canonical.lock().unwrap().insert(header.number, header.hash());
            *self.tip.lock().unwrap() = header.hash();
            Ok(())
        }

        async fn set_finalized(&self, hash: B256) -> Result<(), EngineError> {
            *self.finalized.lock().unwrap() = Some(hash);
            Ok(())
        }

        async fn set_safe(&self, hash: B256) -> Result<(), EngineError> {
            *self.safe.lock().unwrap() = Some(hash);
            Ok(())
        }
    }

    struct FakeExecutor;

    #[async_trait]
    impl StateExecutor for FakeExecutor {
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

    #[derive(Default)]
    struct FakePool;

    #[async_trait]
    impl TransactionPoolHandle for FakePool {
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

    fn engine() -> BeaconConsensusEngine<FakeDb, FakeExecutor, FakePool> {
        let genesis = SealedHeader::seal_slow(AlloyHeader {
            number: 0,
            transactions_root: transactions_root(&[]),
            ..Default::default()
        });
        let db = FakeDb::default();
        db.insert_canonical(genesis, U256::from(100));

        let config = EngineConfig {
            ttd: U256::from(100),
            transition_configuration: TransitionConfiguration {
                terminal_total_difficulty: U256::from(100),
                terminal_block_hash: B256::ZERO,
                terminal_block_number: Default::default(),
            },
            payload_cache_capacity: 10,
        };
        let (_handle, engine) =
            BeaconConsensusEngine::new(db, FakeExecutor, FakePool, Arc::new(MergeLatch::new()), config);
        engine
    }

    fn payload_over(parent: &SealedHeader, timestamp_delta: u64) -> ExecutionPayloadV1 {
        let block = Block {
            header: Header {
                parent_hash: parent.hash(),
                number: parent.number + 1,
                timestamp: parent.timestamp + timestamp_delta,
                gas_limit: parent.gas_limit,
                transactions_root: transactions_root(&[]),
                base_fee_per_gas: Some(1_000_000_000),
                ..Default::default()
            },
            body: BlockBody::default(),
        }
        .seal_slow();
        payload_from_block(&block)
    }

    #[tokio::test]
    async fn new_payload_is_idempotent() {
        let mut engine = engine();
        let genesis = engine.inserter.database().canonical_tip().await;
        let payload = payload_over(&genesis, 12);

        let first = engine.on_new_payload(payload.clone()).await;
        let second = engine.on_new_payload(payload).await;
        assert_eq!(first, second);
        assert_eq!(first.status, reth_engine_primitives::PayloadStatusEnum::Valid);
    }

    #[tokio::test]
    async fn rejects_block_hash_mismatch() {
        let mut engine = engine();
        let genesis = engine.inserter.database().canonical_tip().await;
        let mut payload = payload_over(&genesis, 12);
        payload.block_hash = B256::repeat_byte(0xff);

        let status = engine.on_new_payload(payload).await;
        assert_eq!(status.status, reth_engine_primitives::PayloadStatusEnum::InvalidBlockHash);
    }

    #[tokio::test]
    async fn buffers_payload_with_unknown_parent() {
        let mut engine = engine();
        let genesis = engine.inserter.database().canonical_tip().await;
        let b1 = payload_over(&genesis, 12);
        let b1_block = block_from_payload(b1.clone()).seal_slow();
        let b2 = payload_over(b1_block.sealed_header(), 12);

        let status = engine.on_new_payload(b2).await;
        assert_eq!(status.status, reth_engine_primitives::PayloadStatusEnum::Syncing);
        assert_eq!(engine.cache.buffered_len(), 1);
    }

    #[tokio::test]
    async fn forkchoice_updated_rejects_zero_head() {
        let mut engine = engine();
        let result = engine
            .on_forkchoice_updated(
                ForkchoiceState {
                    head_block_hash: B256::ZERO,
                    safe_block_hash: B256::ZERO,
                    finalized_block_hash: B256::ZERO,
                },
                None,
            )
            .await
            .unwrap();
        assert_eq!(result.payload_status.status, reth_engine_primitives::PayloadStatusEnum::Invalid);
    }

    #[tokio::test]
    async fn happy_path_promotes_canonical_and_finalizes() {
        let mut engine = engine();
        let genesis = engine.inserter.database().canonical_tip().await;
        let payload = payload_over(&genesis, 12);
        let status = engine.on_new_payload(payload.clone()).await;
        assert_eq!(status.status, reth_engine_primitives::PayloadStatusEnum::Valid);
        let hash = status.latest_valid_hash.unwrap();

        let result = engine
            .on_forkchoice_updated(
                ForkchoiceState { head_block_hash: hash, safe_block_hash: hash, finalized_block_hash: hash },
                None,
            )
            .await
            .unwrap();
        assert_eq!(result.payload_status.status, reth_engine_primitives::PayloadStatusEnum::Valid);
        assert!(engine.latch.pos_finalized());
        assert_eq!(engine.finalized.as_ref().map(|h| h.hash()), Some(hash));
    }
}
