//! In-memory stand-ins for the chain database, state executor, transaction pool and Clique
//! signer this binary needs to launch a node.
//!
//! All four are external collaborators out of this repository's scope (purpose & scope §1): the
//! EVM interpreter and account state database, the devp2p/chain-database storage layer, the
//! transaction pool, and the keystore/account subsystem that would produce a real Clique seal.
//! This module supplies the minimal in-memory implementations needed to make `engine-reth`
//! runnable end to end, the same role `examples/custom-dev-node`-style binaries play in the
//! teacher repository: they wire real components together, but the components standing in for
//! out-of-scope subsystems are illustrative, not production-grade. A block's post-state is
//! trusted from its header rather than independently computed, and the Clique seal is a fixed
//! placeholder rather than a real secp256k1 signature.

use alloy_primitives::{Address, BlockNumber, Bytes, B256, U256};
use async_trait::async_trait;
use engine_reth_primitives::{BlockBody, Header, SealedBlock, SealedHeader};
use reth_clique_consensus::CliqueSigner;
use reth_engine_primitives::{ChainDatabase, EngineError, ExecutionOutcome, StateExecutor, TransactionPoolHandle};
use std::{collections::HashMap, sync::{Arc, Mutex}};

/// An in-memory chain database: header/body storage, the total-difficulty index and the
/// canonical-number index, all behind a single mutex (the engine only ever reaches this from its
/// own single-threaded event loop, per the concurrency model, so a mutex is sufficient and never
/// contended). Cheaply cloneable: the node builder hands a copy each to the engine actor and the
/// sealing loop, both backed by the same shared state.
#[derive(Default, Clone)]
pub struct InMemoryChainDatabase {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    headers: HashMap<B256, SealedHeader>,
    total_difficulty: HashMap<B256, U256>,
    canonical: HashMap<BlockNumber, B256>,
    tip: B256,
}

impl InMemoryChainDatabase {
    /// Creates a database seeded with `genesis` as the canonical tip, at the given total
    /// difficulty.
    pub fn with_genesis(genesis: SealedHeader, genesis_total_difficulty: U256) -> Self {
        let hash = genesis.hash();
        let number = genesis.number;
        let mut inner = Inner::default();
        inner.total_difficulty.insert(hash, genesis_total_difficulty);
        inner.canonical.insert(number, hash);
        inner.headers.insert(hash, genesis);
        inner.tip = hash;
        Self { inner: Arc::new(Mutex::new(inner)) }
    }
}

#[async_trait]
impl ChainDatabase for InMemoryChainDatabase {
    async fn header_by_hash(&self, hash: B256) -> Option<SealedHeader> {
        self.inner.lock().unwrap().headers.get(&hash).cloned()
    }

    async fn canonical_header_by_number(&self, number: BlockNumber) -> Option<SealedHeader> {
        let inner = self.inner.lock().unwrap();
        let hash = *inner.canonical.get(&number)?;
        inner.headers.get(&hash).cloned()
    }

    async fn canonical_hash_by_number(&self, number: BlockNumber) -> Option<B256> {
        self.inner.lock().unwrap().canonical.get(&number).copied()
    }

    async fn total_difficulty_by_hash(&self, hash: B256) -> Option<U256> {
        self.inner.lock().unwrap().total_difficulty.get(&hash).copied()
    }

    async fn canonical_tip(&self) -> SealedHeader {
        let inner = self.inner.lock().unwrap();
        inner.headers.get(&inner.tip).cloned().expect("genesis always present")
    }

    async fn insert_side_block(
        &self,
        block: &SealedBlock,
        _outcome: &ExecutionOutcome,
    ) -> Result<(), EngineError> {
        let mut inner = self.inner.lock().unwrap();
        let parent_td = inner.total_difficulty.get(&block.parent_hash()).copied().unwrap_or(U256::ZERO);
        let td = parent_td + U256::from(block.header().difficulty.max(U256::from(1)));
        inner.total_difficulty.insert(block.hash(), td);
        inner.headers.insert(block.hash(), block.sealed_header().clone());
        Ok(())
    }

    async fn set_canonical(&self, header: &SealedHeader) -> Result<(), EngineError> {
        let mut inner = self.inner.lock().unwrap();
        inner.canonical.insert(header.number, header.hash());
        inner.tip = header.hash();
        Ok(())
    }

    async fn set_finalized(&self, _hash: B256) -> Result<(), EngineError> {
        Ok(())
    }

    async fn set_safe(&self, _hash: B256) -> Result<(), EngineError> {
        Ok(())
    }
}

/// A state executor that trusts the header's own state/receipts roots rather than independently
/// computing them; a real node supplies a real EVM-backed executor in its place.
#[derive(Default, Clone)]
pub struct TrustingStateExecutor;

#[async_trait]
impl StateExecutor for TrustingStateExecutor {
    async fn execute(
        &self,
        _parent: &SealedHeader,
        header: &Header,
        _body: &BlockBody,
    ) -> Result<ExecutionOutcome, EngineError> {
        Ok(ExecutionOutcome {
            state_root: header.state_root,
            receipts_root: header.receipts_root,
            logs_bloom: header.logs_bloom,
            gas_used: header.gas_used,
        })
    }

    async fn have_block_and_state(&self, _hash: B256) -> bool {
        true
    }
}

/// A transaction pool that never has anything pending; a real node supplies its mempool in its
/// place.
#[derive(Default, Clone)]
pub struct EmptyTransactionPool;

#[async_trait]
impl TransactionPoolHandle for EmptyTransactionPool {
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
        Ok(Vec::new())
    }

    async fn head_changed(&self, _new_head: &SealedHeader) {}
}

/// A Clique signer producing a fixed placeholder seal; a real node supplies a keystore-backed
/// signer in its place.
#[derive(Clone)]
pub struct PlaceholderSigner {
    address: Address,
}

impl PlaceholderSigner {
    /// Creates a signer that seals blocks as `address`.
    pub const fn new(address: Address) -> Self {
        Self { address }
    }
}

impl CliqueSigner for PlaceholderSigner {
    fn address(&self) -> Address {
        self.address
    }

    fn sign(&self, _signing_hash: B256) -> [u8; 65] {
        [0u8; 65]
    }
}

/// Builds the genesis header this demo database starts from, also usable to validate a given
/// execution payload's genesis-adjacent shape in tests.
pub fn demo_genesis() -> SealedHeader {
    let header = Header {
        number: 0,
        gas_limit: 30_000_000,
        timestamp: 0,
        base_fee_per_gas: Some(1_000_000_000),
        transactions_root: engine_reth_primitives::transactions_root(&[]),
        ..Default::default()
    };
    SealedHeader::seal_slow(header)
}
