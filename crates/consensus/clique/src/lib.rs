//! Pre-Merge periodic block-production driver (the legacy Clique/PoA sealing loop).
//!
//! Ticks every `cliquePeriod` seconds while the merge latch is un-latched: assembles a block from
//! the transaction pool, has the configured [`CliqueSigner`] produce a seal, persists it via the
//! chain inserter as a new canonical tip, and nudges the pool with the new head. Terminates
//! permanently once the merge latch engages, per the component design's state machine.

use alloy_consensus::Header as AlloyHeader;
use alloy_eips::eip1559::{calc_next_block_base_fee, BaseFeeParams};
use alloy_primitives::{Address, B256, U256};
use engine_reth_primitives::{transactions_root, Block, BlockBody};
use reth_engine_primitives::{ChainDatabase, EngineError, MergeLatch, StateExecutor, TransactionPoolHandle};
use reth_engine_tree::ChainInserter;
use std::{sync::Arc, time::Duration};

/// Produces the seal authorizing a sealed block under Clique PoA.
///
/// Cryptographic signing is an external collaborator's job (the account/keystore subsystem,
/// explicitly out of scope); this trait is the narrow seam the sealing loop calls through.
pub trait CliqueSigner: Send + Sync {
    /// The address the seal authenticates as; becomes the block's `coinbase`/beneficiary.
    fn address(&self) -> Address;

    /// Signs `signing_hash` — the hash of the header with its seal bytes still empty — returning
    /// the 65-byte recoverable signature EIP-225 appends after the 32-byte vanity prefix.
    fn sign(&self, signing_hash: B256) -> [u8; 65];
}

/// Errors the sealing loop's per-tick production can surface. Logged and skipped rather than
/// propagated: a single failed tick must not bring the loop down, since the next tick gets another
/// chance once the transaction pool or state executor recovers.
#[derive(Debug, thiserror::Error)]
pub enum SealingError {
    /// The state executor or transaction pool reported a failure.
    #[error(transparent)]
    Engine(#[from] EngineError),
    /// The chain inserter rejected the freshly assembled block.
    #[error("sealed block rejected: {0}")]
    Rejected(String),
}

/// Clique's fixed vanity prefix length, reserved ahead of the seal (EIP-225).
const VANITY_LEN: usize = 32;
/// In-turn signer difficulty, per EIP-225 (the only value this single-signer driver produces).
const IN_TURN_DIFFICULTY: u64 = 2;
/// Base fee assumed for a parent header that predates London (`baseFeePerGas` absent).
const INITIAL_BASE_FEE: u64 = 1_000_000_000;

/// Periodic block-production driver for the pre-Merge PoA path.
pub struct SealingLoop<D, X, P, S> {
    inserter: ChainInserter<D, X>,
    pool: P,
    signer: S,
    latch: Arc<MergeLatch>,
    period: Duration,
}

impl<D, X, P, S> SealingLoop<D, X, P, S>
where
    D: ChainDatabase,
    X: StateExecutor,
    P: TransactionPoolHandle,
    S: CliqueSigner,
{
    /// Creates a sealing loop ticking every `period`, stopping permanently once `latch` engages.
    pub fn new(db: D, executor: X, pool: P, signer: S, latch: Arc<MergeLatch>, period: Duration) -> Self {
        Self { inserter: ChainInserter::new(db, executor), pool, signer, latch, period }
    }

    /// Runs the sealing loop until the merge latch permanently inhibits it.
    pub async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.period);
        loop {
            ticker.tick().await;
            if !self.latch.sealing_loop_active() {
                tracing::info!(target: "engine::sealing", "merge latch engaged, stopping sealing loop");
                return;
            }
            if let Err(err) = self.seal_one().await {
                tracing::warn!(target: "engine::sealing", %err, "failed to seal block, will retry next tick");
            }
        }
    }

    /// Produces, seals and canonicalizes a single block on top of the current tip.
    async fn seal_one(&mut self) -> Result<(), SealingError> {
        let parent = self.inserter.database().canonical_tip().await;
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        let timestamp = now.max(parent.timestamp + 1);
        let beneficiary = self.signer.address();

        let base_fee = calc_next_block_base_fee(
            parent.gas_used,
            parent.gas_limit,
            parent.base_fee_per_gas.unwrap_or(INITIAL_BASE_FEE),
            BaseFeeParams::ethereum(),
        );

        let transactions = self
            .pool
            .assemble_block(parent.hash(), timestamp, B256::ZERO, beneficiary, parent.gas_limit)
            .await?;
        let transactions_root = transactions_root(&transactions);
        let body = BlockBody { transactions };

        let mut header = AlloyHeader {
            parent_hash: parent.hash(),
            number: parent.number + 1,
            beneficiary,
            gas_limit: parent.gas_limit,
            timestamp,
            transactions_root,
            extra_data: vec![0u8; VANITY_LEN].into(),
            difficulty: U256::from(IN_TURN_DIFFICULTY),
            base_fee_per_gas: Some(base_fee),
            ..Default::default()
        };

        let outcome = self.inserter.executor().execute(&parent, &header, &body).await?;
        header.state_root = outcome.state_root;
        header.receipts_root = outcome.receipts_root;
        header.logs_bloom = outcome.logs_bloom;
        header.gas_used = outcome.gas_used;

        let signing_hash = Block { header: header.clone(), body: body.clone() }.seal_slow().hash();
        let seal = self.signer.sign(signing_hash);
        let mut extra_data = vec![0u8; VANITY_LEN];
        extra_data.extend_from_slice(&seal);
        header.extra_data = extra_data.into();

        let block = self
            .inserter
            .insert_side_block(&parent, header, body)
            .await
            .map_err(|err| SealingError::Rejected(err.to_string()))?;

        self.inserter.set_canonical(block.sealed_header(), &self.pool).await?;

        tracing::info!(target: "engine::sealing", number = block.number(), hash = %block.hash(), "sealed new block");
        Ok(())
    }
}
