//! Converts a payload-attributes request into a fully sealed candidate block.
//!
//! The transaction pool and the state executor are external collaborators, reached only through
//! [`TransactionPoolHandle`] and [`StateExecutor`]; this crate owns exactly the glue between
//! them: rebasing detection, the post-Merge environment, the EIP-1559 base fee, and header
//! construction.

use alloy_consensus::Header as AlloyHeader;
use alloy_eips::eip1559::{calc_next_block_base_fee, BaseFeeParams};
use alloy_primitives::B256;
use engine_reth_primitives::{transactions_root, Block, BlockBody, SealedBlock, SealedHeader};
use reth_engine_primitives::{
    compute_payload_id, EngineError, PayloadAttributes, PayloadId, StateExecutor,
    TransactionPoolHandle,
};

/// `extraData` may not exceed 32 bytes, mirroring the header-level constraint everywhere else in
/// the protocol.
const MAX_EXTRA_DATA_BYTES: usize = 32;

/// Base fee assumed for a parent header that predates London (`baseFeePerGas` absent).
///
/// Unreachable once the chain has crossed the Merge, which by construction has already crossed
/// London; kept only so the formula has a defined input if ever called against such a header.
const INITIAL_BASE_FEE: u64 = 1_000_000_000;

/// Converts payload attributes into a sealed candidate block and its deterministic identifier.
///
/// Mirrors `assemble(parent, attrs) -> Block` from the component design: rebase the pool if
/// needed, derive the post-Merge environment, ask the pool for an ordered transaction list, run
/// it through the state executor, and seal the resulting header. The assembler may be invoked
/// again with identical attributes — the identifier is guaranteed stable, but the block's
/// contents are not, since the mempool may have changed between calls.
pub async fn assemble(
    parent: &SealedHeader,
    attrs: &PayloadAttributes,
    pool: &dyn TransactionPoolHandle,
    executor: &dyn StateExecutor,
) -> Result<(SealedBlock, PayloadId), EngineError> {
    let parent_hash = parent.hash();

    if pool.current_head().await != parent_hash {
        tracing::debug!(
            target: "engine::payload_builder",
            %parent_hash,
            "transaction pool head differs from assembly parent, rebase requested"
        );
    }

    let base_fee = calc_next_block_base_fee(
        parent.gas_used,
        parent.gas_limit,
        parent.base_fee_per_gas.unwrap_or(INITIAL_BASE_FEE),
        BaseFeeParams::ethereum(),
    );

    let gas_limit = parent.gas_limit;

    let transactions = pool
        .assemble_block(
            parent_hash,
            attrs.timestamp,
            attrs.prev_randao,
            attrs.suggested_fee_recipient,
            gas_limit,
        )
        .await?;

    let tx_root = transactions_root(&transactions);

    let mut header = AlloyHeader {
        parent_hash,
        number: parent.number + 1,
        gas_limit,
        timestamp: attrs.timestamp,
        mix_hash: attrs.prev_randao,
        beneficiary: attrs.suggested_fee_recipient,
        base_fee_per_gas: Some(base_fee),
        difficulty: alloy_primitives::U256::ZERO,
        nonce: alloy_primitives::B64::ZERO,
        transactions_root: tx_root,
        extra_data: Default::default(),
        ..Default::default()
    };

    if header.extra_data.len() > MAX_EXTRA_DATA_BYTES {
        return Err(EngineError::MalformedRequest(format!(
            "extraData length {} exceeds {MAX_EXTRA_DATA_BYTES}",
            header.extra_data.len()
        )));
    }

    let body = BlockBody { transactions };

    let outcome = executor.execute(parent, &header, &body).await?;

    header.state_root = outcome.state_root;
    header.receipts_root = outcome.receipts_root;
    header.logs_bloom = outcome.logs_bloom;
    header.gas_used = outcome.gas_used;

    let block = Block { header, body }.seal_slow();
    let payload_id = compute_payload_id(
        parent_hash,
        attrs.timestamp,
        attrs.prev_randao,
        attrs.suggested_fee_recipient,
    );

    metrics::counter!("engine.payload_builder.assembled_total").increment(1);

    Ok((block, payload_id))
}

/// Returns the empty-list transactions root, for callers that need to recognize an empty
/// assembled block without recomputing the root.
pub fn empty_transactions_root() -> B256 {
    transactions_root(&[])
}
