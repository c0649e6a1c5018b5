use alloy_primitives::{B64, U256};
use alloy_rpc_types_engine::ExecutionPayloadV1;
use engine_reth_primitives::{transactions_root, Block, BlockBody, Header, SealedBlock};

/// Reconstructs an unsealed [`Block`] from its Engine API wire form.
///
/// The wire payload carries `prevRandao` in place of the header's `mixHash` slot (data model,
/// Execution Payload) and omits `transactionsRoot` entirely, which is recomputed here from the
/// raw transaction list rather than trusted from the caller.
pub fn block_from_payload(payload: ExecutionPayloadV1) -> Block {
    let tx_root = transactions_root(&payload.transactions);
    let header = Header {
        parent_hash: payload.parent_hash,
        beneficiary: payload.fee_recipient,
        state_root: payload.state_root,
        transactions_root: tx_root,
        receipts_root: payload.receipts_root,
        logs_bloom: payload.logs_bloom,
        difficulty: U256::ZERO,
        number: payload.block_number,
        gas_limit: payload.gas_limit,
        gas_used: payload.gas_used,
        timestamp: payload.timestamp,
        extra_data: payload.extra_data,
        mix_hash: payload.prev_randao,
        nonce: B64::ZERO,
        base_fee_per_gas: Some(payload.base_fee_per_gas.to::<u64>()),
        ..Default::default()
    };
    Block { header, body: BlockBody { transactions: payload.transactions } }
}

/// Converts a sealed block back into its Engine API wire form, as returned by `getPayload`.
pub fn payload_from_block(block: &SealedBlock) -> ExecutionPayloadV1 {
    let header = block.header();
    ExecutionPayloadV1 {
        parent_hash: header.parent_hash,
        fee_recipient: header.beneficiary,
        state_root: header.state_root,
        receipts_root: header.receipts_root,
        logs_bloom: header.logs_bloom,
        prev_randao: header.mix_hash,
        block_number: header.number,
        gas_limit: header.gas_limit,
        gas_used: header.gas_used,
        timestamp: header.timestamp,
        extra_data: header.extra_data.clone(),
        base_fee_per_gas: U256::from(header.base_fee_per_gas.unwrap_or_default()),
        block_hash: block.hash(),
        transactions: block.body.transactions.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_wire_form() {
        let header = Header {
            number: 1,
            timestamp: 100,
            gas_limit: 30_000_000,
            base_fee_per_gas: Some(1_000_000_000),
            transactions_root: transactions_root(&[]),
            ..Default::default()
        };
        let block = Block { header, body: BlockBody::default() }.seal_slow();
        let payload = payload_from_block(&block);
        let back = block_from_payload(payload).seal_slow();
        assert_eq!(back.hash(), block.hash());
    }
}
