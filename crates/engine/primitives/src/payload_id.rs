use alloy_primitives::{keccak256, Address, B256};
use alloy_rpc_types_engine::PayloadId;

/// Computes the 8-byte payload identifier fingerprinting a `(headBlockHash, timestamp,
/// prevRandao, feeRecipient)` assembly request.
///
/// Deterministic by construction: `keccak256` over the concatenated big-endian encoding of the
/// four inputs, truncated to the identifier's 8 bytes. Two calls with identical inputs always
/// produce identical identifiers, satisfying the determinism property required of
/// `computePayloadId`; this says nothing about the assembled payload's *contents*, which may
/// legitimately differ between two calls as the mempool changes.
pub fn compute_payload_id(
    head_block_hash: B256,
    timestamp: u64,
    prev_randao: B256,
    suggested_fee_recipient: Address,
) -> PayloadId {
    let mut buf = Vec::with_capacity(32 + 8 + 32 + 20);
    buf.extend_from_slice(head_block_hash.as_slice());
    buf.extend_from_slice(&timestamp.to_be_bytes());
    buf.extend_from_slice(prev_randao.as_slice());
    buf.extend_from_slice(suggested_fee_recipient.as_slice());

    let digest = keccak256(&buf);
    let mut id = [0u8; 8];
    id.copy_from_slice(&digest[..8]);
    PayloadId::new(id)
}
