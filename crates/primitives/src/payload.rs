use crate::header::{Header, SealedHeader};
use alloy_primitives::{Bytes, B256};

/// The ordered, RLP/EIP-2718-encoded transaction list carried by a block.
///
/// The Engine API exchanges transactions as opaque raw bytes (data model §3: "an ordered list of
/// raw transactions"); decoding them into typed, signature-recovered transactions is the state
/// executor's job and out of this subsystem's scope (purpose & scope §1).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BlockBody {
    /// Raw, EIP-2718-encoded transactions, in inclusion order.
    pub transactions: Vec<Bytes>,
}

/// An unsealed block: a header plus its body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    /// The block header.
    pub header: Header,
    /// The block body.
    pub body: BlockBody,
}

impl Block {
    /// Seals the block, computing the header hash.
    pub fn seal_slow(self) -> SealedBlock {
        let header = SealedHeader::seal_slow(self.header);
        SealedBlock { header, body: self.body }
    }

    /// Seals the block using a hash the caller already trusts.
    pub const fn seal_unchecked(self, hash: B256) -> SealedBlock {
        SealedBlock { header: SealedHeader::new_unchecked(self.header, hash), body: self.body }
    }
}

/// A [`Block`] whose header has been sealed (its hash computed and cached).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SealedBlock {
    header: SealedHeader,
    /// The block body.
    pub body: BlockBody,
}

impl SealedBlock {
    /// Returns the block's hash.
    pub const fn hash(&self) -> B256 {
        self.header.hash()
    }

    /// Returns the parent's hash.
    pub const fn parent_hash(&self) -> B256 {
        self.header.header().parent_hash
    }

    /// Returns the block number.
    pub const fn number(&self) -> u64 {
        self.header.header().number
    }

    /// Returns a reference to the sealed header.
    pub const fn sealed_header(&self) -> &SealedHeader {
        &self.header
    }

    /// Returns a reference to the inner header.
    pub const fn header(&self) -> &Header {
        self.header.header()
    }

    /// Splits the sealed block back into its unsealed header and body.
    pub fn unseal(self) -> Block {
        Block { header: self.header.unseal(), body: self.body }
    }
}

/// Computes the transactions-root of an ordered list of raw, EIP-2718-encoded transactions.
///
/// This is the one piece of header reconstruction that payload data doesn't carry directly: the
/// Engine API wire format gives `stateRoot`/`receiptsRoot` as explicit fields but omits
/// `transactionsRoot`, which must be derived from the transaction list itself so that
/// `header.hash == keccak(rlp(header))` can be checked (data model §3). The transactions are
/// already EIP-2718-encoded, so the trie's per-leaf encoder writes them verbatim rather than
/// running them through `Encodable` a second time (which would re-wrap already-encoded bytes).
pub fn transactions_root(transactions: &[Bytes]) -> B256 {
    alloy_trie::root::ordered_trie_root_with_encoder(transactions, |tx, buf| {
        buf.extend_from_slice(tx)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::Header;

    #[test]
    fn empty_transaction_list_has_empty_root() {
        let root = transactions_root(&[]);
        assert_eq!(root, alloy_trie::EMPTY_ROOT_HASH);
    }

    #[test]
    fn sealing_is_deterministic() {
        let header = Header::default();
        let sealed_a = SealedHeader::seal_slow(header.clone());
        let sealed_b = SealedHeader::seal_slow(header);
        assert_eq!(sealed_a.hash(), sealed_b.hash());
        assert!(sealed_a.is_hash_valid());
    }
}
