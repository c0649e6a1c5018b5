use alloy_consensus::Header as AlloyHeader;
use alloy_primitives::{keccak256, B256};
use alloy_rlp::Encodable;

/// Canonical block header.
///
/// A thin re-export of [`alloy_consensus::Header`]: the field layout (including the post-merge
/// `mixHash`/`prevRandao` aliasing and the optional `baseFeePerGas`) is exactly the one the
/// Engine API wire format maps onto, so there is no value in inventing a parallel type.
pub type Header = AlloyHeader;

/// A [`Header`] paired with its RLP/keccak hash.
///
/// Mirrors the teacher's `SealedHeader`: the hash is the header's identity (data model §3 of the
/// specification — `header.hash == keccak(rlp(header))`), and recomputing it on every access would
/// be wasteful once a header has been validated once.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SealedHeader {
    header: Header,
    hash: B256,
}

impl SealedHeader {
    /// Creates a sealed header from a header and a hash the caller already trusts (e.g. one
    /// supplied by the consensus client and about to be verified against).
    pub const fn new_unchecked(header: Header, hash: B256) -> Self {
        Self { header, hash }
    }

    /// Seals a header by computing its hash via `keccak256(rlp(header))`.
    pub fn seal_slow(header: Header) -> Self {
        let mut buf = Vec::new();
        header.encode(&mut buf);
        let hash = keccak256(&buf);
        Self { header, hash }
    }

    /// Returns the header's hash.
    pub const fn hash(&self) -> B256 {
        self.hash
    }

    /// Returns a reference to the wrapped header.
    pub const fn header(&self) -> &Header {
        &self.header
    }

    /// Consumes the sealed header, returning the unsealed header.
    pub fn unseal(self) -> Header {
        self.header
    }

    /// Re-derives the hash from the header contents and compares it against the stored hash.
    ///
    /// Used by the chain inserter to catch a caller that constructed a [`SealedHeader`] with a
    /// hash that doesn't match its contents (defensive check at crate boundaries only; internal
    /// callers that go through [`SealedHeader::seal_slow`] cannot hit this).
    pub fn is_hash_valid(&self) -> bool {
        let mut buf = Vec::new();
        self.header.encode(&mut buf);
        keccak256(&buf) == self.hash
    }
}

impl std::ops::Deref for SealedHeader {
    type Target = Header;

    fn deref(&self) -> &Self::Target {
        &self.header
    }
}
