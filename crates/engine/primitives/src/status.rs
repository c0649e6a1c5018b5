use alloy_primitives::B256;
use serde::{Deserialize, Serialize};

/// The tagged status a payload validation or fork-choice update resolves to.
///
/// `engine_newPayloadV1`'s original wire contract distinguishes `INVALID_BLOCK_HASH` and
/// `INVALID_TERMINAL_BLOCK` from a plain `INVALID`; later Engine API revisions folded both into
/// `INVALID`, but V1 compatibility requires keeping them as distinct variants on the wire.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PayloadStatusEnum {
    /// The payload was fully validated and its state transition accepted.
    Valid,
    /// The payload failed validation.
    Invalid,
    /// The payload's parent (or its state) is not yet available locally.
    Syncing,
    /// The payload was buffered because the parent's post-state could not be verified.
    Accepted,
    /// The payload's `blockHash` did not match its recomputed header hash.
    InvalidBlockHash,
    /// The payload's parent total difficulty is below the configured TTD.
    InvalidTerminalBlock,
}

impl PayloadStatusEnum {
    /// Returns `true` for the two statuses that, per the round-trip law in the testable
    /// properties, must be produced by a subsequent `newPayload` call on a payload that a
    /// `forkchoiceUpdated` assembly just returned.
    pub const fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

/// `PayloadStatusV1`: the full response to `engine_newPayloadV1`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayloadStatus {
    /// The tagged status.
    pub status: PayloadStatusEnum,
    /// The hash of the latest valid block in the branch defined by the payload under
    /// consideration, absent when the status carries no such hash (e.g. a malformed request).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_valid_hash: Option<B256>,
    /// A human-readable message describing why validation failed, when applicable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_error: Option<String>,
}

impl PayloadStatus {
    /// Builds a `VALID` status carrying the validated block's hash.
    pub const fn valid(hash: B256) -> Self {
        Self {
            status: PayloadStatusEnum::Valid,
            latest_valid_hash: Some(hash),
            validation_error: None,
        }
    }

    /// Builds a `SYNCING` status. Per the data model, `SYNCING` carries no `latestValidHash`.
    pub const fn syncing() -> Self {
        Self { status: PayloadStatusEnum::Syncing, latest_valid_hash: None, validation_error: None }
    }

    /// Builds an `ACCEPTED` status carrying the best known valid ancestor.
    pub const fn accepted(latest_valid_hash: B256) -> Self {
        Self {
            status: PayloadStatusEnum::Accepted,
            latest_valid_hash: Some(latest_valid_hash),
            validation_error: None,
        }
    }

    /// Builds an `INVALID` status with a zero `latestValidHash`, used for hash-mismatch and
    /// pre-Merge rejections that have no well-formed ancestor to point to.
    pub fn invalid_with_zero_hash(validation_error: impl Into<String>) -> Self {
        Self {
            status: PayloadStatusEnum::Invalid,
            latest_valid_hash: Some(B256::ZERO),
            validation_error: Some(validation_error.into()),
        }
    }

    /// Builds an `INVALID` status carrying the best known valid ancestor.
    pub fn invalid(latest_valid_hash: B256, validation_error: impl Into<String>) -> Self {
        Self {
            status: PayloadStatusEnum::Invalid,
            latest_valid_hash: Some(latest_valid_hash),
            validation_error: Some(validation_error.into()),
        }
    }

    /// Builds an `INVALID_BLOCK_HASH` status: the recomputed header hash did not match the
    /// payload's advertised `blockHash`.
    pub fn invalid_block_hash(validation_error: impl Into<String>) -> Self {
        Self {
            status: PayloadStatusEnum::InvalidBlockHash,
            latest_valid_hash: None,
            validation_error: Some(validation_error.into()),
        }
    }

    /// Builds an `INVALID_TERMINAL_BLOCK` status: the parent's total difficulty is below TTD.
    pub fn invalid_terminal_block(validation_error: impl Into<String>) -> Self {
        Self {
            status: PayloadStatusEnum::InvalidTerminalBlock,
            latest_valid_hash: Some(B256::ZERO),
            validation_error: Some(validation_error.into()),
        }
    }
}
