use alloy_primitives::B256;

/// Errors the engine subsystem can produce while processing a consensus-client directive.
///
/// Variants split along the propagation-policy line drawn in the error handling design:
/// recoverable ones collapse into a [`crate::PayloadStatus`] carried in a successful JSON-RPC
/// response, while the rest surface as dedicated JSON-RPC error codes.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Request failed basic shape validation before any chain lookup was attempted.
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    /// The header's computed hash did not match the payload's advertised `blockHash`.
    #[error("block hash mismatch: computed {computed}, expected {expected}")]
    InvalidBlockHash {
        /// Hash recomputed from the reconstructed header.
        computed: B256,
        /// Hash the caller advertised.
        expected: B256,
    },

    /// `payload.timestamp` did not strictly exceed the parent's timestamp.
    #[error("invalid timestamp")]
    InvalidTimestamp,

    /// The payload's parent has a total difficulty below the configured TTD.
    #[error("pre-merge payload rejected")]
    PreMergePayload,

    /// The payload's parent header is not known locally.
    #[error("unknown parent {0}")]
    UnknownParent(B256),

    /// The parent header is known but its post-state is unavailable locally.
    #[error("missing state for parent {0}")]
    MissingState(B256),

    /// The state executor rejected the block.
    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    /// `setCanonical` could not complete the canonical-index rewrite.
    #[error("reorg failed: {0}")]
    ReorgFailed(String),

    /// A fork-choice state referenced a finalized or safe hash that is not canonical.
    #[error("invalid fork choice state: {0}")]
    InvalidForkChoiceState(String),

    /// `getPayload` was called with an identifier absent from the payload cache.
    #[error("unknown payload id {0}")]
    UnknownPayload(alloy_rpc_types_engine::PayloadId),

    /// The consensus client's transition configuration does not match the local one.
    #[error("transition configuration mismatch: {0}")]
    TransitionConfigurationMismatch(String),

    /// A chain-database write failed; the operation that triggered it must be treated as failed.
    #[error("storage error: {0}")]
    StorageError(String),

    /// Any other failure that does not fit the taxonomy above.
    #[error("internal error: {0}")]
    InternalError(String),
}

impl EngineError {
    /// Returns `true` for error kinds the design marks as recoverable: cases that must surface as
    /// a [`crate::PayloadStatus`] value rather than a transport-level JSON-RPC error.
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::InvalidBlockHash { .. }
                | Self::InvalidTimestamp
                | Self::PreMergePayload
                | Self::UnknownParent(_)
                | Self::MissingState(_)
                | Self::ExecutionFailed(_)
                | Self::ReorgFailed(_)
        )
    }
}
