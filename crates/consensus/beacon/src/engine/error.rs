use reth_engine_primitives::EngineError;

/// Errors a [`crate::BeaconConsensusEngineHandle::new_payload`] call can surface.
#[derive(Debug, thiserror::Error)]
pub enum BeaconOnNewPayloadError {
    /// The engine task is no longer running (its receiver half was dropped).
    #[error("beacon consensus engine task is unavailable")]
    EngineUnavailable,
    /// The engine rejected the request with an internal error.
    #[error(transparent)]
    Internal(#[from] EngineError),
}

/// Errors a [`crate::BeaconConsensusEngineHandle::fork_choice_updated`] call can surface.
#[derive(Debug, thiserror::Error)]
pub enum BeaconForkChoiceUpdateError {
    /// The engine task is no longer running.
    #[error("beacon consensus engine task is unavailable")]
    EngineUnavailable,
    /// The engine rejected the request with an internal error.
    #[error(transparent)]
    Internal(#[from] EngineError),
}
