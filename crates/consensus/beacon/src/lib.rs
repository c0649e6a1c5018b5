//! The Engine API driver: the actor that owns the merge latch, the payload cache and the
//! fork-choice state, and drives the [`reth_engine_tree::ChainInserter`] and
//! [`reth_ethereum_payload_builder::assemble`] in response to the four Engine API calls.
//!
//! This is the Fork-Choice Coordinator and Engine API Surface from the component design, fused
//! into a single actor: the two are inseparable in practice, since `forkchoiceUpdated` both
//! reorgs the canonical chain and (optionally) triggers assembly, and both operations must be
//! serialized against every other Engine API call.

mod engine;

pub use engine::{
    BeaconConsensusEngine, BeaconConsensusEngineEvent, BeaconConsensusEngineHandle,
    BeaconEngineMessage, BeaconForkChoiceUpdateError, BeaconOnNewPayloadError, EngineConfig,
    EventListeners, ForkchoiceStateTracker, OnForkChoiceUpdated, block_from_payload,
    payload_from_block,
};
