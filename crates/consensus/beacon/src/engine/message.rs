use alloy_rpc_types_engine::{
    ExecutionPayloadV1, ForkchoiceState, PayloadAttributes, PayloadId, TransitionConfiguration,
};
use reth_engine_primitives::{EngineError, PayloadStatus};
use tokio::sync::oneshot;

use super::event::BeaconConsensusEngineEvent;

/// The outcome of a successful `forkchoiceUpdated` call: a status plus, when payload attributes
/// were supplied, the identifier of the payload now being assembled.
#[derive(Clone, Debug)]
pub struct OnForkChoiceUpdated {
    /// The resulting payload status.
    pub payload_status: PayloadStatus,
    /// The identifier of the payload being built, present only if attributes were supplied and
    /// assembly was requested.
    pub payload_id: Option<PayloadId>,
}

/// The messages the beacon consensus engine actor accepts on its single inbound channel.
///
/// One channel per engine instance enforces the ordering guarantee from the concurrency model:
/// requests are processed one at a time, in the order the handle sent them.
#[derive(Debug)]
pub enum BeaconEngineMessage {
    /// `engine_newPayloadV1`.
    NewPayload {
        /// The payload under validation.
        payload: ExecutionPayloadV1,
        /// Channel to deliver the resulting status on.
        tx: oneshot::Sender<Result<PayloadStatus, EngineError>>,
    },
    /// `engine_forkchoiceUpdatedV1`.
    ForkchoiceUpdated {
        /// The new fork-choice state.
        state: ForkchoiceState,
        /// Optional payload-building attributes.
        payload_attrs: Option<PayloadAttributes>,
        /// Channel to deliver the result on.
        tx: oneshot::Sender<Result<OnForkChoiceUpdated, EngineError>>,
    },
    /// `engine_getPayloadV1`.
    GetPayload {
        /// The identifier of the payload to retrieve.
        id: PayloadId,
        /// Channel to deliver the result on.
        tx: oneshot::Sender<Result<ExecutionPayloadV1, EngineError>>,
    },
    /// `engine_exchangeTransitionConfigurationV1`.
    ExchangeTransitionConfiguration {
        /// The consensus client's view of the transition configuration.
        config: TransitionConfiguration,
        /// Channel to deliver the local configuration on.
        tx: oneshot::Sender<Result<TransitionConfiguration, EngineError>>,
    },
    /// Registers a new event listener; the returned sender is cloned into an internal fan-out
    /// list so every listener receives every subsequent event.
    EventListener(tokio::sync::mpsc::UnboundedSender<BeaconConsensusEngineEvent>),
}
