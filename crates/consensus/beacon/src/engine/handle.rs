//! `BeaconConsensusEngine` external API.

use alloy_rpc_types_engine::{
    ExecutionPayloadV1, ForkchoiceState, PayloadAttributes, PayloadId, TransitionConfiguration,
};
use reth_engine_primitives::{EngineError, PayloadStatus};
use tokio::sync::{mpsc, mpsc::UnboundedSender, oneshot};

use super::{
    error::{BeaconForkChoiceUpdateError, BeaconOnNewPayloadError},
    message::{BeaconEngineMessage, OnForkChoiceUpdated},
    BeaconConsensusEngineEvent,
};

/// A cheaply cloneable handle to a spawned [`super::BeaconConsensusEngine`].
///
/// Every method sends a message over an unbounded channel and awaits a oneshot response; this is
/// the only way callers (the RPC layer, the sealing loop) reach the engine, which enforces the
/// concurrency model's single-actor serialization of all Engine API requests.
#[derive(Debug, Clone)]
pub struct BeaconConsensusEngineHandle {
    to_engine: UnboundedSender<BeaconEngineMessage>,
}

impl BeaconConsensusEngineHandle {
    /// Wraps a channel to a running engine actor.
    pub const fn new(to_engine: UnboundedSender<BeaconEngineMessage>) -> Self {
        Self { to_engine }
    }

    /// `engine_newPayloadV1`.
    pub async fn new_payload(
        &self,
        payload: ExecutionPayloadV1,
    ) -> Result<PayloadStatus, BeaconOnNewPayloadError> {
        let (tx, rx) = oneshot::channel();
        self.to_engine
            .send(BeaconEngineMessage::NewPayload { payload, tx })
            .map_err(|_| BeaconOnNewPayloadError::EngineUnavailable)?;
        rx.await.map_err(|_| BeaconOnNewPayloadError::EngineUnavailable)?.map_err(Into::into)
    }

    /// `engine_forkchoiceUpdatedV1`.
    pub async fn fork_choice_updated(
        &self,
        state: ForkchoiceState,
        payload_attrs: Option<PayloadAttributes>,
    ) -> Result<OnForkChoiceUpdated, BeaconForkChoiceUpdateError> {
        let (tx, rx) = oneshot::channel();
        self.to_engine
            .send(BeaconEngineMessage::ForkchoiceUpdated { state, payload_attrs, tx })
            .map_err(|_| BeaconForkChoiceUpdateError::EngineUnavailable)?;
        rx.await.map_err(|_| BeaconForkChoiceUpdateError::EngineUnavailable)?.map_err(Into::into)
    }

    /// `engine_getPayloadV1`.
    pub async fn get_payload(&self, id: PayloadId) -> Result<ExecutionPayloadV1, EngineError> {
        let (tx, rx) = oneshot::channel();
        self.to_engine
            .send(BeaconEngineMessage::GetPayload { id, tx })
            .map_err(|_| EngineError::InternalError("engine task unavailable".to_string()))?;
        rx.await.map_err(|_| EngineError::InternalError("engine task unavailable".to_string()))?
    }

    /// `engine_exchangeTransitionConfigurationV1`.
    pub async fn exchange_transition_configuration(
        &self,
        config: TransitionConfiguration,
    ) -> Result<TransitionConfiguration, EngineError> {
        let (tx, rx) = oneshot::channel();
        self.to_engine
            .send(BeaconEngineMessage::ExchangeTransitionConfiguration { config, tx })
            .map_err(|_| EngineError::InternalError("engine task unavailable".to_string()))?;
        rx.await.map_err(|_| EngineError::InternalError("engine task unavailable".to_string()))?
    }

    /// Subscribes to the engine's event stream.
    pub fn event_listener(&self) -> mpsc::UnboundedReceiver<BeaconConsensusEngineEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        let _ = self.to_engine.send(BeaconEngineMessage::EventListener(tx));
        rx
    }
}
