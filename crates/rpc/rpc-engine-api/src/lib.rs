//! The `engine_` JSON-RPC namespace.
//!
//! A thin request/response translation layer over a [`BeaconConsensusEngineHandle`]: converts
//! internal [`EngineError`]s to JSON-RPC error objects at the boundary (per spec.md §7's
//! propagation policy — the Engine subsystem itself never constructs a wire-level error), and
//! otherwise passes requests straight through.

use alloy_rpc_types_engine::{
    ExecutionPayloadV1, ForkchoiceState, PayloadAttributes, PayloadId, TransitionConfiguration,
};
use jsonrpsee::{
    core::RpcResult,
    proc_macros::rpc,
    types::{ErrorObjectOwned, ErrorObject},
};
use reth_beacon_consensus::{
    BeaconConsensusEngineHandle, BeaconForkChoiceUpdateError, BeaconOnNewPayloadError,
};
use reth_engine_primitives::{EngineError, PayloadStatus};
use serde::{Deserialize, Serialize};

/// Reserved Engine API JSON-RPC error codes (`-32001..-38999` per spec.md §7).
mod error_codes {
    /// `getPayload` was called with an identifier absent from the payload cache.
    pub const UNKNOWN_PAYLOAD: i32 = -38001;
    /// A fork-choice state referenced a finalized or safe hash that is not canonical.
    pub const INVALID_FORK_CHOICE_STATE: i32 = -38002;
    /// The consensus client's transition configuration does not match the local one.
    pub const TRANSITION_CONFIGURATION_MISMATCH: i32 = -38005;
    /// Any other internal failure not covered by a dedicated Engine API code.
    pub const SERVER_ERROR: i32 = -32000;
}

fn engine_error_to_rpc(err: EngineError) -> ErrorObjectOwned {
    let code = match &err {
        EngineError::UnknownPayload(_) => error_codes::UNKNOWN_PAYLOAD,
        EngineError::InvalidForkChoiceState(_) => error_codes::INVALID_FORK_CHOICE_STATE,
        EngineError::TransitionConfigurationMismatch(_) => {
            error_codes::TRANSITION_CONFIGURATION_MISMATCH
        }
        _ => error_codes::SERVER_ERROR,
    };
    ErrorObject::owned(code, err.to_string(), None::<()>)
}

/// `engine_forkchoiceUpdatedV1`'s response: a payload status plus, when payload attributes were
/// supplied, the identifier of the payload now being assembled.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForkchoiceUpdated {
    /// The resulting payload status.
    pub payload_status: PayloadStatus,
    /// The identifier of the payload being built, present only if assembly was requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload_id: Option<PayloadId>,
}

/// The `engine_` namespace, restricted to the four V1 methods spec.md scopes, plus the
/// capability-exchange stub every conformant consensus-client pairs them with (SPEC_FULL.md
/// §11.5).
#[rpc(server, namespace = "engine")]
pub trait EngineApi {
    /// See also <https://github.com/ethereum/execution-apis/blob/main/src/engine/paris.md#engine_newpayloadv1>
    #[method(name = "newPayloadV1")]
    async fn new_payload_v1(&self, payload: ExecutionPayloadV1) -> RpcResult<PayloadStatus>;

    /// See also <https://github.com/ethereum/execution-apis/blob/main/src/engine/paris.md#engine_forkchoiceupdatedv1>
    #[method(name = "forkchoiceUpdatedV1")]
    async fn fork_choice_updated_v1(
        &self,
        fork_choice_state: ForkchoiceState,
        payload_attributes: Option<PayloadAttributes>,
    ) -> RpcResult<ForkchoiceUpdated>;

    /// See also <https://github.com/ethereum/execution-apis/blob/main/src/engine/paris.md#engine_getpayloadv1>
    #[method(name = "getPayloadV1")]
    async fn get_payload_v1(&self, payload_id: PayloadId) -> RpcResult<ExecutionPayloadV1>;

    /// See also <https://github.com/ethereum/execution-apis/blob/main/src/engine/paris.md#engine_exchangetransitionconfigurationv1>
    #[method(name = "exchangeTransitionConfigurationV1")]
    async fn exchange_transition_configuration_v1(
        &self,
        config: TransitionConfiguration,
    ) -> RpcResult<TransitionConfiguration>;

    /// Minimal capability-exchange stub (SPEC_FULL.md §11.5): echoes back the subset of the
    /// requested capabilities this driver actually serves.
    #[method(name = "exchangeCapabilities")]
    async fn exchange_capabilities(&self, capabilities: Vec<String>) -> RpcResult<Vec<String>>;
}

/// The locally supported Engine API methods, returned verbatim by `exchangeCapabilities`.
const SUPPORTED_CAPABILITIES: &[&str] = &[
    "engine_newPayloadV1",
    "engine_forkchoiceUpdatedV1",
    "engine_getPayloadV1",
    "engine_exchangeTransitionConfigurationV1",
];

/// Type-erases the concrete jsonrpsee server implementation, returning the bare [`jsonrpsee::RpcModule`]
/// so the node wiring crate can merge it alongside other namespaces without naming this crate's
/// server type.
pub trait IntoEngineApiRpcModule {
    /// Consumes the server and returns its methods as a single [`jsonrpsee::RpcModule`].
    fn into_rpc_module(self) -> jsonrpsee::RpcModule<()>;
}

impl IntoEngineApiRpcModule for EngineApiRpc {
    fn into_rpc_module(self) -> jsonrpsee::RpcModule<()> {
        self.into_rpc().remove_context()
    }
}

/// The `engine_` JSON-RPC server, wrapping a [`BeaconConsensusEngineHandle`].
#[derive(Debug, Clone)]
pub struct EngineApiRpc {
    handle: BeaconConsensusEngineHandle,
}

impl EngineApiRpc {
    /// Creates a new Engine API RPC server over the given engine handle.
    pub const fn new(handle: BeaconConsensusEngineHandle) -> Self {
        Self { handle }
    }
}

#[async_trait::async_trait]
impl EngineApiServer for EngineApiRpc {
    async fn new_payload_v1(&self, payload: ExecutionPayloadV1) -> RpcResult<PayloadStatus> {
        metrics::counter!("engine.rpc.new_payload_v1_total").increment(1);
        self.handle.new_payload(payload).await.map_err(|err| match err {
            BeaconOnNewPayloadError::EngineUnavailable => {
                ErrorObject::owned(error_codes::SERVER_ERROR, err.to_string(), None::<()>)
            }
            BeaconOnNewPayloadError::Internal(err) => engine_error_to_rpc(err),
        })
    }

    async fn fork_choice_updated_v1(
        &self,
        fork_choice_state: ForkchoiceState,
        payload_attributes: Option<PayloadAttributes>,
    ) -> RpcResult<ForkchoiceUpdated> {
        metrics::counter!("engine.rpc.forkchoice_updated_v1_total").increment(1);
        let result = self
            .handle
            .fork_choice_updated(fork_choice_state, payload_attributes)
            .await
            .map_err(|err| match err {
                BeaconForkChoiceUpdateError::EngineUnavailable => {
                    ErrorObject::owned(error_codes::SERVER_ERROR, err.to_string(), None::<()>)
                }
                BeaconForkChoiceUpdateError::Internal(err) => engine_error_to_rpc(err),
            })?;
        Ok(ForkchoiceUpdated { payload_status: result.payload_status, payload_id: result.payload_id })
    }

    async fn get_payload_v1(&self, payload_id: PayloadId) -> RpcResult<ExecutionPayloadV1> {
        metrics::counter!("engine.rpc.get_payload_v1_total").increment(1);
        self.handle.get_payload(payload_id).await.map_err(engine_error_to_rpc)
    }

    async fn exchange_transition_configuration_v1(
        &self,
        config: TransitionConfiguration,
    ) -> RpcResult<TransitionConfiguration> {
        self.handle.exchange_transition_configuration(config).await.map_err(engine_error_to_rpc)
    }

    async fn exchange_capabilities(&self, capabilities: Vec<String>) -> RpcResult<Vec<String>> {
        tracing::debug!(target: "engine::rpc", ?capabilities, "consensus client exchanged capabilities");
        Ok(SUPPORTED_CAPABILITIES.iter().map(|s| s.to_string()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_consensus::Header as AlloyHeader;
    use alloy_primitives::{Address, Bloom, Bytes, B256, U256};
    use async_trait::async_trait;
    use engine_reth_primitives::{transactions_root, BlockBody, Header, SealedBlock, SealedHeader};
    use reth_beacon_consensus::{BeaconConsensusEngine, EngineConfig};
    use reth_engine_primitives::{ChainDatabase, ExecutionOutcome, StateExecutor, TransactionPoolHandle};
    use std::{collections::HashMap, sync::Mutex};

    #[derive(Default)]
    struct FakeDb {
        headers: Mutex<HashMap<B256, SealedHeader>>,
        canonical: Mutex<HashMap<u64, B256>>,
        total_difficulty: Mutex<HashMap<B256, U256>>,
        tip: Mutex<B256>,
    }

    impl FakeDb {
        fn insert_canonical(&self, header: SealedHeader, td: U256) {
            let hash = header.hash();
            let number = header.number;
            self.total_difficulty.lock().unwrap().insert(hash, td);
            self.headers.lock().unwrap().insert(hash, header);
            self.canonical.lock().unwrap().insert(number, hash);
            *self.tip.lock().unwrap() = hash;
        }
    }

    #[async_trait]
    impl ChainDatabase for FakeDb {
        async fn header_by_hash(&self, hash: B256) -> Option<SealedHeader> {
            self.headers.lock().unwrap().get(&hash).cloned()
        }

        async fn canonical_header_by_number(&self, number: u64) -> Option<SealedHeader> {
            let hash = *self.canonical.lock().unwrap().get(&number)?;
            self.headers.lock().unwrap().get(&hash).cloned()
        }

        async fn canonical_hash_by_number(&self, number: u64) -> Option<B256> {
            self.canonical.lock().unwrap().get(&number).copied()
        }

        async fn total_difficulty_by_hash(&self, hash: B256) -> Option<U256> {
            self.total_difficulty.lock().unwrap().get(&hash).copied()
        }

        async fn canonical_tip(&self) -> SealedHeader {
            let hash = *self.tip.lock().unwrap();
            self.headers.lock().unwrap().get(&hash).cloned().unwrap()
        }

        async fn insert_side_block(
            &self,
            block: &SealedBlock,
            _outcome: &ExecutionOutcome,
        ) -> Result<(), EngineError> {
            self.headers.lock().unwrap().insert(block.hash(), block.sealed_header().clone());
            Ok(())
        }

        async fn set_canonical(&self, header: &SealedHeader) -> Result<(), EngineError> {
            self.canonical.lock().unwrap().insert(header.number, header.hash());
            *self.tip.lock().unwrap() = header.hash();
            Ok(())
        }

        async fn set_finalized(&self, _hash: B256) -> Result<(), EngineError> {
            Ok(())
        }

        async fn set_safe(&self, _hash: B256) -> Result<(), EngineError> {
            Ok(())
        }
    }

    struct FakeExecutor;

    #[async_trait]
    impl StateExecutor for FakeExecutor {
        async fn execute(
            &self,
            _parent: &SealedHeader,
            header: &Header,
            _body: &BlockBody,
        ) -> Result<ExecutionOutcome, EngineError> {
            Ok(ExecutionOutcome {
                state_root: header.state_root,
                receipts_root: header.receipts_root,
                logs_bloom: Bloom::default(),
                gas_used: header.gas_used,
            })
        }

        async fn have_block_and_state(&self, _hash: B256) -> bool {
            true
        }
    }

    #[derive(Default)]
    struct FakePool;

    #[async_trait]
    impl TransactionPoolHandle for FakePool {
        async fn current_head(&self) -> B256 {
            B256::ZERO
        }

        async fn assemble_block(
            &self,
            _parent: B256,
            _timestamp: u64,
            _prev_randao: B256,
            _suggested_fee_recipient: Address,
            _gas_limit: u64,
        ) -> Result<Vec<Bytes>, EngineError> {
            Ok(vec![])
        }

        async fn head_changed(&self, _new_head: &SealedHeader) {}
    }

    fn rpc() -> EngineApiRpc {
        let genesis = SealedHeader::seal_slow(AlloyHeader {
            number: 0,
            transactions_root: transactions_root(&[]),
            ..Default::default()
        });
        let db = FakeDb::default();
        db.insert_canonical(genesis, U256::from(100));

        let config = EngineConfig {
            ttd: U256::from(100),
            transition_configuration: TransitionConfiguration {
                terminal_total_difficulty: U256::from(100),
                terminal_block_hash: B256::ZERO,
                terminal_block_number: Default::default(),
            },
            payload_cache_capacity: 10,
        };
        let (handle, engine) = BeaconConsensusEngine::new(
            db,
            FakeExecutor,
            FakePool,
            std::sync::Arc::new(reth_engine_primitives::MergeLatch::new()),
            config,
        );
        tokio::spawn(engine.run());
        EngineApiRpc::new(handle)
    }

    #[tokio::test]
    async fn exchange_capabilities_echoes_supported_methods() {
        let api = rpc();
        let result = api.exchange_capabilities(vec!["engine_newPayloadV1".to_string()]).await.unwrap();
        assert_eq!(result, SUPPORTED_CAPABILITIES.to_vec());
    }

    #[tokio::test]
    async fn get_payload_unknown_id_returns_dedicated_error_code() {
        let api = rpc();
        let err = api.get_payload_v1(PayloadId::new([0u8; 8])).await.unwrap_err();
        assert_eq!(err.code(), error_codes::UNKNOWN_PAYLOAD);
    }

    #[tokio::test]
    async fn exchange_transition_configuration_mismatch_is_rejected() {
        let api = rpc();
        let mismatched = TransitionConfiguration {
            terminal_total_difficulty: U256::from(1),
            terminal_block_hash: B256::ZERO,
            terminal_block_number: Default::default(),
        };
        let err = api.exchange_transition_configuration_v1(mismatched).await.unwrap_err();
        assert_eq!(err.code(), error_codes::TRANSITION_CONFIGURATION_MISMATCH);
    }
}
