use crate::SealingConfig;
use jsonrpsee::server::{ServerBuilder, ServerHandle};
use reth_beacon_consensus::{BeaconConsensusEngine, BeaconConsensusEngineHandle, EngineConfig};
use reth_clique_consensus::{CliqueSigner, SealingLoop};
use reth_engine_primitives::{ChainDatabase, MergeLatch, StateExecutor, TransactionPoolHandle};
use reth_rpc_engine_api::{EngineApiRpc, IntoEngineApiRpcModule};
use reth_rpc_layer::{AuthLayer, JwtAuthValidator, JwtSecret};
use std::sync::Arc;
use tower::ServiceBuilder;

/// Collects the configuration and out-of-scope collaborators a node needs and launches it.
///
/// Mirrors the shape of `reth`'s own node builder: collaborators are supplied once, then
/// [`Self::launch`] drives the construct-engine / spawn-driver / spawn-sealing-loop / bind-rpc
/// sequence in one place.
#[derive(Debug, Clone)]
pub struct NodeBuilder<D, X, P, S> {
    db: D,
    executor: X,
    pool: P,
    signer: S,
    engine_config: EngineConfig,
    sealing_config: SealingConfig,
}

impl<D, X, P, S> NodeBuilder<D, X, P, S>
where
    D: ChainDatabase + Clone + 'static,
    X: StateExecutor + Clone + 'static,
    P: TransactionPoolHandle + Clone + 'static,
    S: CliqueSigner + Clone + 'static,
{
    /// Creates a builder from the node's out-of-scope collaborators and its configuration.
    pub fn new(
        db: D,
        executor: X,
        pool: P,
        signer: S,
        engine_config: EngineConfig,
        sealing_config: SealingConfig,
    ) -> Self {
        Self { db, executor, pool, signer, engine_config, sealing_config }
    }

    /// Launches the node: spawns the Engine API driver and the Clique sealing loop, binds the
    /// JWT-authenticated Engine API JSON-RPC server, and returns handles to all three.
    pub async fn launch(self) -> eyre::Result<LaunchedNode> {
        let Self { db, executor, pool, signer, engine_config, sealing_config } = self;

        let latch = Arc::new(MergeLatch::new());
        let (handle, engine) =
            BeaconConsensusEngine::new(db.clone(), executor.clone(), pool.clone(), latch.clone(), engine_config);
        let engine_task = tokio::spawn(engine.run());

        let sealing_loop =
            SealingLoop::new(db, executor, pool, signer, latch, sealing_config.clique_period);
        let sealing_task = tokio::spawn(sealing_loop.run());

        let jwt_secret = JwtSecret::from_file(&sealing_config.jwt_secret_path)?;
        let validator = JwtAuthValidator::new(jwt_secret);
        let auth_middleware = ServiceBuilder::new().layer(AuthLayer::new(validator));

        let server = ServerBuilder::default()
            .set_http_middleware(auth_middleware)
            .build(sealing_config.auth_rpc_addr)
            .await?;
        let local_addr = server.local_addr()?;

        let module = EngineApiRpc::new(handle.clone()).into_rpc_module();
        let rpc_handle = server.start(module);

        tracing::info!(target: "engine::rpc", addr = %local_addr, "authenticated Engine API server started");

        Ok(LaunchedNode { engine_handle: handle, rpc_addr: local_addr, rpc_handle, engine_task, sealing_task })
    }
}

/// Handles to a node's running tasks and servers, returned by [`NodeBuilder::launch`].
#[must_use = "dropping this stops nothing; hold it for the node's lifetime or call `stop`"]
pub struct LaunchedNode {
    /// Handle to the running Engine API driver.
    pub engine_handle: BeaconConsensusEngineHandle,
    /// The socket address the authenticated Engine API server bound to.
    pub rpc_addr: std::net::SocketAddr,
    /// Handle to the running JSON-RPC server.
    pub rpc_handle: ServerHandle,
    engine_task: tokio::task::JoinHandle<()>,
    sealing_task: tokio::task::JoinHandle<()>,
}

impl LaunchedNode {
    /// Stops the RPC server and aborts the engine driver and sealing loop tasks.
    pub fn stop(self) -> eyre::Result<()> {
        self.rpc_handle.stop()?;
        self.engine_task.abort();
        self.sealing_task.abort();
        Ok(())
    }
}

impl std::fmt::Debug for LaunchedNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LaunchedNode").field("rpc_addr", &self.rpc_addr).finish_non_exhaustive()
    }
}
