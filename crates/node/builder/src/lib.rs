//! Wires the Engine API driver, the pre-Merge Clique sealing loop and the authenticated Engine
//! API JSON-RPC surface into a single running node.
//!
//! This is deliberately thin: the chain database, state executor, transaction pool and Clique
//! signer are all out of scope per the purpose & scope section and are supplied by the caller as
//! trait implementations. What this crate owns is the launch sequence reth's own node builder
//! follows — construct the engine actor, spawn its driver task, spawn the sealing loop, bind the
//! authenticated RPC server — not the components themselves.

mod launch;

pub use launch::{LaunchedNode, NodeBuilder};

use std::{net::SocketAddr, path::PathBuf, time::Duration};

/// Sealing-loop and transport configuration beyond [`reth_beacon_consensus::EngineConfig`].
///
/// No CLI or file-loader crate is reintroduced (out of scope as a full subsystem), but this
/// follows the teacher's plain-struct, builder-method configuration style so one can be layered
/// on top without touching [`NodeBuilder`] itself.
#[derive(Debug, Clone)]
pub struct SealingConfig {
    /// Period between Clique block productions while the merge latch is un-latched.
    pub clique_period: Duration,
    /// Path to the 32-byte hex-encoded JWT secret shared with the consensus client.
    pub jwt_secret_path: PathBuf,
    /// Socket address the authenticated Engine API JSON-RPC server binds to.
    pub auth_rpc_addr: SocketAddr,
}

impl SealingConfig {
    /// The Engine API's well-known default auth-server port.
    pub const DEFAULT_AUTH_PORT: u16 = 8551;
}
