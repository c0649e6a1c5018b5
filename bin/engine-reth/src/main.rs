//! `engine-reth`: a standalone Engine API driver and sealing subsystem node.
//!
//! Wires [`reth_node_builder::NodeBuilder`] to an in-memory chain database, state executor,
//! transaction pool and Clique signer (see [`demo`]) and runs until interrupted. The four
//! out-of-scope collaborators are swapped for real ones in a full node; this binary exists to
//! exercise the Engine API surface end to end.

mod demo;

use alloy_primitives::U256;
use alloy_rpc_types_engine::TransitionConfiguration;
use clap::Parser;
use reth_beacon_consensus::EngineConfig;
use reth_engine_payload_cache::DEFAULT_CACHE_CAPACITY;
use reth_node_builder::{NodeBuilder, SealingConfig};
use std::{net::SocketAddr, path::PathBuf, time::Duration};

/// Command-line configuration for the Engine API driver and sealing subsystem.
#[derive(Debug, Parser)]
#[command(name = "engine-reth", about = "Engine API driver and sealing subsystem")]
struct Args {
    /// Terminal total difficulty, as a decimal integer.
    #[arg(long, default_value = "0")]
    ttd: U256,

    /// Path to the 32-byte hex-encoded JWT secret shared with the consensus client.
    #[arg(long)]
    jwt_secret_path: PathBuf,

    /// Socket address the authenticated Engine API JSON-RPC server binds to.
    #[arg(long, default_value_t = SocketAddr::from(([127, 0, 0, 1], SealingConfig::DEFAULT_AUTH_PORT)))]
    auth_rpc_addr: SocketAddr,

    /// Period, in seconds, between Clique block productions while the merge latch is un-latched.
    #[arg(long, default_value_t = 15)]
    clique_period_secs: u64,

    /// Bound on both payload-cache maps.
    #[arg(long, default_value_t = DEFAULT_CACHE_CAPACITY)]
    payload_cache_capacity: u32,
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let genesis = demo::demo_genesis();
    let db = demo::InMemoryChainDatabase::with_genesis(genesis.clone(), args.ttd);

    let engine_config = EngineConfig {
        ttd: args.ttd,
        transition_configuration: TransitionConfiguration {
            terminal_total_difficulty: args.ttd,
            terminal_block_hash: Default::default(),
            terminal_block_number: Default::default(),
        },
        payload_cache_capacity: args.payload_cache_capacity,
    };
    let sealing_config = SealingConfig {
        clique_period: Duration::from_secs(args.clique_period_secs),
        jwt_secret_path: args.jwt_secret_path,
        auth_rpc_addr: args.auth_rpc_addr,
    };

    let builder = NodeBuilder::new(
        db,
        demo::TrustingStateExecutor,
        demo::EmptyTransactionPool,
        demo::PlaceholderSigner::new(genesis.beneficiary),
        engine_config,
        sealing_config,
    );

    let node = builder.launch().await?;
    tracing::info!(target: "engine::rpc", addr = %node.rpc_addr, "engine-reth running, awaiting shutdown signal");

    tokio::signal::ctrl_c().await?;
    tracing::info!(target: "engine::rpc", "shutdown signal received");
    node.stop()?;
    Ok(())
}
