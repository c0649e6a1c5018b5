//! Shared types, error taxonomy, and collaborator traits for the Engine API driver.
//!
//! Wire types that already have a canonical shape — `ForkchoiceState`, `PayloadAttributes`,
//! `PayloadId`, `TransitionConfiguration` — are re-exported from `alloy-rpc-types-engine` rather
//! than redefined here. `PayloadStatus` is the one exception: V1's wire contract distinguishes
//! `INVALID_BLOCK_HASH`/`INVALID_TERMINAL_BLOCK` from a plain `INVALID`, which the upstream crate
//! no longer models, so this crate defines its own.

mod error;
mod latch;
mod payload_id;
mod status;
mod traits;

pub use error::EngineError;
pub use latch::MergeLatch;
pub use payload_id::compute_payload_id;
pub use status::{PayloadStatus, PayloadStatusEnum};
pub use traits::{ChainDatabase, ExecutionOutcome, StateExecutor, TransactionPoolHandle};

pub use alloy_rpc_types_engine::{
    ForkchoiceState, PayloadAttributes, PayloadId, TransitionConfiguration,
};
