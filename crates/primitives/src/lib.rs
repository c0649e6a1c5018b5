//! Block, header and execution-payload primitives shared by the engine subsystem.
//!
//! The EVM interpreter, account state database, transaction pool and devp2p stack are external
//! collaborators referenced only by their contracts elsewhere in the workspace; this crate only
//! holds the data shapes that cross those boundaries.

mod header;
mod payload;

pub use header::{Header, SealedHeader};
pub use payload::{transactions_root, Block, BlockBody, SealedBlock};

pub use alloy_primitives::{Address, BlockHash, BlockNumber, Bloom, Bytes, B256, B64, U256};
