use alloy_primitives::B256;
use alloy_rpc_types_engine::ForkchoiceState;

/// Remembers the most recent fork-choice state the engine has accepted, so repeated updates to
/// the same head can be recognized as a no-op reorg (component design, forkchoiceUpdated step 4).
#[derive(Debug, Default)]
pub struct ForkchoiceStateTracker {
    last: Option<ForkchoiceState>,
}

impl ForkchoiceStateTracker {
    /// Returns the most recently accepted fork-choice state, if any.
    pub const fn last(&self) -> Option<&ForkchoiceState> {
        self.last.as_ref()
    }

    /// Returns `true` if `head` is the head of the most recently accepted state.
    pub fn is_same_head(&self, head: B256) -> bool {
        self.last.as_ref().is_some_and(|state| state.head_block_hash == head)
    }

    /// Records a newly accepted fork-choice state.
    pub fn set(&mut self, state: ForkchoiceState) {
        self.last = Some(state);
    }
}
