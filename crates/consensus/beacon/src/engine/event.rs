use alloy_primitives::B256;
use engine_reth_primitives::SealedHeader;
use tokio::sync::mpsc::UnboundedSender;

/// Notable events the Engine API driver emits as it processes consensus-client directives.
///
/// Supplements the four Engine API calls with an observability stream: nothing in the wire
/// protocol surfaces canonical-chain changes or latch transitions on its own, so a listener that
/// wants to react to reorgs or the Merge transition (e.g. to shut down the legacy downloader once
/// `posFinalized` latches) needs something to subscribe to.
#[derive(Clone, Debug)]
pub enum BeaconConsensusEngineEvent {
    /// A new block was accepted as the canonical chain tip.
    CanonicalChainCommitted {
        /// The new canonical tip.
        head: SealedHeader,
    },
    /// A payload was buffered because its parent was not yet known or validated.
    PayloadBuffered {
        /// Hash of the buffered payload.
        hash: B256,
    },
    /// The TTD was reached for the first time; the sealing loop is now permanently inhibited.
    TtdReached {
        /// The first post-TTD block's hash.
        hash: B256,
    },
    /// A non-zero finalized pointer was observed for the first time.
    PosFinalized {
        /// The finalized block's hash.
        hash: B256,
    },
}

/// A fan-out list of event listener channels, owned by the engine actor.
///
/// Listeners are plain unbounded channels rather than a broadcast channel: events here are rare
/// (at most one per processed message) and a closed receiver is simply pruned on the next
/// broadcast rather than requiring every listener to keep pace with a shared ring buffer.
#[derive(Debug, Default)]
pub struct EventListeners {
    listeners: Vec<UnboundedSender<BeaconConsensusEngineEvent>>,
}

impl EventListeners {
    /// Registers a new listener.
    pub fn push(&mut self, listener: UnboundedSender<BeaconConsensusEngineEvent>) {
        self.listeners.push(listener);
    }

    /// Broadcasts `event` to every live listener, dropping any whose receiver has gone away.
    pub fn notify(&mut self, event: BeaconConsensusEngineEvent) {
        self.listeners.retain(|listener| listener.send(event.clone()).is_ok());
    }

    /// Number of currently registered listeners.
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// Returns `true` if there are no registered listeners.
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}
