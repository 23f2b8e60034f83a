use crate::negotiator::{NegotiatorEvent, PeerConnectionHandle};
use duet_core::{MatchCriteria, ServerEvent};

/// User intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoordinatorCommand {
    Start {
        criteria: MatchCriteria,
        /// Re-enter search automatically after the partner leaves.
        keep_searching: bool,
    },
    /// Abandon the current Room and look for someone else.
    Skip,
    /// Leave everything and release the camera.
    Stop,
}

impl CoordinatorCommand {
    pub fn start(criteria: MatchCriteria) -> Self {
        Self::Start {
            criteria,
            keep_searching: true,
        }
    }
}

/// Everything the coordinator reacts to, one at a time.
#[derive(Debug, Clone, PartialEq)]
pub enum CoordinatorInput {
    Command(CoordinatorCommand),
    Channel(ServerEvent),
    Negotiator(NegotiatorEvent),
    ConnectTimeout { handle: PeerConnectionHandle },
}
