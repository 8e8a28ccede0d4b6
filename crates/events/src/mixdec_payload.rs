// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use core::fmt;

use ccm_utils::ArcBytes;
use serde::{Deserialize, Serialize};

use crate::{BallotBoxId, ElectionEventId, NodeId};

/// Addresses one node's view of one ballot box.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MixDecKey {
    pub node_id: NodeId,
    pub election_event_id: ElectionEventId,
    pub ballot_box_id: BallotBoxId,
}

impl MixDecKey {
    pub fn new(
        node_id: impl Into<NodeId>,
        election_event_id: impl Into<ElectionEventId>,
        ballot_box_id: impl Into<BallotBoxId>,
    ) -> Self {
        Self {
            node_id: node_id.into(),
            election_event_id: election_event_id.into(),
            ballot_box_id: ballot_box_id.into(),
        }
    }
}

impl fmt::Display for MixDecKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.node_id, self.election_event_id, self.ballot_box_id
        )
    }
}

/// Output of one node's mix-and-decrypt step, written by the mix-net pipeline.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MixDecPayload {
    pub key: MixDecKey,
    pub payload: ArcBytes,
    /// True for the first node in the mixing chain.
    pub initial: bool,
}
