// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use core::fmt;

use ccm_events::BallotBoxId;
use serde::{Deserialize, Serialize};

use crate::StatusError;

/// Where one node stands with the mixing and partial decryption of one ballot box.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MixDecStatus {
    #[default]
    Unknown,
    NotClosed,
    NotFound,
    Processing,
    Mixed,
    Error,
}

impl MixDecStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MixDecStatus::Unknown => "UNKNOWN",
            MixDecStatus::NotClosed => "NOT_CLOSED",
            MixDecStatus::NotFound => "NOT_FOUND",
            MixDecStatus::Processing => "PROCESSING",
            MixDecStatus::Mixed => "MIXED",
            MixDecStatus::Error => "ERROR",
        }
    }

    /// Only a mixed contribution counts toward a quorum.
    pub fn is_usable(&self) -> bool {
        matches!(self, MixDecStatus::Mixed)
    }

    /// The node has answered for good: its contribution will not change without an operator
    /// retry.
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            MixDecStatus::Mixed | MixDecStatus::Error | MixDecStatus::NotFound
        )
    }

    /// Mixing was handed to the node and has not been retried since.
    pub fn has_started(&self) -> bool {
        matches!(self, MixDecStatus::Processing | MixDecStatus::Mixed)
    }

    /// Check `self -> to`. Staying in the same status is always allowed.
    pub fn check_transition(self, to: MixDecStatus) -> Result<(), StatusError> {
        use MixDecStatus::*;
        let legal = self == to
            || matches!(
                (self, to),
                (_, NotFound)
                    | (Unknown, NotClosed)
                    | (Unknown | NotClosed, Processing)
                    | (Processing, Mixed)
                    | (Processing, Error)
                    | (Error, Processing)
            );
        if legal {
            Ok(())
        } else {
            Err(StatusError::IllegalTransition { from: self, to })
        }
    }
}

impl fmt::Display for MixDecStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Report returned for every ballot box handed to `start_ballot_boxes`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BallotBoxStatus {
    pub ballot_box_id: BallotBoxId,
    pub process_status: MixDecStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}
