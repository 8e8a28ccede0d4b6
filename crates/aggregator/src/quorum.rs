// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use serde::{Deserialize, Serialize};

use crate::AggregatorError;

/// How many usable contributions complete a session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuorumPolicy {
    /// Every expected participant.
    #[default]
    Unanimous,
    /// At least `n` distinct participants, for Byzantine tolerant rounds.
    Threshold(usize),
}

impl QuorumPolicy {
    /// Resolve against the size of the expected participant set.
    pub fn resolve(&self, participants: usize) -> Result<usize, AggregatorError> {
        let quorum = match self {
            QuorumPolicy::Unanimous => participants,
            QuorumPolicy::Threshold(n) => *n,
        };
        if quorum == 0 || quorum > participants {
            return Err(AggregatorError::InvalidQuorum {
                quorum,
                participants,
            });
        }
        Ok(quorum)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unanimous_needs_everyone() {
        assert_eq!(QuorumPolicy::Unanimous.resolve(4), Ok(4));
    }

    #[test]
    fn threshold_must_fit_the_participants() {
        assert_eq!(QuorumPolicy::Threshold(3).resolve(4), Ok(3));
        assert_eq!(
            QuorumPolicy::Threshold(5).resolve(4),
            Err(AggregatorError::InvalidQuorum {
                quorum: 5,
                participants: 4
            })
        );
        assert!(QuorumPolicy::Threshold(0).resolve(4).is_err());
        assert!(QuorumPolicy::Unanimous.resolve(0).is_err());
    }
}
