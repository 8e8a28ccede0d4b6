// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use ccm_events::CorrelationId;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AggregatorError {
    #[error("correlation id {0} is already registered and pending")]
    DuplicateCorrelation(CorrelationId),

    #[error("quorum of {quorum} cannot be met by {participants} expected participants")]
    InvalidQuorum { quorum: usize, participants: usize },

    #[error("no session registered for correlation id {0}")]
    UnknownCorrelation(CorrelationId),

    #[error("gave up waiting for session {0}")]
    AwaitTimeout(CorrelationId),
}
