// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use ccm_utils::ArcBytes;
use serde::{Deserialize, Serialize};

use crate::CorrelationId;

/// Logical envelope carried on the aggregator topic.
///
/// The broker delivers at least once and in any order, so the same envelope may arrive several
/// times from the same participant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastAggregatorMessage {
    pub correlation_id: CorrelationId,
    pub payload: ArcBytes,
    /// Set when the participant reports that it could not produce its contribution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BroadcastAggregatorMessage {
    pub fn new(correlation_id: CorrelationId, payload: impl Into<ArcBytes>) -> Self {
        Self {
            correlation_id,
            payload: payload.into(),
            error: None,
        }
    }

    pub fn failure(correlation_id: CorrelationId, reason: impl Into<String>) -> Self {
        Self {
            correlation_id,
            payload: ArcBytes::default(),
            error: Some(reason.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}
