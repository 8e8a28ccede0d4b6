// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use std::{
    collections::HashMap,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use ccm_events::{BallotBoxId, ElectionEventId, MixDecKey, MixDecPayload, NodeId};
use tracing::{info, warn};

use crate::{BallotBoxStatus, MixDecStatus, StatusError};

pub const ALREADY_STARTED: &str = "ballot box mixing has already started";

/// Status of one (node, election event, ballot box) together with the last failure reason.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StatusCell {
    pub status: MixDecStatus,
    pub error_message: Option<String>,
}

#[derive(Default)]
struct Entry {
    cell: StatusCell,
    payload: Option<MixDecPayload>,
}

/// Thread-safe table of mix-decrypt status cells.
///
/// Cells start out `UNKNOWN`. Every change goes through [`MixDecStatus::check_transition`], so the
/// table never holds a status that could not have been reached from `UNKNOWN`.
#[derive(Default)]
pub struct MixDecStatusTracker {
    cells: RwLock<HashMap<MixDecKey, Entry>>,
}

impl MixDecStatusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<MixDecKey, Entry>> {
        self.cells
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<MixDecKey, Entry>> {
        self.cells
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn status(&self, key: &MixDecKey) -> MixDecStatus {
        self.read()
            .get(key)
            .map(|e| e.cell.status)
            .unwrap_or_default()
    }

    pub fn cell(&self, key: &MixDecKey) -> StatusCell {
        self.read()
            .get(key)
            .map(|e| e.cell.clone())
            .unwrap_or_default()
    }

    /// Move the cell to `to`, returning the status it had before.
    ///
    /// `error_message` is stored for `ERROR` and cleared on every other status.
    pub fn transition(
        &self,
        key: &MixDecKey,
        to: MixDecStatus,
        error_message: Option<String>,
    ) -> Result<MixDecStatus, StatusError> {
        let mut cells = self.write();
        let entry = cells.entry(key.clone()).or_default();
        apply(key, entry, to, error_message)
    }

    pub fn mark_error(
        &self,
        key: &MixDecKey,
        message: impl Into<String>,
    ) -> Result<MixDecStatus, StatusError> {
        self.transition(key, MixDecStatus::Error, Some(message.into()))
    }

    /// Store the output of a node's mixing step and mark the cell `MIXED`.
    pub fn record_payload(&self, payload: MixDecPayload) -> Result<(), StatusError> {
        let mut cells = self.write();
        let entry = cells.entry(payload.key.clone()).or_default();
        entry.cell.status.check_transition(MixDecStatus::Mixed)?;
        if entry.cell.status != MixDecStatus::Mixed {
            info!(key = %payload.key, "mix-decrypt payload recorded");
        }
        entry.cell = StatusCell {
            status: MixDecStatus::Mixed,
            error_message: None,
        };
        entry.payload = Some(payload);
        Ok(())
    }

    pub fn payload(&self, key: &MixDecKey) -> Option<MixDecPayload> {
        self.read().get(key).and_then(|e| e.payload.clone())
    }

    pub fn is_mixed(&self, key: &MixDecKey) -> bool {
        self.status(key) == MixDecStatus::Mixed
    }

    /// Hand a batch of ballot boxes to `node` for mixing.
    ///
    /// Boxes already in flight or mixed are reported as `ERROR` and left untouched. Every other
    /// box is moved to `PROCESSING` if its current status allows it.
    pub fn start_ballot_boxes(
        &self,
        node_id: &NodeId,
        election_event_id: &ElectionEventId,
        ballot_box_ids: &[BallotBoxId],
    ) -> Vec<BallotBoxStatus> {
        ballot_box_ids
            .iter()
            .map(|ballot_box_id| {
                let key = MixDecKey::new(
                    node_id.clone(),
                    election_event_id.clone(),
                    ballot_box_id.clone(),
                );
                // the started check and the move share one write guard
                let mut cells = self.write();
                let entry = cells.entry(key.clone()).or_default();
                let current = entry.cell.status;
                if current.has_started() {
                    return BallotBoxStatus {
                        ballot_box_id: ballot_box_id.clone(),
                        process_status: MixDecStatus::Error,
                        error_message: Some(ALREADY_STARTED.to_string()),
                    };
                }
                match apply(&key, entry, MixDecStatus::Processing, None) {
                    Ok(_) => BallotBoxStatus {
                        ballot_box_id: ballot_box_id.clone(),
                        process_status: MixDecStatus::Processing,
                        error_message: None,
                    },
                    Err(e) => BallotBoxStatus {
                        ballot_box_id: ballot_box_id.clone(),
                        process_status: current,
                        error_message: Some(e.to_string()),
                    },
                }
            })
            .collect()
    }

    /// Status of every node known for the ballot box.
    pub fn ballot_box_statuses(
        &self,
        election_event_id: &ElectionEventId,
        ballot_box_id: &BallotBoxId,
    ) -> Vec<(NodeId, StatusCell)> {
        let mut out: Vec<_> = self
            .read()
            .iter()
            .filter(|(k, _)| {
                &k.election_event_id == election_event_id && &k.ballot_box_id == ballot_box_id
            })
            .map(|(k, e)| (k.node_id.clone(), e.cell.clone()))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }
}

fn apply(
    key: &MixDecKey,
    entry: &mut Entry,
    to: MixDecStatus,
    error_message: Option<String>,
) -> Result<MixDecStatus, StatusError> {
    let from = entry.cell.status;
    if let Err(e) = from.check_transition(to) {
        warn!(key = %key, "{e}");
        return Err(e);
    }
    entry.cell.status = to;
    entry.cell.error_message = match to {
        MixDecStatus::Error => error_message,
        _ => None,
    };
    if from != to {
        info!(key = %key, from = %from, to = %to, "mix-decrypt status changed");
    }
    Ok(from)
}
