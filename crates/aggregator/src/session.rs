// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use std::{
    collections::{BTreeMap, BTreeSet},
    sync::{Mutex, MutexGuard},
    time::Duration,
};

use actix::Message;
use ccm_crypto::ct_eq;
use ccm_events::{BallotBoxId, CorrelationId, ElectionEventId, MixDecKey, NodeId};
use ccm_mixdec::MixDecStatusTracker;
use ccm_utils::ArcBytes;
use tokio::{sync::watch, time::Instant};

use crate::{AggregatorError, QuorumPolicy};

/// Decides what makes a contribution usable.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum SessionScope {
    /// Every payload without an error is usable.
    #[default]
    Open,
    /// A payload is usable once the sender's mix-decrypt cell for this ballot box is `MIXED`.
    BallotBox(ElectionEventId, BallotBoxId),
}

/// Result of a session. Everything but `Pending` is terminal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Pending,
    /// Usable payloads keyed by sender.
    Complete(BTreeMap<NodeId, ArcBytes>),
    /// The deadline passed before quorum. `missing` lists the participants that never answered.
    TimedOut { missing: BTreeSet<NodeId> },
    Failed(String),
}

impl Outcome {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Outcome::Pending)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Pending => "pending",
            Outcome::Complete(_) => "complete",
            Outcome::TimedOut { .. } => "timed_out",
            Outcome::Failed(_) => "failed",
        }
    }
}

/// Parameters of a new session.
#[derive(Clone, Debug)]
pub struct Registration {
    pub correlation_id: CorrelationId,
    pub expected: BTreeSet<NodeId>,
    pub deadline: Instant,
    pub quorum: QuorumPolicy,
    pub scope: SessionScope,
}

impl Registration {
    pub fn new(
        correlation_id: CorrelationId,
        expected: impl IntoIterator<Item = NodeId>,
        deadline: Instant,
    ) -> Self {
        Self {
            correlation_id,
            expected: expected.into_iter().collect(),
            deadline,
            quorum: QuorumPolicy::default(),
            scope: SessionScope::default(),
        }
    }

    pub fn with_quorum(mut self, quorum: QuorumPolicy) -> Self {
        self.quorum = quorum;
        self
    }

    pub fn with_scope(mut self, scope: SessionScope) -> Self {
        self.scope = scope;
        self
    }
}

/// Emitted once per session when it leaves `Pending`.
#[derive(Message, Clone, Debug, PartialEq, Eq)]
#[rtype(result = "()")]
pub struct SessionResolved {
    pub correlation_id: CorrelationId,
    pub scope: SessionScope,
    pub outcome: Outcome,
}

/// Point-in-time view of a session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub correlation_id: CorrelationId,
    pub outcome: Outcome,
    pub expected: usize,
    pub quorum: usize,
    pub responded: usize,
    pub usable: usize,
    pub deadline: Instant,
}

#[derive(Clone, Debug)]
pub(crate) struct Contribution {
    payload: ArcBytes,
    error: Option<String>,
}

impl Contribution {
    pub(crate) fn new(payload: ArcBytes, error: Option<String>) -> Self {
        Self { payload, error }
    }

    fn same_as(&self, other: &Contribution) -> bool {
        self.error == other.error && ct_eq(&self.payload, &other.payload)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Usability {
    Usable,
    Unusable,
    Undecided,
}

/// What happened to an inbound contribution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Recorded {
    New,
    Duplicate,
    Conflicting,
}

pub(crate) struct SessionState {
    contributions: BTreeMap<NodeId, Contribution>,
    outcome: Outcome,
    resolved_at: Option<Instant>,
}

impl SessionState {
    pub(crate) fn outcome(&self) -> &Outcome {
        &self.outcome
    }
}

pub(crate) struct Session {
    id: CorrelationId,
    expected: BTreeSet<NodeId>,
    quorum: usize,
    scope: SessionScope,
    deadline: Instant,
    state: Mutex<SessionState>,
    outcome_tx: watch::Sender<Outcome>,
}

impl Session {
    pub(crate) fn new(registration: Registration) -> Result<Self, AggregatorError> {
        let quorum = registration.quorum.resolve(registration.expected.len())?;
        let (outcome_tx, _) = watch::channel(Outcome::Pending);
        Ok(Self {
            id: registration.correlation_id,
            expected: registration.expected,
            quorum,
            scope: registration.scope,
            deadline: registration.deadline,
            state: Mutex::new(SessionState {
                contributions: BTreeMap::new(),
                outcome: Outcome::Pending,
                resolved_at: None,
            }),
            outcome_tx,
        })
    }

    pub(crate) fn id(&self) -> &CorrelationId {
        &self.id
    }

    pub(crate) fn deadline(&self) -> Instant {
        self.deadline
    }

    pub(crate) fn expects(&self, sender: &NodeId) -> bool {
        self.expected.contains(sender)
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<Outcome> {
        self.outcome_tx.subscribe()
    }

    pub(crate) fn outcome(&self) -> Outcome {
        self.lock().outcome.clone()
    }

    pub(crate) fn is_pending(&self) -> bool {
        !self.lock().outcome.is_terminal()
    }

    /// True once the session has been terminal for at least `grace_period`.
    pub(crate) fn expired(&self, now: Instant, grace_period: Duration) -> bool {
        matches!(self.lock().resolved_at, Some(at) if now.saturating_duration_since(at) >= grace_period)
    }

    pub(crate) fn record(
        &self,
        state: &mut SessionState,
        sender: &NodeId,
        contribution: Contribution,
    ) -> Recorded {
        match state.contributions.get(sender) {
            Some(existing) if existing.same_as(&contribution) => Recorded::Duplicate,
            Some(_) => Recorded::Conflicting,
            None => {
                state.contributions.insert(sender.clone(), contribution);
                Recorded::New
            }
        }
    }

    fn usability(
        &self,
        sender: &NodeId,
        contribution: &Contribution,
        tracker: &MixDecStatusTracker,
    ) -> Usability {
        if contribution.error.is_some() {
            return Usability::Unusable;
        }
        match &self.scope {
            SessionScope::Open => Usability::Usable,
            SessionScope::BallotBox(election_event_id, ballot_box_id) => {
                let status = tracker.status(&MixDecKey::new(
                    sender.clone(),
                    election_event_id.clone(),
                    ballot_box_id.clone(),
                ));
                if status.is_usable() {
                    Usability::Usable
                } else if status.is_final() {
                    Usability::Unusable
                } else {
                    Usability::Undecided
                }
            }
        }
    }

    fn tally(
        &self,
        state: &SessionState,
        tracker: &MixDecStatusTracker,
    ) -> (BTreeMap<NodeId, ArcBytes>, usize) {
        let mut usable = BTreeMap::new();
        let mut undecided = 0;
        for (sender, contribution) in &state.contributions {
            match self.usability(sender, contribution, tracker) {
                Usability::Usable => {
                    usable.insert(sender.clone(), contribution.payload.clone());
                }
                Usability::Undecided => undecided += 1,
                Usability::Unusable => {}
            }
        }
        (usable, undecided)
    }

    /// Outcome the current contributions justify, ignoring the deadline.
    pub(crate) fn evaluate(&self, state: &SessionState, tracker: &MixDecStatusTracker) -> Outcome {
        let (usable, undecided) = self.tally(state, tracker);
        if usable.len() >= self.quorum {
            return Outcome::Complete(usable);
        }
        let silent = self.expected.len() - state.contributions.len();
        let reachable = usable.len() + undecided + silent;
        if reachable < self.quorum {
            return Outcome::Failed(format!(
                "quorum of {} unreachable: {} usable, {} undecided, {} silent",
                self.quorum,
                usable.len(),
                undecided,
                silent
            ));
        }
        Outcome::Pending
    }

    pub(crate) fn timed_out(&self, state: &SessionState) -> Outcome {
        Outcome::TimedOut {
            missing: self
                .expected
                .iter()
                .filter(|n| !state.contributions.contains_key(*n))
                .cloned()
                .collect(),
        }
    }

    /// Move to `outcome` if the session is still pending and `outcome` is terminal. Returns the
    /// resolution exactly once.
    pub(crate) fn settle(
        &self,
        state: &mut SessionState,
        outcome: Outcome,
        now: Instant,
    ) -> Option<SessionResolved> {
        if state.outcome.is_terminal() || !outcome.is_terminal() {
            return None;
        }
        state.outcome = outcome.clone();
        state.resolved_at = Some(now);
        self.outcome_tx.send_replace(outcome.clone());
        Some(SessionResolved {
            correlation_id: self.id.clone(),
            scope: self.scope.clone(),
            outcome,
        })
    }

    pub(crate) fn snapshot(&self, tracker: &MixDecStatusTracker) -> SessionSnapshot {
        let state = self.lock();
        let (usable, _) = self.tally(&state, tracker);
        SessionSnapshot {
            correlation_id: self.id.clone(),
            outcome: state.outcome.clone(),
            expected: self.expected.len(),
            quorum: self.quorum,
            responded: state.contributions.len(),
            usable: usable.len(),
            deadline: self.deadline,
        }
    }
}
