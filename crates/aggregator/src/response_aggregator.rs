// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use std::{sync::Arc, time::Duration};

use actix::MessageResponse;
use ccm_events::{BroadcastAggregatorMessage, CorrelationId, NodeId};
use ccm_mixdec::MixDecStatusTracker;
use tokio::{
    sync::mpsc,
    time::{timeout_at, Instant},
};
use tracing::{debug, info, warn};

use crate::{
    session::{Contribution, Recorded, Session},
    AggregatorError, Outcome, Registration, SessionResolved, SessionSnapshot, SessionStore,
};

pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(300);

/// What happened to an inbound message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, MessageResponse)]
pub enum Delivery {
    /// First contribution of this sender.
    Accepted,
    /// Same content as already stored.
    Duplicate,
    /// Stored after the session reached its terminal state.
    Late,
    /// Different content from a sender that already contributed.
    Equivocation,
    UnknownCorrelation,
    UnexpectedSender,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, MessageResponse)]
pub struct SweepReport {
    /// Sessions that resolved during this sweep, by any outcome.
    pub resolved: Vec<CorrelationId>,
    pub timed_out: Vec<CorrelationId>,
    pub purged: Vec<CorrelationId>,
}

/// Groups broadcast responses by correlation id and resolves each session once a quorum of
/// usable contributions exists, the quorum becomes unreachable, or the deadline passes.
///
/// Message handling is synchronous and never blocks on other sessions. Callers wait for results
/// with [`ResponseAggregator::await_outcome`].
pub struct ResponseAggregator {
    store: Arc<SessionStore>,
    tracker: Arc<MixDecStatusTracker>,
    downstream: Option<mpsc::UnboundedSender<SessionResolved>>,
    grace_period: Duration,
}

impl ResponseAggregator {
    pub fn new(store: Arc<SessionStore>, tracker: Arc<MixDecStatusTracker>) -> Self {
        Self {
            store,
            tracker,
            downstream: None,
            grace_period: DEFAULT_GRACE_PERIOD,
        }
    }

    /// Channel receiving one [`SessionResolved`] per session.
    pub fn with_downstream(mut self, downstream: mpsc::UnboundedSender<SessionResolved>) -> Self {
        self.downstream = Some(downstream);
        self
    }

    /// How long terminal sessions stay queryable before a sweep purges them.
    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn tracker(&self) -> &Arc<MixDecStatusTracker> {
        &self.tracker
    }

    fn release(&self, resolved: Option<SessionResolved>) {
        let Some(resolved) = resolved else {
            return;
        };
        info!(
            correlation_id = %resolved.correlation_id,
            outcome = resolved.outcome.label(),
            "session resolved"
        );
        if let Some(downstream) = &self.downstream {
            if downstream.send(resolved).is_err() {
                warn!("downstream receiver dropped, resolution not delivered");
            }
        }
    }

    /// Open a pending session.
    pub fn register(&self, registration: Registration) -> Result<(), AggregatorError> {
        let id = registration.correlation_id.clone();
        let expected = registration.expected.len();
        let session = self.store.insert(registration)?;
        info!(
            correlation_id = %id,
            expected,
            deadline_in = ?session.deadline().saturating_duration_since(Instant::now()),
            "session registered"
        );
        Ok(())
    }

    /// Record a message from `sender`.
    ///
    /// Messages for unknown sessions or from senders outside the expected set are logged and
    /// dropped; they never affect a session.
    pub fn on_message(&self, message: BroadcastAggregatorMessage, sender: &NodeId) -> Delivery {
        let id = message.correlation_id.clone();
        let Some(session) = self.store.get(&id) else {
            debug!(correlation_id = %id, sender = %sender, "dropping message for unknown session");
            return Delivery::UnknownCorrelation;
        };
        if !session.expects(sender) {
            warn!(correlation_id = %id, sender = %sender, "dropping message from unexpected sender");
            return Delivery::UnexpectedSender;
        }

        let contribution = Contribution::new(message.payload, message.error);
        let now = Instant::now();
        let mut state = session.lock();

        // a deadline that passed unnoticed wins over whatever this message would change
        let mut resolved = None;
        if !state.outcome().is_terminal() && now >= session.deadline() {
            let timed_out = session.timed_out(&state);
            resolved = session.settle(&mut state, timed_out, now);
        }

        let terminal = state.outcome().is_terminal();
        let delivery = match (session.record(&mut state, sender, contribution), terminal) {
            (Recorded::Duplicate, _) => {
                debug!(correlation_id = %id, sender = %sender, "duplicate delivery");
                Delivery::Duplicate
            }
            (Recorded::Conflicting, _) => {
                warn!(correlation_id = %id, sender = %sender, "sender equivocated");
                resolved = resolved.or(session.settle(
                    &mut state,
                    Outcome::Failed(format!("equivocation by {sender}")),
                    now,
                ));
                Delivery::Equivocation
            }
            (Recorded::New, true) => {
                debug!(correlation_id = %id, sender = %sender, "late contribution recorded");
                Delivery::Late
            }
            (Recorded::New, false) => {
                let outcome = session.evaluate(&state, &self.tracker);
                resolved = session.settle(&mut state, outcome, now);
                Delivery::Accepted
            }
        };
        drop(state);
        self.release(resolved);
        delivery
    }

    /// Recompute a pending session, typically after its participants' mix-decrypt statuses
    /// changed.
    pub fn reevaluate(&self, id: &CorrelationId) -> Result<Outcome, AggregatorError> {
        let session = self
            .store
            .get(id)
            .ok_or_else(|| AggregatorError::UnknownCorrelation(id.clone()))?;
        Ok(self.evaluate_session(&session, Instant::now()))
    }

    /// Evaluate and, past the deadline, time out.
    fn evaluate_session(&self, session: &Session, now: Instant) -> Outcome {
        let mut state = session.lock();
        let mut outcome = session.evaluate(&state, &self.tracker);
        if !outcome.is_terminal() && now >= session.deadline() {
            outcome = session.timed_out(&state);
        }
        let resolved = session.settle(&mut state, outcome, now);
        let current = state.outcome().clone();
        drop(state);
        self.release(resolved);
        current
    }

    /// Wait until the session is terminal or `call_timeout` elapses, whichever comes first.
    ///
    /// A session whose own deadline passes while waiting resolves as `TimedOut`. Expiry of
    /// `call_timeout` leaves the session untouched and returns
    /// [`AggregatorError::AwaitTimeout`].
    pub async fn await_outcome(
        &self,
        id: &CorrelationId,
        call_timeout: Duration,
    ) -> Result<Outcome, AggregatorError> {
        let session = self
            .store
            .get(id)
            .ok_or_else(|| AggregatorError::UnknownCorrelation(id.clone()))?;
        let call_deadline = Instant::now() + call_timeout;
        let mut outcome_rx = session.subscribe();

        loop {
            let current = session.outcome();
            if current.is_terminal() {
                return Ok(current);
            }
            let wake = session.deadline().min(call_deadline);
            match timeout_at(wake, outcome_rx.changed()).await {
                Ok(Ok(())) => continue,
                // the sender lives as long as the session we hold
                Ok(Err(_)) => return Ok(session.outcome()),
                Err(_) => {
                    let now = Instant::now();
                    if now >= session.deadline() {
                        let outcome = self.evaluate_session(&session, now);
                        if outcome.is_terminal() {
                            return Ok(outcome);
                        }
                    }
                    if now >= call_deadline {
                        return Err(AggregatorError::AwaitTimeout(id.clone()));
                    }
                }
            }
        }
    }

    pub fn status(&self, id: &CorrelationId) -> Option<SessionSnapshot> {
        self.store
            .get(id)
            .map(|session| session.snapshot(&self.tracker))
    }

    /// Re-evaluate pending sessions, time out those past their deadline and purge terminal
    /// sessions older than the grace period.
    pub fn sweep(&self, now: Instant) -> SweepReport {
        let mut report = SweepReport::default();
        for session in self.store.all() {
            if session.is_pending() {
                let outcome = self.evaluate_session(&session, now);
                if outcome.is_terminal() {
                    report.resolved.push(session.id().clone());
                    if matches!(outcome, Outcome::TimedOut { .. }) {
                        report.timed_out.push(session.id().clone());
                    }
                }
                continue;
            }
            if self
                .store
                .remove_if(session.id(), |s| s.expired(now, self.grace_period))
            {
                debug!(correlation_id = %session.id(), "purged terminal session");
                report.purged.push(session.id().clone());
            }
        }
        if !report.timed_out.is_empty() {
            warn!(timed_out = ?report.timed_out, "sessions timed out");
        }
        report
    }
}
