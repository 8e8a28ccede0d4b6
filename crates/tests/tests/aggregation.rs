// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use std::{sync::Arc, time::Duration};

use actix::Addr;
use anyhow::Result;
use ccm_aggregator::{
    Delivery, Inbound, InboundConsumer, Outcome, Registration, ResponseAggregator,
    SessionResolved, SessionScope, SessionStore, SessionSweeper, Sweep,
};
use ccm_config::NodeConfig;
use ccm_events::{
    BallotBoxId, BroadcastAggregatorMessage, CorrelationId, ElectionEventId, MixDecKey,
    MixDecPayload, NodeId,
};
use ccm_mixdec::{MixDecStatus, MixDecStatusTracker};
use ccm_utils::ArcBytes;
use tokio::{sync::mpsc, time::Instant};

const CCMS: [&str; 4] = ["ccm-1", "ccm-2", "ccm-3", "ccm-4"];

fn config(quorum: Option<usize>) -> NodeConfig {
    let mut config = NodeConfig::default();
    config.participants = CCMS.iter().map(|n| n.to_string()).collect();
    config.aggregation.quorum = quorum;
    config
}

struct Cluster {
    config: NodeConfig,
    aggregator: Arc<ResponseAggregator>,
    consumer: Addr<InboundConsumer>,
    resolved: mpsc::UnboundedReceiver<SessionResolved>,
}

impl Cluster {
    fn start(config: NodeConfig) -> Result<Self> {
        config.validate()?;
        let (tx, resolved) = mpsc::unbounded_channel();
        let aggregator = Arc::new(
            ResponseAggregator::new(
                Arc::new(SessionStore::new()),
                Arc::new(MixDecStatusTracker::new()),
            )
            .with_downstream(tx)
            .with_grace_period(config.grace_period()),
        );
        let consumer = InboundConsumer::setup(aggregator.clone());
        Ok(Self {
            config,
            aggregator,
            consumer,
            resolved,
        })
    }

    fn tracker(&self) -> &MixDecStatusTracker {
        self.aggregator.tracker()
    }

    fn register(&self, id: &CorrelationId, scope: SessionScope) -> Result<()> {
        self.aggregator.register(
            Registration::new(
                id.clone(),
                self.config.participants(),
                Instant::now() + self.config.session_deadline(),
            )
            .with_quorum(self.config.quorum())
            .with_scope(scope),
        )?;
        Ok(())
    }

    async fn deliver(&self, message: BroadcastAggregatorMessage, sender: &str) -> Result<Delivery> {
        Ok(self
            .consumer
            .send(Inbound {
                message,
                sender: NodeId::new(sender),
            })
            .await?)
    }

    /// Every resolution released so far.
    fn drain(&mut self) -> Vec<SessionResolved> {
        let mut out = Vec::new();
        while let Ok(resolved) = self.resolved.try_recv() {
            out.push(resolved);
        }
        out
    }
}

fn ballot_box() -> (ElectionEventId, BallotBoxId) {
    (ElectionEventId::new("ee-1"), BallotBoxId::new("bb-1"))
}

/// Run the mix-decrypt step on `node` up to `status`.
fn mix(tracker: &MixDecStatusTracker, node: &str, status: MixDecStatus) -> Result<()> {
    let (ee, bb) = ballot_box();
    let reports = tracker.start_ballot_boxes(&NodeId::new(node), &ee, &[bb.clone()]);
    assert_eq!(reports[0].process_status, MixDecStatus::Processing);
    let key = MixDecKey::new(node, ee, bb);
    match status {
        MixDecStatus::Mixed => tracker.record_payload(MixDecPayload {
            key,
            payload: ArcBytes::from_bytes(node.as_bytes()),
            initial: node == CCMS[0],
        })?,
        MixDecStatus::Error => {
            tracker.mark_error(&key, "shuffle proof failed")?;
        }
        other => {
            tracker.transition(&key, other, None)?;
        }
    }
    Ok(())
}

#[actix::test]
async fn mixed_ballot_box_completes_with_every_payload() -> Result<()> {
    let mut cluster = Cluster::start(config(None))?;
    let (ee, bb) = ballot_box();
    let id = CorrelationId::new("f65f0a1c-mixdec");
    cluster.register(&id, SessionScope::BallotBox(ee, bb))?;

    let waiter = {
        let aggregator = cluster.aggregator.clone();
        let id = id.clone();
        tokio::spawn(async move { aggregator.await_outcome(&id, Duration::from_secs(5)).await })
    };

    for node in CCMS {
        mix(cluster.tracker(), node, MixDecStatus::Mixed)?;
        let message = BroadcastAggregatorMessage::new(id.clone(), node.as_bytes().to_vec());
        assert_eq!(cluster.deliver(message.clone(), node).await?, Delivery::Accepted);
        // redelivered by the broker
        assert_eq!(cluster.deliver(message, node).await?, Delivery::Duplicate);
    }

    let Outcome::Complete(payloads) = waiter.await?? else {
        anyhow::bail!("session did not complete");
    };
    assert_eq!(payloads.len(), 4);
    assert_eq!(&payloads[&NodeId::new("ccm-3")][..], b"ccm-3");

    let released = cluster.drain();
    assert_eq!(released.len(), 1);
    assert_eq!(released[0].correlation_id, id);
    Ok(())
}

#[actix::test]
async fn one_failed_mix_fails_a_unanimous_session() -> Result<()> {
    let mut cluster = Cluster::start(config(None))?;
    let (ee, bb) = ballot_box();
    let id = CorrelationId::new("f65f");
    cluster.register(&id, SessionScope::BallotBox(ee, bb))?;

    for node in &CCMS[..3] {
        mix(cluster.tracker(), node, MixDecStatus::Mixed)?;
    }
    mix(cluster.tracker(), CCMS[3], MixDecStatus::Error)?;

    for node in CCMS {
        cluster
            .deliver(BroadcastAggregatorMessage::new(id.clone(), vec![1u8]), node)
            .await?;
    }

    let outcome = cluster
        .aggregator
        .await_outcome(&id, Duration::from_secs(1))
        .await?;
    assert!(matches!(outcome, Outcome::Failed(_)), "{outcome:?}");

    let snapshot = cluster.aggregator.status(&id).ok_or_else(|| anyhow::anyhow!("no session"))?;
    assert_eq!(snapshot.responded, 4);
    assert_eq!(snapshot.usable, 3);
    assert_eq!(cluster.drain().len(), 1);
    Ok(())
}

#[actix::test]
async fn threshold_quorum_tolerates_a_silent_node() -> Result<()> {
    let mut cluster = Cluster::start(config(Some(3)))?;
    let id = CorrelationId::new("c-threshold");
    cluster.register(&id, SessionScope::Open)?;

    for node in &CCMS[..2] {
        cluster
            .deliver(BroadcastAggregatorMessage::new(id.clone(), vec![7u8]), node)
            .await?;
    }
    assert!(cluster.drain().is_empty());

    cluster
        .deliver(BroadcastAggregatorMessage::new(id.clone(), vec![7u8]), CCMS[2])
        .await?;
    let released = cluster.drain();
    assert_eq!(released.len(), 1);
    assert!(matches!(&released[0].outcome, Outcome::Complete(p) if p.len() == 3));

    // the straggler is recorded but releases nothing
    let late = cluster
        .deliver(BroadcastAggregatorMessage::new(id.clone(), vec![7u8]), CCMS[3])
        .await?;
    assert_eq!(late, Delivery::Late);
    assert!(cluster.drain().is_empty());
    Ok(())
}

#[actix::test]
async fn ballot_box_quorum_completes_on_the_third_mixed_node() -> Result<()> {
    let mut cluster = Cluster::start(config(Some(3)))?;
    let (ee, bb) = ballot_box();
    let id = CorrelationId::new("c-bb-quorum");
    cluster.register(&id, SessionScope::BallotBox(ee, bb))?;

    // ccm-3 fails its shuffle between the two first mixed nodes
    for (node, status) in [
        (CCMS[0], MixDecStatus::Mixed),
        (CCMS[2], MixDecStatus::Error),
        (CCMS[1], MixDecStatus::Mixed),
    ] {
        mix(cluster.tracker(), node, status)?;
        let message = BroadcastAggregatorMessage::new(id.clone(), node.as_bytes().to_vec());
        assert_eq!(cluster.deliver(message, node).await?, Delivery::Accepted);
    }

    let snapshot = cluster.aggregator.status(&id).ok_or_else(|| anyhow::anyhow!("no session"))?;
    assert_eq!(snapshot.outcome, Outcome::Pending);
    assert_eq!(snapshot.responded, 3);
    assert_eq!(snapshot.usable, 2);
    assert!(cluster.drain().is_empty());

    mix(cluster.tracker(), CCMS[3], MixDecStatus::Mixed)?;
    let last = BroadcastAggregatorMessage::new(id.clone(), CCMS[3].as_bytes().to_vec());
    assert_eq!(cluster.deliver(last.clone(), CCMS[3]).await?, Delivery::Accepted);

    let released = cluster.drain();
    assert_eq!(released.len(), 1);
    let Outcome::Complete(payloads) = &released[0].outcome else {
        anyhow::bail!("expected completion, got {:?}", released[0].outcome);
    };
    let senders: Vec<&str> = payloads.keys().map(|n| n.as_str()).collect();
    assert_eq!(senders, vec!["ccm-1", "ccm-2", "ccm-4"]);

    // a redelivery after completion releases nothing more
    assert_eq!(cluster.deliver(last, CCMS[3]).await?, Delivery::Duplicate);
    assert!(cluster.drain().is_empty());
    Ok(())
}

#[actix::test]
async fn sweeper_resolves_abandoned_sessions() -> Result<()> {
    let mut config = config(None);
    config.aggregation.grace_period_secs = 0;
    let mut cluster = Cluster::start(config)?;
    let id = CorrelationId::new("c-abandoned");
    cluster.aggregator.register(Registration::new(
        id.clone(),
        cluster.config.participants(),
        Instant::now() + Duration::from_millis(50),
    ))?;
    cluster
        .deliver(BroadcastAggregatorMessage::new(id.clone(), vec![1u8]), CCMS[0])
        .await?;
    tokio::time::sleep(Duration::from_millis(80)).await;

    let sweeper = SessionSweeper::setup(cluster.aggregator.clone(), Duration::from_secs(3600));
    let first = sweeper.send(Sweep).await?;
    assert_eq!(first.resolved, vec![id.clone()]);
    assert_eq!(first.timed_out, vec![id.clone()]);

    let released = cluster.drain();
    let Outcome::TimedOut { missing } = &released[0].outcome else {
        anyhow::bail!("expected a timeout, got {:?}", released[0].outcome);
    };
    assert_eq!(missing.len(), 3);
    assert!(!missing.contains(&NodeId::new(CCMS[0])));

    let second = sweeper.send(Sweep).await?;
    assert_eq!(second.purged, vec![id.clone()]);
    assert!(cluster.aggregator.status(&id).is_none());

    // purged ids are unknown again and their messages are dropped
    let stale = cluster
        .deliver(BroadcastAggregatorMessage::new(id, vec![1u8]), CCMS[1])
        .await?;
    assert_eq!(stale, Delivery::UnknownCorrelation);
    Ok(())
}
