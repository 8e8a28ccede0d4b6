// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use std::{sync::Arc, time::Duration};

use actix::{Actor, Addr, AsyncContext, Context, Handler, Message, SpawnHandle};
use ccm_events::{BroadcastAggregatorMessage, NodeId};
use ccm_utils::MAILBOX_LIMIT;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::{Delivery, ResponseAggregator, SweepReport};

pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(30);

/// A broker message together with the authenticated identity of its sender.
#[derive(Message, Clone, Debug)]
#[rtype(result = "Delivery")]
pub struct Inbound {
    pub message: BroadcastAggregatorMessage,
    pub sender: NodeId,
}

/// Feeds broker deliveries into the aggregator.
pub struct InboundConsumer {
    aggregator: Arc<ResponseAggregator>,
}

impl InboundConsumer {
    pub fn setup(aggregator: Arc<ResponseAggregator>) -> Addr<Self> {
        Self { aggregator }.start()
    }
}

impl Actor for InboundConsumer {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        ctx.set_mailbox_capacity(MAILBOX_LIMIT);
    }
}

impl Handler<Inbound> for InboundConsumer {
    type Result = Delivery;

    fn handle(&mut self, msg: Inbound, _: &mut Self::Context) -> Self::Result {
        self.aggregator.on_message(msg.message, &msg.sender)
    }
}

/// Run a sweep now instead of waiting for the next tick.
#[derive(Message, Clone, Debug)]
#[rtype(result = "SweepReport")]
pub struct Sweep;

/// Periodically times out expired sessions and purges resolved ones.
pub struct SessionSweeper {
    aggregator: Arc<ResponseAggregator>,
    interval: Duration,
    handle: Option<SpawnHandle>,
}

impl SessionSweeper {
    pub fn setup(aggregator: Arc<ResponseAggregator>, interval: Duration) -> Addr<Self> {
        Self {
            aggregator,
            interval,
            handle: None,
        }
        .start()
    }

    fn sweep(&self) -> SweepReport {
        let report = self.aggregator.sweep(Instant::now());
        if !report.resolved.is_empty() || !report.purged.is_empty() {
            debug!(
                resolved = report.resolved.len(),
                purged = report.purged.len(),
                "sweep finished"
            );
        }
        report
    }
}

impl Actor for SessionSweeper {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        info!(interval = ?self.interval, "session sweeper started");
        let handle = ctx.run_interval(self.interval, |act, _| {
            act.sweep();
        });
        self.handle = Some(handle);
    }

    fn stopped(&mut self, _: &mut Self::Context) {
        info!("session sweeper stopped");
    }
}

impl Handler<Sweep> for SessionSweeper {
    type Result = SweepReport;

    fn handle(&mut self, _: Sweep, _: &mut Self::Context) -> Self::Result {
        self.sweep()
    }
}
