// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use std::marker::PhantomData;

use actix::{Actor, Addr, Context, Handler, Message};
use ccm_aggregator::{Outcome, SessionResolved};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

pub trait EventLogging: Message<Result = ()> + Unpin + Send + 'static {
    fn log(&self, logger_name: &str);
}

/// Logs every event it receives under a node name.
pub struct SimpleLogger<E: EventLogging> {
    name: String,
    _p: PhantomData<E>,
}

impl<E: EventLogging> SimpleLogger<E> {
    pub fn start_named(name: &str) -> Addr<Self> {
        Self {
            name: name.to_owned(),
            _p: PhantomData,
        }
        .start()
    }

    /// Start a logger draining `events` until the sending side is dropped.
    pub fn attach(name: &str, mut events: mpsc::UnboundedReceiver<E>) -> Addr<Self> {
        let addr = Self::start_named(name);
        let forward = addr.clone();
        actix::spawn(async move {
            while let Some(event) = events.recv().await {
                if forward.send(event).await.is_err() {
                    break;
                }
            }
        });
        info!(node = %name, "READY!");
        addr
    }
}

impl<E: EventLogging> Actor for SimpleLogger<E> {
    type Context = Context<Self>;
}

impl<E: EventLogging> Handler<E> for SimpleLogger<E> {
    type Result = ();

    fn handle(&mut self, msg: E, _: &mut Self::Context) -> Self::Result {
        msg.log(&self.name);
    }
}

impl EventLogging for SessionResolved {
    fn log(&self, logger_name: &str) {
        let id = &self.correlation_id;
        match &self.outcome {
            Outcome::Complete(payloads) => {
                info!(me = logger_name, correlation_id = %id, contributions = payloads.len(), "Session complete")
            }
            Outcome::TimedOut { missing } => {
                let missing: Vec<&str> = missing.iter().map(|n| n.as_str()).collect();
                warn!(me = logger_name, correlation_id = %id, missing = ?missing, "Session timed out")
            }
            Outcome::Failed(reason) => {
                error!(me = logger_name, correlation_id = %id, reason = %reason, "Session failed")
            }
            Outcome::Pending => {}
        }
    }
}
