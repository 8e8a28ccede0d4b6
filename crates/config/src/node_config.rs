// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use std::{path::PathBuf, time::Duration};

use anyhow::{bail, Result};
use ccm_aggregator::QuorumPolicy;
use ccm_events::NodeId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct KeygenConfig {
    /// Number of write-in slots a ballot may carry. The key width is this plus one.
    pub max_write_in_options: usize,
}

impl Default for KeygenConfig {
    fn default() -> Self {
        Self {
            max_write_in_options: 0,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct AggregationConfig {
    /// Usable contributions needed to complete a session. Unset means every participant.
    pub quorum: Option<usize>,
    pub session_deadline_secs: u64,
    pub grace_period_secs: u64,
    pub sweep_interval_secs: u64,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            quorum: None,
            session_deadline_secs: 600,
            grace_period_secs: 300,
            sweep_interval_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct SharesConfig {
    pub parts: u32,
    pub threshold: u32,
}

impl Default for SharesConfig {
    fn default() -> Self {
        Self {
            parts: 5,
            threshold: 3,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct TokenConfig {
    /// Mount point of the directory backed tokens. `~` and `$VARS` are expanded.
    pub dir: String,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            dir: "~/.local/share/ccm/tokens".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    pub level: String,
    /// Extra `EnvFilter` directives, eg. `ccm_aggregator=debug`.
    pub directives: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directives: None,
        }
    }
}

/// Settings of a single control component.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct NodeConfig {
    pub node_id: String,
    /// Nodes expected to answer every aggregation round, this node included.
    pub participants: Vec<String>,
    pub keygen: KeygenConfig,
    pub aggregation: AggregationConfig,
    pub shares: SharesConfig,
    pub token: TokenConfig,
    pub log: LogConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            node_id: "ccm-1".to_string(),
            participants: vec!["ccm-1".to_string()],
            keygen: KeygenConfig::default(),
            aggregation: AggregationConfig::default(),
            shares: SharesConfig::default(),
            token: TokenConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl NodeConfig {
    pub fn validate(&self) -> Result<()> {
        if self.participants.is_empty() {
            bail!("participants must not be empty");
        }
        if !self.participants.contains(&self.node_id) {
            bail!(
                "node_id '{}' is not one of the participants {:?}",
                self.node_id,
                self.participants
            );
        }
        if let Some(quorum) = self.aggregation.quorum {
            if quorum == 0 || quorum > self.participants.len() {
                bail!(
                    "aggregation.quorum must be between 1 and {} but was {}",
                    self.participants.len(),
                    quorum
                );
            }
        }
        if self.shares.threshold == 0 || self.shares.threshold > self.shares.parts {
            bail!(
                "shares.threshold must be between 1 and {} but was {}",
                self.shares.parts,
                self.shares.threshold
            );
        }
        if self.aggregation.sweep_interval_secs == 0 {
            bail!("aggregation.sweep_interval_secs must be positive");
        }
        Ok(())
    }

    pub fn node_id(&self) -> NodeId {
        NodeId::new(self.node_id.clone())
    }

    pub fn participants(&self) -> Vec<NodeId> {
        self.participants.iter().cloned().map(NodeId::new).collect()
    }

    /// Width of the generated ElGamal keys.
    pub fn mu(&self) -> usize {
        self.keygen.max_write_in_options + 1
    }

    pub fn quorum(&self) -> QuorumPolicy {
        match self.aggregation.quorum {
            Some(n) => QuorumPolicy::Threshold(n),
            None => QuorumPolicy::Unanimous,
        }
    }

    pub fn session_deadline(&self) -> Duration {
        Duration::from_secs(self.aggregation.session_deadline_secs)
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.aggregation.grace_period_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.aggregation.sweep_interval_secs)
    }

    pub fn token_dir(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.token.dir).into_owned())
    }

    pub fn log(&self) -> &LogConfig {
        &self.log
    }
}
