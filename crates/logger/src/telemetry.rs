// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use anyhow::{Context, Result};
use ccm_config::LogConfig;
use tracing::{debug, Level};
use tracing_subscriber::{
    filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

/// Install a fmt subscriber at a fixed level. A second call is a no-op.
pub fn setup_simple_tracing(log_level: Level) {
    let installed = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(LevelFilter::from_level(log_level))
        .try_init();
    if installed.is_err() {
        debug!("tracing subscriber already installed");
    }
}

/// Build the filter for `config`: its level as default plus any extra directives.
pub fn log_filter(config: &LogConfig) -> Result<EnvFilter> {
    let level: Level = config
        .level
        .parse()
        .with_context(|| format!("Unknown log level '{}'", config.level))?;
    EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .parse(config.directives.as_deref().unwrap_or_default())
        .with_context(|| format!("Invalid log directives {:?}", config.directives))
}

pub fn setup_tracing(config: &LogConfig) -> Result<()> {
    let filter = log_filter(config)?;
    let installed = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(filter)
        .try_init();
    if installed.is_err() {
        debug!("tracing subscriber already installed");
    }
    Ok(())
}
