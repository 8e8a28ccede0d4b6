// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use std::{
    env,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use path_clean::clean;
use tracing::{debug, info};

use crate::NodeConfig;

pub const DEFAULT_CONFIG_NAME: &str = "ccm.config.yaml";
pub const ENV_PREFIX: &str = "CCM_";

pub type FindInParent = fn(&Path, &str) -> Option<PathBuf>;

pub fn find_in_parent(path: &Path, filename: &str) -> Option<PathBuf> {
    let mut current = path.to_path_buf();

    loop {
        let file_path = current.join(filename);
        if file_path.exists() {
            return Some(file_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

pub fn resolve_config_path(
    find_in_parent: FindInParent,
    cwd: &Path,
    default_config_dir: &Path,
    default_filename: &str,
    cli_file: Option<&Path>,
) -> PathBuf {
    if let Some(cli_file) = cli_file {
        if cli_file.is_absolute() {
            return cli_file.to_path_buf();
        }
        return clean(cwd.join(cli_file));
    }

    if let Some(found) = find_in_parent(cwd, default_filename) {
        return found;
    }

    clean(default_config_dir.join(default_filename))
}

pub struct OsDirs;

impl OsDirs {
    /// Platform config directory, or the working directory on platforms without one.
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ccm")
    }
}

/// Layer defaults, the YAML file at `path` (when it exists) and `CCM_` variables.
pub fn figment_for(path: &Path) -> Figment {
    let mut figment = Figment::from(Serialized::defaults(NodeConfig::default()));
    if path.exists() {
        figment = figment.merge(Yaml::file(path));
    }
    figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
}

/// Load and validate the node configuration.
///
/// An explicit `cli_file` must exist. Otherwise `ccm.config.yaml` is searched from the working
/// directory upwards and then in the platform config directory; if none is found the defaults
/// and environment apply.
pub fn load_config(cli_file: Option<PathBuf>) -> Result<NodeConfig> {
    let cwd = env::current_dir().context("Could not read the working directory")?;
    let path = resolve_config_path(
        find_in_parent,
        &cwd,
        &OsDirs::config_dir(),
        DEFAULT_CONFIG_NAME,
        cli_file.as_deref(),
    );

    if cli_file.is_some() && !path.exists() {
        bail!("Configuration file not found: {}", path.display());
    }
    if path.exists() {
        info!(path = %path.display(), "loading configuration");
    } else {
        debug!(path = %path.display(), "no configuration file, using defaults");
    }

    let config: NodeConfig = figment_for(&path)
        .extract()
        .context("Could not parse configuration")?;
    config
        .validate()
        .with_context(|| format!("Invalid configuration in {}", path.display()))?;
    Ok(config)
}
