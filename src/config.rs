// SPDX-License-Identifier: MIT

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Environment variable overriding the config file location.
const CONFIG_ENV: &str = "CONFIG";
/// Fallback locations, probed in order.
const CONFIG_PATHS: [&str; 2] = ["config.toml", "config/config.toml"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(
        "no config file found: set $CONFIG or provide ./config.toml or \
        ./config/config.toml"
    )]
    NotFound,

    #[error("could not read configuration {path:?}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("could not parse configuration {path:?}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Per-device reflection policy: the VLAN a device lives on and the
/// VLANs its advertisements and responses are replicated into.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize)]
pub struct MulticastDevice {
    pub origin_pool: u16,
    #[serde(default)]
    pub shared_pools: Vec<u16>,
}

#[derive(Debug, PartialEq, Eq, Clone, Deserialize)]
pub struct VlanIpSource {
    pub ip_source: Ipv4Addr,
}

#[derive(Debug, PartialEq, Eq, Clone, Deserialize)]
pub struct Config {
    pub net_interface: String,
    /// Keyed by device MAC address; case-insensitive on lookup.
    #[serde(default)]
    pub devices: HashMap<String, MulticastDevice>,
    /// Keyed by decimal VLAN id.
    #[serde(default, rename = "vlan")]
    pub vlan_ip_source: HashMap<String, VlanIpSource>,
}

/// Probes `$CONFIG`, then `./config.toml`, then `./config/config.toml`.
pub fn find_config_file() -> Result<PathBuf, ConfigError> {
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        let path = PathBuf::from(path);
        if path.is_file() {
            return Ok(path);
        }
    }
    for candidate in CONFIG_PATHS {
        let path = PathBuf::from(candidate);
        if path.is_file() {
            return Ok(path);
        }
    }
    Err(ConfigError::NotFound)
}

pub fn read_config(path: &Path) -> Result<Config, ConfigError> {
    let content =
        std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
