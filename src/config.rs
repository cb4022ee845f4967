// src/config.rs

//! Loads and validates the recovery controller's configuration: the local
//! daemon socket, this node's identity, and the control loop's pacing.
//! TOML via `serde`, through a raw pre-validation struct, with
//! `anyhow::Context` for file/parse errors.

use crate::recovery::RecoveryRole;
use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;
use tracing::warn;

fn default_socket_path() -> String {
    "/var/run/ctdbrec/ctdbd.sock".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_tick_interval() -> Duration {
    Duration::from_secs(1)
}
fn default_rpc_deadline() -> Duration {
    Duration::from_secs(2)
}
fn default_role() -> RecoveryRoleConfig {
    RecoveryRoleConfig::SoleRecoverer
}

/// The serializable mirror of [`RecoveryRole`] (which is not itself
/// `Serialize`/`Deserialize`, living in the `recovery` module rather than
/// the wire/config boundary).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecoveryRoleConfig {
    SoleRecoverer,
    TrustExternalElection,
}

impl From<RecoveryRoleConfig> for RecoveryRole {
    fn from(cfg: RecoveryRoleConfig) -> Self {
        match cfg {
            RecoveryRoleConfig::SoleRecoverer => RecoveryRole::SoleRecoverer,
            RecoveryRoleConfig::TrustExternalElection => RecoveryRole::TrustExternalElection,
        }
    }
}

/// A raw representation of the config file before validation.
#[derive(Deserialize)]
struct RawConfig {
    local_nid: u32,
    #[serde(default = "default_socket_path")]
    socket: String,
    #[serde(default = "default_log_level")]
    log_level: String,
    #[serde(default = "default_tick_interval", with = "humantime_serde")]
    tick_interval: Duration,
    #[serde(default = "default_rpc_deadline", with = "humantime_serde")]
    rpc_deadline: Duration,
    #[serde(default = "default_role")]
    role: RecoveryRoleConfig,
}

/// The final, validated configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub local_nid: u32,
    pub socket: String,
    pub log_level: String,
    pub tick_interval: Duration,
    pub rpc_deadline: Duration,
    pub role: RecoveryRole,
}

impl Config {
    /// Reads and validates a TOML config file.
    pub fn from_file(path: &str) -> Result<Self> {
        let contents =
            fs::read_to_string(path).with_context(|| format!("failed to read config file at '{path}'"))?;
        let raw: RawConfig =
            toml::from_str(&contents).with_context(|| format!("failed to parse TOML from '{path}'"))?;

        let config = Config {
            local_nid: raw.local_nid,
            socket: raw.socket,
            log_level: raw.log_level,
            tick_interval: raw.tick_interval,
            rpc_deadline: raw.rpc_deadline,
            role: raw.role.into(),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.socket.trim().is_empty() {
            return Err(anyhow!("socket path cannot be empty"));
        }
        if self.tick_interval.is_zero() {
            return Err(anyhow!("tick_interval cannot be zero"));
        }
        if self.rpc_deadline.is_zero() {
            return Err(anyhow!("rpc_deadline cannot be zero"));
        }
        if self.tick_interval < self.rpc_deadline {
            warn!(
                "tick_interval ({:?}) is shorter than rpc_deadline ({:?}); ticks may overlap under load",
                self.tick_interval, self.rpc_deadline
            );
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            local_nid: 0,
            socket: default_socket_path(),
            log_level: default_log_level(),
            tick_interval: Duration::from_secs(1),
            rpc_deadline: default_rpc_deadline(),
            role: RecoveryRole::SoleRecoverer,
        }
    }
}
