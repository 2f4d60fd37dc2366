/*
 * Copyright (c) 2024. Govcraft
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */
use std::time::Duration;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use elastic_core::common::ElasticError;

/// Configuration for an Elastic runtime node.
///
/// Loaded from TOML in XDG-compliant directories. Every section falls back to its
/// defaults when absent, so a partial file only overrides what it names.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ElasticConfig {
    /// Cluster and node identity
    pub cluster: ClusterConfig,
    /// Locally hosted actor systems
    pub actor_systems: Vec<ActorSystemConfig>,
    /// Actor systems in other clusters this node may address
    pub remote_actor_systems: Vec<RemoteActorSystemConfig>,
    /// Scheduled-message loading
    pub scheduler: SchedulerConfig,
    /// Timeouts
    pub timeouts: TimeoutConfig,
}

/// Identity of this node within its cluster.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Name of the cluster this node belongs to
    pub cluster_name: String,
    /// Identifier of this node
    pub node_id: String,
}

/// A locally hosted actor system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorSystemConfig {
    pub name: String,
    /// Number of shards; fixed for the lifetime of persisted data
    pub shards: u32,
}

/// An actor system hosted by another cluster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteActorSystemConfig {
    pub cluster_name: String,
    pub name: String,
    pub shards: u32,
}

/// Controls how scheduled messages are admitted into memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Messages due within this window of now are armed as timers
    pub load_window_ms: u64,
    /// Page size when reading scheduled messages from the repository
    pub load_batch_size: usize,
    /// How often each shard's window advances
    pub refill_interval_ms: u64,
}

/// Timeout-related configuration values
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Upper bound for draining actors on shutdown, in milliseconds
    pub system_shutdown_ms: u64,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            cluster_name: "elasticactors".to_string(),
            node_id: "node-1".to_string(),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            load_window_ms: 3_600_000,
            load_batch_size: 1_000,
            refill_interval_ms: 60_000,
        }
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            system_shutdown_ms: 10_000,
        }
    }
}

impl SchedulerConfig {
    pub const fn load_window(&self) -> Duration {
        Duration::from_millis(self.load_window_ms)
    }

    pub const fn refill_interval(&self) -> Duration {
        Duration::from_millis(self.refill_interval_ms)
    }
}

impl ElasticConfig {
    /// Convert system shutdown timeout to Duration
    pub const fn system_shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.system_shutdown_ms)
    }

    /// Configured actor systems, or a single `default` system with 8 shards when
    /// none are configured.
    pub fn actor_systems(&self) -> Vec<ActorSystemConfig> {
        if self.actor_systems.is_empty() {
            vec![ActorSystemConfig {
                name: "default".to_string(),
                shards: 8,
            }]
        } else {
            self.actor_systems.clone()
        }
    }

    /// Looks up a remote actor system by cluster and name.
    pub fn remote_actor_system(&self, cluster_name: &str, name: &str) -> Option<&RemoteActorSystemConfig> {
        self.remote_actor_systems
            .iter()
            .find(|r| r.cluster_name == cluster_name && r.name == name)
    }

    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ElasticError::IllegalState`] when the text is not valid TOML for
    /// this schema or names a system with zero shards.
    pub fn from_toml_str(text: &str) -> Result<Self, ElasticError> {
        let config: Self = toml::from_str(text).map_err(|e| ElasticError::IllegalState(format!("invalid configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns [`ElasticError::IllegalState`] for zero shard counts and duplicate
    /// system names.
    pub fn validate(&self) -> Result<(), ElasticError> {
        let systems = self.actor_systems();
        for (i, system) in systems.iter().enumerate() {
            if system.shards == 0 {
                return Err(ElasticError::IllegalState(format!("actor system {} has no shards", system.name)));
            }
            if systems[..i].iter().any(|s| s.name == system.name) {
                return Err(ElasticError::IllegalState(format!("actor system {} is configured twice", system.name)));
            }
        }
        if let Some(remote) = self.remote_actor_systems.iter().find(|r| r.shards == 0) {
            return Err(ElasticError::IllegalState(format!(
                "remote actor system {}/{} has no shards",
                remote.cluster_name, remote.name
            )));
        }
        Ok(())
    }

    /// Load configuration from XDG-compliant locations
    ///
    /// Looks for `elastic-actors/config.toml` under the XDG config directories
    /// (`$XDG_CONFIG_HOME`, then `~/.config`). If no file is found, returns the
    /// default configuration. If a file exists but is malformed, logs an error and
    /// uses defaults.
    pub fn load() -> Self {
        let xdg_dirs = match xdg::BaseDirectories::with_prefix("elastic-actors") {
            Ok(dirs) => dirs,
            Err(e) => {
                error!("Failed to initialize XDG directories: {}", e);
                return Self::default();
            }
        };

        let Some(path) = xdg_dirs.find_config_file("config.toml") else {
            info!("No configuration file found, using defaults");
            return Self::default();
        };

        info!("Loading configuration from: {}", path.display());
        match std::fs::read_to_string(&path) {
            Ok(text) => match Self::from_toml_str(&text) {
                Ok(config) => {
                    info!("Successfully loaded configuration");
                    config
                }
                Err(e) => {
                    error!("Failed to parse configuration file {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                error!("Failed to read configuration file {}: {}", path.display(), e);
                Self::default()
            }
        }
    }
}

lazy_static! {
    /// Global configuration instance loaded from XDG-compliant locations
    pub static ref CONFIG: ElasticConfig = ElasticConfig::load();
}
