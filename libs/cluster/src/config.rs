//! Cluster configuration.
//!
//! ```toml
//! [cluster]
//! channel_prefix = "hub"           # isolates clusters sharing one backplane
//! ack_timeout_ms = 30000           # bound on synchronous group operations
//! max_message_size = 16777216      # serialized hub-message size limit
//! server_name = "edge-1"           # optional; random suffix appended anyway
//! ```

use crate::channels::ChannelNames;
use crate::error::{ClusterError, ClusterResult};
use rand::Rng;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Prefix for every backplane channel name.
    pub channel_prefix: String,

    /// How long a remote group-membership operation waits for its ack.
    pub ack_timeout_ms: u64,

    /// Largest serialized hub message accepted for send or relay.
    pub max_message_size: usize,

    /// Human-readable server name; the generated server id starts with it.
    pub server_name: Option<String>,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            channel_prefix: default_channel_prefix(),
            ack_timeout_ms: default_ack_timeout_ms(),
            max_message_size: default_max_message_size(),
            server_name: None,
        }
    }
}

fn default_channel_prefix() -> String {
    "hub".to_string()
}

fn default_ack_timeout_ms() -> u64 {
    30_000
}

fn default_max_message_size() -> usize {
    16 * 1024 * 1024
}

#[derive(Debug, Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    cluster: ClusterConfig,
}

impl ClusterConfig {
    pub fn from_toml_str(input: &str) -> ClusterResult<Self> {
        let file: ConfigFile = toml::from_str(input)
            .map_err(|e| ClusterError::envelope(format!("invalid cluster config: {}", e)))?;
        Ok(file.cluster)
    }

    pub fn ack_timeout(&self) -> Duration {
        Duration::from_millis(self.ack_timeout_ms)
    }

    pub fn channel_names(&self) -> ChannelNames {
        ChannelNames::new(self.channel_prefix.clone())
    }

    /// Mint this process's server id: cluster-unique, stable for the
    /// process lifetime.
    pub fn generate_server_id(&self) -> String {
        let suffix: u64 = rand::thread_rng().gen();
        match &self.server_name {
            Some(name) => format!("{}-{:016x}", name, suffix),
            None => format!("srv-{:016x}", suffix),
        }
    }
}
