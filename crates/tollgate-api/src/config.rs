//! Service configuration

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tollgate_core::{SubscriberId, TierId};
use tollgate_engine::FailurePolicy;

/// Service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Bind address
    pub listen_addr: String,
    /// Tier policy TOML file
    pub policy_path: PathBuf,
    /// Usage snapshot file; omit for in-memory counters only
    pub snapshot_path: Option<PathBuf>,
    /// Seconds between snapshot flushes
    pub snapshot_flush_secs: u64,
    /// What to do when counter storage fails during admission
    pub failure_policy: FailurePolicy,
    /// Weekly window anchor override
    pub weekly_anchor: Option<DateTime<Utc>>,
    /// Subscribers seeded into the static directory
    pub subscribers: Vec<SubscriberSeed>,
}

/// One seeded subscriber
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriberSeed {
    /// Subscriber id
    pub id: SubscriberId,
    /// Subscription tier
    pub tier: TierId,
    /// Account-creation instant (anchors the lifetime window)
    pub created_at: DateTime<Utc>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".into(),
            policy_path: "config/policy.toml".into(),
            snapshot_path: Some("data/usage.json".into()),
            snapshot_flush_secs: 30,
            failure_policy: FailurePolicy::FailClosed,
            weekly_anchor: None,
            subscribers: Vec::new(),
        }
    }
}

impl ServiceConfig {
    /// Load from file
    pub fn load(path: &str) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// Save to file
    pub fn save(&self, path: &str) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }
}
