pub mod queue;
pub mod reconciler;
pub mod remote;

pub use queue::{LinearBackoff, QueueConfig, RequestQueue};
pub use reconciler::{PullOutcome, SyncReconciler};
pub use remote::{HttpRemoteStore, Mutation, RemoteStore, RosterSnapshot};

use serde::{Deserialize, Serialize};

use crate::env::RemoteSettings;

/// Host-editable sync settings, persisted alongside the game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncConfig {
    pub endpoint: Option<String>,
    pub auto_sync: bool,
    pub poll_interval_seconds: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            endpoint: None,
            auto_sync: false,
            poll_interval_seconds: 30,
        }
    }
}

impl From<&RemoteSettings> for SyncConfig {
    fn from(settings: &RemoteSettings) -> Self {
        SyncConfig {
            endpoint: settings.endpoint.clone().filter(|e| !e.trim().is_empty()),
            auto_sync: settings.auto_sync,
            poll_interval_seconds: settings.poll_interval_seconds.max(1),
        }
    }
}

impl SyncConfig {
    pub fn is_configured(&self) -> bool {
        self.endpoint.is_some()
    }
}
