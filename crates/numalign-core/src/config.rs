//! Configuration for the topology coordinator.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for a [`Coordinator`](crate::coordinator::Coordinator).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Admission policy name: `"preferred"` or `"strict"`.
    ///
    /// Unknown names fall back to `"preferred"` with a warning.
    pub topology_policy: String,
    /// Upper bound on a single provider call during admission.
    pub provider_timeout: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            topology_policy: "preferred".to_string(),
            provider_timeout: Duration::from_secs(2),
        }
    }
}
