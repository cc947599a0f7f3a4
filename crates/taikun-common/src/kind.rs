//! Resource kinds the orchestrator knows how to wait on

use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of remote resource whose convergence can be awaited
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResourceKind {
    /// Kubernetes project (a managed cluster)
    Project,
    /// Virtual cluster hosted inside a parent project
    VirtualCluster,
    /// Catalog application installed into a project
    Application,
    /// Server attached to a project (verify-after-add only)
    Server,
}

impl ResourceKind {
    /// All kinds, in table order
    pub const ALL: [ResourceKind; 4] = [
        ResourceKind::Project,
        ResourceKind::VirtualCluster,
        ResourceKind::Application,
        ResourceKind::Server,
    ];

    /// Human-readable name used in log lines and messages
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Project => "project",
            ResourceKind::VirtualCluster => "virtual cluster",
            ResourceKind::Application => "application",
            ResourceKind::Server => "server",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
