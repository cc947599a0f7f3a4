//! Orchestrator configuration stored at `~/.taikun/config.json`.
//!
//! The file is optional. When present it can override the API host and the
//! per-kind wait defaults:
//!
//! ```json
//! {
//!   "apiHost": "api.taikun.example",
//!   "waits": {
//!     "project": { "intervalSecs": 15, "readyTimeoutSecs": 1200 },
//!     "application": { "readyTimeoutSecs": 600 }
//!   }
//! }
//! ```
//!
//! Path resolution (highest priority first):
//! 1. Explicit path passed by the caller
//! 2. `TAIKUN_CONFIG` environment variable
//! 3. `~/.taikun/config.json`

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::defaults::DefaultsTable;
use crate::kind::ResourceKind;
use crate::{Error, Result};

const CONFIG_DIR_NAME: &str = ".taikun";
const CONFIG_FILE_NAME: &str = "config.json";
const TAIKUN_CONFIG_ENV: &str = "TAIKUN_CONFIG";

/// API host used when neither flag, environment nor config file names one
pub const DEFAULT_API_HOST: &str = "api.taikun.cloud";

/// Persistent orchestrator configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct OrchestratorConfig {
    /// Control-plane host (without scheme) or full base URL
    pub api_host: Option<String>,
    /// Per-kind wait default overrides
    #[serde(default)]
    pub waits: WaitOverrides,
}

/// Optional overrides, one entry per resource kind
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct WaitOverrides {
    /// Project overrides
    pub project: Option<KindOverride>,
    /// Virtual cluster overrides
    pub virtual_cluster: Option<KindOverride>,
    /// Application overrides
    pub application: Option<KindOverride>,
    /// Server verification overrides
    pub server: Option<KindOverride>,
}

/// Interval/timeout overrides for one kind, in seconds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct KindOverride {
    /// Delay between probes
    pub interval_secs: Option<u64>,
    /// Deadline when waiting for the ready state
    pub ready_timeout_secs: Option<u64>,
    /// Deadline when waiting for deletion
    pub deleted_timeout_secs: Option<u64>,
}

impl WaitOverrides {
    fn get(&self, kind: ResourceKind) -> Option<&KindOverride> {
        match kind {
            ResourceKind::Project => self.project.as_ref(),
            ResourceKind::VirtualCluster => self.virtual_cluster.as_ref(),
            ResourceKind::Application => self.application.as_ref(),
            ResourceKind::Server => self.server.as_ref(),
        }
    }
}

impl OrchestratorConfig {
    /// Built-in defaults with this file's overrides applied.
    ///
    /// Zero values are rejected so a typo cannot turn a wait into a busy loop.
    pub fn defaults_table(&self) -> Result<DefaultsTable> {
        let mut table = DefaultsTable::default();
        for kind in ResourceKind::ALL {
            let Some(over) = self.waits.get(kind) else {
                continue;
            };
            let entry = table.get_mut(kind);
            if let Some(secs) = over.interval_secs {
                entry.interval = positive_secs(kind, "intervalSecs", secs)?;
            }
            if let Some(secs) = over.ready_timeout_secs {
                entry.ready_timeout = positive_secs(kind, "readyTimeoutSecs", secs)?;
            }
            if let Some(secs) = over.deleted_timeout_secs {
                entry.deleted_timeout = Some(positive_secs(kind, "deletedTimeoutSecs", secs)?);
            }
        }
        Ok(table)
    }

    /// API host from the file, or the built-in default
    pub fn api_host(&self) -> &str {
        self.api_host.as_deref().unwrap_or(DEFAULT_API_HOST)
    }
}

fn positive_secs(kind: ResourceKind, field: &str, secs: u64) -> Result<Duration> {
    if secs == 0 {
        return Err(Error::config(format!(
            "waits.{}.{} must be greater than zero",
            kind, field
        )));
    }
    Ok(Duration::from_secs(secs))
}

/// Resolve the config path using the priority chain.
///
/// Returns `None` when no home directory can be determined and nothing
/// explicit was given.
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(TAIKUN_CONFIG_ENV) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    dirs::home_dir().map(|home| home.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Load config from `path`, returning defaults if the file is missing.
pub fn load_config_from(path: &Path) -> Result<OrchestratorConfig> {
    if !path.exists() {
        return Ok(OrchestratorConfig::default());
    }
    let data = std::fs::read_to_string(path)
        .map_err(|e| Error::config(format!("failed to read {}: {}", path.display(), e)))?;
    serde_json::from_str(&data)
        .map_err(|e| Error::config(format!("failed to parse {}: {}", path.display(), e)))
}

/// Load config using the resolution chain.
pub fn load_config(explicit: Option<&Path>) -> Result<OrchestratorConfig> {
    match resolve_config_path(explicit) {
        Some(path) => load_config_from(&path),
        None => Ok(OrchestratorConfig::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::{APPLICATION_DEFAULTS, PROJECT_DEFAULTS};

    #[test]
    fn config_parses_overrides() {
        let json = r#"{
            "apiHost": "api.example.test",
            "waits": {
                "project": { "intervalSecs": 15, "readyTimeoutSecs": 1200 },
                "application": { "deletedTimeoutSecs": 90 }
            }
        }"#;
        let config: OrchestratorConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.api_host(), "api.example.test");

        let table = config.defaults_table().unwrap();
        assert_eq!(table.project.interval, Duration::from_secs(15));
        assert_eq!(table.project.ready_timeout, Duration::from_secs(1200));
        assert_eq!(table.project.deleted_timeout, PROJECT_DEFAULTS.deleted_timeout);
        assert_eq!(table.application.ready_timeout, APPLICATION_DEFAULTS.ready_timeout);
        assert_eq!(
            table.application.deleted_timeout,
            Some(Duration::from_secs(90))
        );
    }

    #[test]
    fn config_default_is_builtin_table() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.api_host(), DEFAULT_API_HOST);
        assert_eq!(config.defaults_table().unwrap(), DefaultsTable::default());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let json = r#"{ "waits": { "project": { "intervalSeconds": 5 } } }"#;
        assert!(serde_json::from_str::<OrchestratorConfig>(json).is_err());
    }

    #[test]
    fn zero_override_is_a_config_error() {
        let json = r#"{ "waits": { "server": { "intervalSecs": 0 } } }"#;
        let config: OrchestratorConfig = serde_json::from_str(json).unwrap();
        let err = config.defaults_table().unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
        assert!(err.to_string().contains("intervalSecs"));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let path = std::env::temp_dir().join("taikun-config-does-not-exist.json");
        let config = load_config_from(&path).unwrap();
        assert_eq!(config, OrchestratorConfig::default());
    }

    #[test]
    fn file_roundtrip() {
        let path = std::env::temp_dir().join(format!(
            "taikun-config-{}.json",
            std::process::id()
        ));
        let config = OrchestratorConfig {
            api_host: Some("https://api.internal:8443".to_string()),
            waits: WaitOverrides {
                virtual_cluster: Some(KindOverride {
                    interval_secs: Some(20),
                    ..Default::default()
                }),
                ..Default::default()
            },
        };
        std::fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();
        let loaded = load_config_from(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded, config);
    }

    #[test]
    fn resolve_config_path_explicit_wins() {
        let result = resolve_config_path(Some(Path::new("/explicit/config.json")));
        assert_eq!(result, Some(PathBuf::from("/explicit/config.json")));
    }
}
