//! Request and option types for a lineage computation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use st_core::{Config, GovernanceConfig, TableId};

/// Input contract of a lineage call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LineageRequest {
    /// The SQL statement to analyse
    pub sql: String,

    /// Dialect name, `bigquery` when omitted
    #[serde(default = "default_dialect")]
    pub dialect: String,
}

fn default_dialect() -> String {
    "bigquery".to_string()
}

impl LineageRequest {
    /// Create a request for BigQuery SQL
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            dialect: default_dialect(),
        }
    }
}

/// Project/dataset used to lengthen short table identifiers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableDefaults {
    pub project: Option<String>,
    pub dataset: Option<String>,
}

impl TableDefaults {
    /// Turn an unquoted table path into its longest known [`TableId`].
    ///
    /// Returns `None` for paths that are not valid identifiers (empty
    /// segments, more than three parts).
    pub fn resolve(&self, path: &[String]) -> Option<TableId> {
        match TableId::from_segments(path) {
            Ok(id) => Some(id.qualify(self.project.as_deref(), self.dataset.as_deref())),
            Err(reason) => {
                log::debug!("Skipping table reference {}: {}", path.join("."), reason);
                None
            }
        }
    }
}

/// Knobs controlling one lineage computation
#[derive(Debug, Clone)]
pub struct LineageOptions {
    pub defaults: TableDefaults,

    /// Run the column qualification pass
    pub qualify_columns: bool,

    /// Drop edges repeating a (source, target, kind) triple
    pub dedupe_edges: bool,

    /// Join node labels are cut to this many characters
    pub join_label_width: usize,

    pub governance: GovernanceConfig,

    /// Fixed timestamp for `governance.lastModified`; the current time when unset
    pub now: Option<DateTime<Utc>>,
}

impl Default for LineageOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl LineageOptions {
    /// Build options from a loaded configuration
    pub fn from_config(config: &Config) -> Self {
        Self {
            defaults: TableDefaults {
                project: config.default_project.clone(),
                dataset: config.default_dataset.clone(),
            },
            qualify_columns: config.qualify_columns,
            dedupe_edges: config.dedupe_edges,
            join_label_width: config.join_label_width,
            governance: config.governance.clone(),
            now: None,
        }
    }

    /// Pin the governance timestamp
    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }

    /// Set the default project and dataset
    pub fn with_defaults(mut self, project: Option<String>, dataset: Option<String>) -> Self {
        self.defaults = TableDefaults { project, dataset };
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults_dialect() {
        let req: LineageRequest = serde_json::from_str(r#"{"sql": "SELECT 1"}"#).unwrap();
        assert_eq!(req.dialect, "bigquery");
    }

    #[test]
    fn test_request_rejects_unknown_fields() {
        let result: Result<LineageRequest, _> =
            serde_json::from_str(r#"{"sql": "SELECT 1", "limit": 5}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_request_requires_sql() {
        let result: Result<LineageRequest, _> = serde_json::from_str(r#"{"dialect": "bigquery"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_defaults_resolve() {
        let defaults = TableDefaults {
            project: Some("acme".to_string()),
            dataset: Some("sales".to_string()),
        };
        let id = defaults.resolve(&["orders".to_string()]).unwrap();
        assert_eq!(id.as_str(), "acme.sales.orders");
        assert!(defaults
            .resolve(&["a", "b", "c", "d"].map(String::from))
            .is_none());
    }

    #[test]
    fn test_options_from_config() {
        let config = Config {
            dedupe_edges: false,
            join_label_width: 20,
            ..Config::default()
        };
        let options = LineageOptions::from_config(&config);
        assert!(!options.dedupe_edges);
        assert!(options.qualify_columns);
        assert_eq!(options.join_label_width, 20);
        assert!(options.now.is_none());
    }
}
