//! Configuration types and parsing for strata.yml

use crate::error::{CoreError, CoreResult};
use crate::serde_helpers::default_true;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file names tried by [`Config::load_from_dir`], in order.
pub const CONFIG_FILE_NAMES: [&str; 2] = ["strata.yml", "strata.yaml"];

/// Smallest accepted join-label display width.
const MIN_JOIN_LABEL_WIDTH: usize = 8;

/// Project configuration from strata.yml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// SQL dialect used to parse queries
    #[serde(default)]
    pub dialect: Dialect,

    /// Project used to lengthen 1- and 2-part table identifiers
    #[serde(default)]
    pub default_project: Option<String>,

    /// Dataset used to lengthen 1-part table identifiers
    #[serde(default)]
    pub default_dataset: Option<String>,

    /// Run the column qualification pass before building lineage
    #[serde(default = "default_true")]
    pub qualify_columns: bool,

    /// Drop edges repeating an existing (source, target, kind) triple
    #[serde(default = "default_true")]
    pub dedupe_edges: bool,

    /// Maximum display length of join-node labels
    #[serde(default = "default_join_label_width")]
    pub join_label_width: usize,

    /// Governance fields stamped onto every result
    #[serde(default)]
    pub governance: GovernanceConfig,

    /// Path to a table metadata catalog, relative to the config file
    #[serde(default)]
    pub catalog: Option<String>,
}

/// Governance defaults attached to lineage results and KPI nodes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GovernanceConfig {
    /// Value of `governance.createdBy`
    #[serde(default = "default_created_by")]
    pub created_by: String,

    /// Value of `governance.lineageVersion`
    #[serde(default = "default_lineage_version")]
    pub lineage_version: String,

    /// Placeholder owner recorded on KPI nodes
    #[serde(default = "default_owner")]
    pub owner: String,
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self {
            created_by: default_created_by(),
            lineage_version: default_lineage_version(),
            owner: default_owner(),
        }
    }
}

/// SQL dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// BigQuery StandardSQL
    #[default]
    BigQuery,
    /// DuckDB SQL dialect
    DuckDb,
    /// Snowflake SQL dialect
    Snowflake,
    /// ANSI-ish generic dialect
    Generic,
}

impl Dialect {
    /// Resolve a dialect from its lowercase name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "bigquery" | "bq" => Some(Dialect::BigQuery),
            "duckdb" => Some(Dialect::DuckDb),
            "snowflake" => Some(Dialect::Snowflake),
            "generic" | "ansi" => Some(Dialect::Generic),
            _ => None,
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dialect::BigQuery => write!(f, "bigquery"),
            Dialect::DuckDb => write!(f, "duckdb"),
            Dialect::Snowflake => write!(f, "snowflake"),
            Dialect::Generic => write!(f, "generic"),
        }
    }
}

fn default_join_label_width() -> usize {
    48
}

fn default_created_by() -> String {
    "strata".to_string()
}

fn default_lineage_version() -> String {
    "1.0".to_string()
}

fn default_owner() -> String {
    "unassigned".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dialect: Dialect::default(),
            default_project: None,
            default_dataset: None,
            qualify_columns: true,
            dedupe_edges: true,
            join_label_width: default_join_label_width(),
            governance: GovernanceConfig::default(),
            catalog: None,
        }
    }
}

impl Config {
    /// Load configuration from a file path
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        let config: Config = serde_yaml::from_str(&content)?;
        config.validate()?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a directory containing strata.yml or strata.yaml
    pub fn load_from_dir(dir: &Path) -> CoreResult<Self> {
        for name in CONFIG_FILE_NAMES {
            let path = dir.join(name);
            if path.exists() {
                return Self::load(&path);
            }
        }
        Err(CoreError::ConfigNotFound {
            path: dir.join(CONFIG_FILE_NAMES[0]).display().to_string(),
        })
    }

    /// Validate the configuration
    fn validate(&self) -> CoreResult<()> {
        if self.join_label_width < MIN_JOIN_LABEL_WIDTH {
            return Err(CoreError::ConfigInvalid {
                message: format!(
                    "join_label_width must be at least {}, got {}",
                    MIN_JOIN_LABEL_WIDTH, self.join_label_width
                ),
            });
        }

        if self.governance.lineage_version.trim().is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "governance.lineage_version cannot be empty".to_string(),
            });
        }

        for (field, value) in [
            ("default_project", &self.default_project),
            ("default_dataset", &self.default_dataset),
        ] {
            if let Some(v) = value {
                if v.trim().is_empty() || v.contains('.') {
                    return Err(CoreError::ConfigInvalid {
                        message: format!("{} must be a single non-empty identifier", field),
                    });
                }
            }
        }

        Ok(())
    }

    /// Resolve the catalog path against the directory holding the config file.
    pub fn catalog_path_absolute(&self, config_dir: &Path) -> Option<PathBuf> {
        self.catalog.as_ref().map(|c| {
            let p = Path::new(c);
            if p.is_absolute() {
                p.to_path_buf()
            } else {
                config_dir.join(p)
            }
        })
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
