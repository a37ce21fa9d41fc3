//! Table metadata provider interface
//!
//! The lineage engine decorates table and column nodes with facts supplied by
//! an external lookup. Lookups are fallible and optional: every failure is
//! treated as "metadata unavailable" by the caller.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Metadata known about one physical table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableMetadata {
    /// Approximate number of rows
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_count: Option<u64>,

    /// Columns keyed by name
    #[serde(default)]
    pub columns: BTreeMap<String, ColumnMetadata>,
}

impl TableMetadata {
    /// Look up a column by name, ignoring ASCII case.
    pub fn column(&self, name: &str) -> Option<&ColumnMetadata> {
        self.columns.get(name).or_else(|| {
            self.columns
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v)
        })
    }
}

/// Metadata known about one column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMetadata {
    /// Warehouse data type (e.g. `STRING`, `INT64`)
    #[serde(rename = "type")]
    pub data_type: String,

    /// Free-form column description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Whether the column holds personally identifiable information
    #[serde(default)]
    pub pii: bool,
}

/// Errors a metadata provider may report
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MetadataError {
    /// The provider has no entry for the table
    #[error("table not found: {project}.{dataset}.{table}")]
    NotFound {
        project: String,
        dataset: String,
        table: String,
    },

    /// The provider could not answer (I/O, permissions, backend down)
    #[error("metadata unavailable: {0}")]
    Unavailable(String),
}

/// Lookup of table metadata keyed by (project, dataset, table).
///
/// Implementations must tolerate concurrent readers; the engine may be
/// invoked from many threads sharing one provider.
pub trait TableMetadataLookup: Send + Sync {
    /// Fetch metadata for one table.
    fn lookup_table(
        &self,
        project: &str,
        dataset: &str,
        table: &str,
    ) -> Result<TableMetadata, MetadataError>;
}

impl<T: TableMetadataLookup + ?Sized> TableMetadataLookup for std::sync::Arc<T> {
    fn lookup_table(
        &self,
        project: &str,
        dataset: &str,
        table: &str,
    ) -> Result<TableMetadata, MetadataError> {
        (**self).lookup_table(project, dataset, table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_lookup_ignores_case() {
        let mut meta = TableMetadata::default();
        meta.columns.insert(
            "Customer_Id".to_string(),
            ColumnMetadata {
                data_type: "INT64".to_string(),
                description: None,
                pii: false,
            },
        );
        assert!(meta.column("Customer_Id").is_some());
        assert!(meta.column("customer_id").is_some());
        assert!(meta.column("email").is_none());
    }

    #[test]
    fn test_column_metadata_yaml_shape() {
        let yaml = "type: STRING\ndescription: Customer email\npii: true\n";
        let col: ColumnMetadata = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(col.data_type, "STRING");
        assert_eq!(col.description.as_deref(), Some("Customer email"));
        assert!(col.pii);
    }

    #[test]
    fn test_metadata_error_display() {
        let err = MetadataError::NotFound {
            project: "p".into(),
            dataset: "d".into(),
            table: "t".into(),
        };
        assert_eq!(err.to_string(), "table not found: p.d.t");
    }
}
