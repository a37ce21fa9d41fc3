//! st-core - Core library for Strata
//!
//! This crate provides the shared vocabulary used across all Strata
//! components: table identifiers, CTE names, project configuration, and the
//! table-metadata provider interface consumed by the lineage engine.

pub mod config;
pub mod error;
pub mod metadata;
mod newtype_string;
pub(crate) mod serde_helpers;
pub mod table_id;

pub use config::{Config, Dialect, GovernanceConfig};
pub use error::{CoreError, CoreResult};
pub use metadata::{ColumnMetadata, MetadataError, TableMetadata, TableMetadataLookup};
pub use table_id::{CteName, TableId};
