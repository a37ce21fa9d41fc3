//! Error types for metadata providers.

use thiserror::Error;

/// Metadata provider errors.
#[derive(Error, Debug)]
pub enum MetaError {
    /// Catalog file does not exist (M001).
    #[error("[M001] Catalog file not found: {path}")]
    CatalogNotFound { path: String },

    /// Catalog file could not be read (M002).
    #[error("[M002] Failed to read catalog '{path}': {source}")]
    IoWithPath {
        path: String,
        source: std::io::Error,
    },

    /// Catalog is not valid YAML or has the wrong shape (M003).
    #[error("[M003] Catalog parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    /// Catalog parsed but holds an unusable entry (M004).
    #[error("[M004] Invalid catalog entry '{entry}': {reason}")]
    InvalidEntry { entry: String, reason: String },
}

/// Result type alias for [`MetaError`].
pub type MetaResult<T> = Result<T, MetaError>;
