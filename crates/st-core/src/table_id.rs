//! Strongly-typed table identifiers and CTE names.

use crate::error::{CoreError, CoreResult};
use crate::newtype_string::define_name_newtype;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::ops::Deref;

/// Maximum number of path segments in a table identifier (`project.dataset.table`).
pub const MAX_SEGMENTS: usize = 3;

define_name_newtype! {
    /// Name of a common table expression, unique within one query.
    pub struct CteName;
}

/// A dotted table path of 1–3 segments: `table`, `dataset.table`, or
/// `project.dataset.table`.
///
/// Quoting (backticks, double quotes) is stripped on construction, so
/// `` `proj.ds.orders` `` and `proj.ds.orders` are the same identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TableId(String);

impl TableId {
    /// Parse a possibly-quoted dotted table path.
    pub fn parse(raw: &str) -> CoreResult<Self> {
        let segments: Vec<String> = strip_quotes(raw)
            .split('.')
            .map(|s| strip_quotes(s).to_string())
            .collect();
        Self::from_segments(&segments).map_err(|reason| CoreError::InvalidTableId {
            name: raw.to_string(),
            reason,
        })
    }

    /// Build an identifier from already-split segments.
    ///
    /// Segments that themselves contain dots are split further, matching how
    /// BigQuery treats `` `project.dataset`.table ``.
    pub fn from_segments<S: AsRef<str>>(segments: &[S]) -> Result<Self, String> {
        let parts: Vec<&str> = segments
            .iter()
            .flat_map(|s| s.as_ref().split('.'))
            .map(strip_quotes)
            .collect();
        if parts.is_empty() || parts.iter().any(|p| p.trim().is_empty()) {
            return Err("identifier has an empty segment".to_string());
        }
        if parts.len() > MAX_SEGMENTS {
            return Err(format!(
                "expected at most {} segments, found {}",
                MAX_SEGMENTS,
                parts.len()
            ));
        }
        Ok(Self(parts.join(".")))
    }

    /// Return the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the wrapper and return the inner `String`.
    pub fn into_inner(self) -> String {
        self.0
    }

    /// Path segments, outermost first.
    pub fn segments(&self) -> Vec<&str> {
        self.0.split('.').collect()
    }

    /// Last path segment (the bare table name).
    pub fn short_name(&self) -> &str {
        self.0.rsplit('.').next().unwrap_or(&self.0)
    }

    /// Dataset (schema) segment, present for 2- and 3-part identifiers.
    pub fn dataset(&self) -> Option<&str> {
        let segs = self.segments();
        match segs.len() {
            2 => Some(segs[0]),
            3 => Some(segs[1]),
            _ => None,
        }
    }

    /// Project (database) segment, present only for 3-part identifiers.
    pub fn project(&self) -> Option<&str> {
        let segs = self.segments();
        if segs.len() == 3 {
            Some(segs[0])
        } else {
            None
        }
    }

    /// Normalize to the longest form the defaults allow. Never shortens.
    pub fn qualify(&self, default_project: Option<&str>, default_dataset: Option<&str>) -> Self {
        let segs = self.segments();
        match (segs.len(), default_project, default_dataset) {
            (1, Some(p), Some(d)) => Self(format!("{}.{}.{}", p, d, segs[0])),
            (1, None, Some(d)) => Self(format!("{}.{}", d, segs[0])),
            (2, Some(p), _) => Self(format!("{}.{}", p, self.0)),
            _ => self.clone(),
        }
    }
}

/// Strip one layer of backtick or double-quote quoting.
fn strip_quotes(s: &str) -> &str {
    let t = s.trim();
    for q in ['`', '"'] {
        if t.len() >= 2 && t.starts_with(q) && t.ends_with(q) {
            return &t[1..t.len() - 1];
        }
    }
    t
}

impl<'de> Deserialize<'de> for TableId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        TableId::parse(&s).map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TableId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Deref for TableId {
    type Target = str;
    fn deref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for TableId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for TableId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for TableId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

#[cfg(test)]
#[path = "table_id_test.rs"]
mod tests;
