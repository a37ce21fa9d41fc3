//! CLI command implementations

pub(crate) mod common;
pub(crate) mod ctes;
pub(crate) mod lineage;
pub(crate) mod sources;
