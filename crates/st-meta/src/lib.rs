//! Table metadata providers for Strata.
//!
//! A [`Catalog`] answers lookups from a YAML file checked into the project;
//! [`CachedLookup`] wraps any provider and remembers every answer, hit or
//! miss, for the lifetime of the wrapper.

pub mod cache;
pub mod catalog;
pub mod error;

pub use cache::CachedLookup;
pub use catalog::Catalog;
pub use error::{MetaError, MetaResult};
