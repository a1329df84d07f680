//! Generic in-process query cache.
//!
//! This module provides a domain-agnostic caching mechanism that:
//! - Keys results by a `QueryKey` (query name plus parameters)
//! - Serves results for a configurable stale time
//! - De-duplicates concurrent fetches for the same key
//! - Guards against a superseded fetch overwriting newer data

mod error;
mod layer;
mod traits;

pub use error::QueryError;
pub use layer::{QueryCache, DEFAULT_STALE_TIME};
pub use traits::{CacheResult, CacheSource, QueryKey, QueryStatus, StalePolicy};
