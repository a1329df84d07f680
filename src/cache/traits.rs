//! Core traits and types for the caching system.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

/// Trait for keys that identify a cached query.
///
/// Two keys that compare equal share one cache entry, so implementors should
/// derive `Eq` and `Hash` over every parameter that changes the result.
pub trait QueryKey: Clone + Eq + Hash + Debug + Send + Sync + 'static {
  /// Human-readable description used in logs and error messages
  /// (e.g. "tasks [High]").
  fn description(&self) -> String;
}

/// What a stale read does while the refresh is in progress.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StalePolicy {
  /// Return the stale data immediately and refresh in the background.
  #[default]
  ReturnStale,
  /// Wait for the refresh to finish.
  Block,
}

/// Where a cache result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Fresh from the network (this call waited for a fetch)
  Network,
  /// From cache, within the stale time
  CacheFresh,
  /// From cache, past the stale time (a refresh was started)
  CacheStale,
}

/// Observable state of a single cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
  /// Never requested, or cleared
  Empty,
  /// A fetch is in flight
  Fetching,
  /// Data is within the stale time
  Fresh,
  /// Data is past the stale time or was invalidated
  Stale,
  /// The last fetch failed
  Failed,
}

/// Result from a cache operation, including data and metadata about the source.
#[derive(Debug)]
pub struct CacheResult<T> {
  /// The actual data, shared with every other reader of the entry
  pub data: Arc<T>,
  /// Where the data came from
  pub source: CacheSource,
  /// When the data was fetched
  pub fetched_at: DateTime<Utc>,
}

impl<T> CacheResult<T> {
  /// Create a new cache result from data this call waited for.
  pub fn from_network(data: Arc<T>, fetched_at: DateTime<Utc>) -> Self {
    Self {
      data,
      source: CacheSource::Network,
      fetched_at,
    }
  }

  /// Create a new cache result from cached data.
  pub fn from_cache(data: Arc<T>, fetched_at: DateTime<Utc>, is_stale: bool) -> Self {
    Self {
      data,
      source: if is_stale {
        CacheSource::CacheStale
      } else {
        CacheSource::CacheFresh
      },
      fetched_at,
    }
  }
}

impl<T> Clone for CacheResult<T> {
  fn clone(&self) -> Self {
    Self {
      data: Arc::clone(&self.data),
      source: self.source,
      fetched_at: self.fetched_at,
    }
  }
}
