//! Errors surfaced by the cache layer.

use std::error::Error as StdError;
use std::sync::Arc;
use thiserror::Error;

/// Shared, type-erased cause of a failed fetch.
pub type FetchCause = Arc<dyn StdError + Send + Sync + 'static>;

/// Error returned by a cache lookup.
///
/// Every caller attached to the same fetch receives a clone of the same error,
/// so the cause is held behind an `Arc`.
#[derive(Debug, Clone, Error)]
pub enum QueryError {
  /// The fetcher returned an error. The original error is kept as the source.
  #[error("Failed to fetch {query}")]
  FetchFailed {
    query: String,
    #[source]
    source: FetchCause,
  },

  /// The fetch task panicked or was cancelled before producing a result.
  #[error("Fetch for {query} was aborted")]
  Aborted { query: String },
}

impl QueryError {
  pub fn fetch_failed<E>(query: String, error: E) -> Self
  where
    E: StdError + Send + Sync + 'static,
  {
    Self::FetchFailed {
      query,
      source: Arc::new(error),
    }
  }

  /// The underlying fetch error, if it is of type `E`.
  pub fn cause<E: StdError + 'static>(&self) -> Option<&E> {
    match self {
      Self::FetchFailed { source, .. } => source.downcast_ref::<E>(),
      Self::Aborted { .. } => None,
    }
  }
}
