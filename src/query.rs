//! Async query abstraction for data fetching in views.
//!
//! Inspired by TanStack Query, this module provides a `Query<P, T>` type that
//! runs a parameterized fetch in the background and exposes loading, success
//! and error states to the renderer. The cache layer decides whether a fetch
//! hits the network; `Query` only tracks what the view should currently show.
//!
//! # Example
//!
//! ```ignore
//! let tasks = cached_client.clone();
//! let mut query = Query::new(move |priority: String| {
//!     let tasks = tasks.clone();
//!     async move { tasks.get(&priority).await.map_err(|e| e.to_string()) }
//! });
//!
//! // Start fetching
//! query.fetch("High".to_string());
//!
//! // In event loop tick
//! if query.poll() {
//!     // State changed, trigger re-render
//! }
//!
//! // In render
//! match query.state() {
//!     QueryState::Loading => render_spinner(),
//!     QueryState::Success(data) => render_data(data),
//!     QueryState::Error(e) => render_error(e),
//!     QueryState::Idle => {}
//! }
//! ```

use std::future::Future;
use std::pin::Pin;
use tokio::sync::mpsc;
use tracing::debug;

/// The state of a query
#[derive(Debug, Clone)]
pub enum QueryState<T> {
  /// Query has not been started
  Idle,
  /// Query is currently fetching data
  Loading,
  /// Query completed successfully
  Success(T),
  /// Query failed with an error
  Error(String),
}

impl<T> QueryState<T> {
  pub fn is_loading(&self) -> bool {
    matches!(self, QueryState::Loading)
  }

  pub fn data(&self) -> Option<&T> {
    match self {
      QueryState::Success(data) => Some(data),
      _ => None,
    }
  }

  pub fn error(&self) -> Option<&str> {
    match self {
      QueryState::Error(e) => Some(e),
      _ => None,
    }
  }
}

/// A boxed future that returns a Result<T, String>
type BoxFuture<T> = Pin<Box<dyn Future<Output = Result<T, String>> + Send>>;

/// A factory function that creates futures for fetching data
type FetcherFn<P, T> = Box<dyn Fn(P) -> BoxFuture<T> + Send + Sync>;

/// A finished fetch, tagged with the generation that started it
type Completion<T> = (u64, Result<T, String>);

/// Async query for parameterized data fetching with state management.
///
/// Query<P, T> encapsulates:
/// - The fetching logic (via a closure taking the parameters)
/// - Loading/success/error states
/// - Async result handling via a channel
/// - A generation counter, so only the most recently started fetch can
///   update the state
///
/// Changing the parameters does not cancel a fetch already running. Its
/// result still arrives on the channel, but `poll()` drops it because its
/// generation is no longer current.
pub struct Query<P, T> {
  state: QueryState<T>,
  params: Option<P>,
  fetcher: FetcherFn<P, T>,
  sender: mpsc::UnboundedSender<Completion<T>>,
  receiver: mpsc::UnboundedReceiver<Completion<T>>,
  generation: u64,
  /// Last successful data, kept while refetching the same parameters
  previous: Option<T>,
}

impl<P, T> Query<P, T>
where
  P: Clone + PartialEq + Send + 'static,
  T: Send + 'static,
{
  /// Create a new query with the given fetcher function.
  ///
  /// The fetcher is a closure that returns a future. It will be called
  /// each time `fetch()` starts a fetch or `refetch()` is invoked.
  pub fn new<F, Fut>(fetcher: F) -> Self
  where
    F: Fn(P) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, String>> + Send + 'static,
  {
    let (sender, receiver) = mpsc::unbounded_channel();
    Self {
      state: QueryState::Idle,
      params: None,
      fetcher: Box::new(move |params| Box::pin(fetcher(params))),
      sender,
      receiver,
      generation: 0,
      previous: None,
    }
  }

  /// Get the current state of the query.
  pub fn state(&self) -> &QueryState<T> {
    &self.state
  }

  /// Get the data if the query succeeded.
  pub fn data(&self) -> Option<&T> {
    self.state.data()
  }

  /// The data to display: the current result, or while a refetch for the
  /// same parameters is loading, the previous successful result.
  ///
  /// Never returns data fetched for different parameters.
  pub fn latest_data(&self) -> Option<&T> {
    match &self.state {
      QueryState::Success(data) => Some(data),
      QueryState::Loading => self.previous.as_ref(),
      _ => None,
    }
  }

  /// Check if the query is currently loading.
  pub fn is_loading(&self) -> bool {
    self.state.is_loading()
  }

  /// Get the error message if the query failed.
  pub fn error(&self) -> Option<&str> {
    self.state.error()
  }

  /// Start fetching for `params`.
  ///
  /// This is a no-op if a fetch for the same parameters is already loading.
  pub fn fetch(&mut self, params: P) {
    let same_params = self.params.as_ref() == Some(&params);
    if self.state.is_loading() && same_params {
      return;
    }
    self.params = Some(params);
    self.start_fetch(same_params);
  }

  /// Force a refetch with the current parameters, superseding any pending
  /// fetch. Does nothing if no parameters were ever set.
  pub fn refetch(&mut self) {
    if self.params.is_some() {
      self.start_fetch(true);
    }
  }

  /// Poll for results from pending fetches.
  ///
  /// Returns `true` if the state changed (data arrived or error occurred).
  /// Call this in your event loop tick handler.
  pub fn poll(&mut self) -> bool {
    let mut changed = false;

    // Try to receive without blocking
    while let Ok((generation, result)) = self.receiver.try_recv() {
      if generation != self.generation {
        debug!(
          generation,
          current = self.generation,
          "dropping result of superseded fetch"
        );
        continue;
      }

      self.state = match result {
        Ok(data) => QueryState::Success(data),
        Err(error) => QueryState::Error(error),
      };
      self.previous = None;
      changed = true;
    }

    changed
  }

  /// Internal: start the fetch operation
  fn start_fetch(&mut self, keep_previous: bool) {
    let Some(params) = self.params.clone() else {
      return;
    };

    self.generation += 1;
    let old = std::mem::replace(&mut self.state, QueryState::Loading);
    if !keep_previous {
      self.previous = None;
    } else if let QueryState::Success(data) = old {
      self.previous = Some(data);
    }

    let generation = self.generation;
    let future = (self.fetcher)(params);
    let tx = self.sender.clone();
    tokio::spawn(async move {
      let result = future.await;
      // Ignore send errors - the query may have been dropped
      let _ = tx.send((generation, result));
    });
  }
}

// Query is not Clone because the fetcher is boxed and receiver is owned.

impl<P: std::fmt::Debug, T: std::fmt::Debug> std::fmt::Debug for Query<P, T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Query")
      .field("state", &self.state)
      .field("params", &self.params)
      .field("generation", &self.generation)
      .finish_non_exhaustive()
  }
}
