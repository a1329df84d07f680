//! Cache layer that orchestrates caching logic with network fetching.

use chrono::Utc;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::error::Error as StdError;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::error::QueryError;
use super::traits::{CacheResult, QueryKey, QueryStatus, StalePolicy};

/// Default stale time for cached query results.
pub const DEFAULT_STALE_TIME: Duration = Duration::from_secs(5);

type FetchOutput<T> = Result<CacheResult<T>, QueryError>;
type SharedFetch<T> = Shared<BoxFuture<'static, FetchOutput<T>>>;
type Slots<K, T> = Mutex<HashMap<K, Slot<T>>>;

enum SlotState<T> {
  Empty,
  Ready {
    data: Arc<T>,
    fetched_at: Instant,
    fetched_at_utc: chrono::DateTime<Utc>,
    invalidated: bool,
  },
  Failed {
    error: QueryError,
  },
}

struct InFlight<T> {
  generation: u64,
  result: SharedFetch<T>,
}

/// Everything the cache knows about one key.
struct Slot<T> {
  state: SlotState<T>,
  in_flight: Option<InFlight<T>>,
}

impl<T> Default for Slot<T> {
  fn default() -> Self {
    Self {
      state: SlotState::Empty,
      in_flight: None,
    }
  }
}

/// In-process query cache.
///
/// Results are stored per key as `Arc<T>` and replaced wholesale on refresh.
/// At most one fetch per key is in flight; callers arriving while it runs
/// attach to it and receive the same result. Each fetch is tagged with a
/// generation, and only the generation currently registered for the key may
/// commit, so a superseded fetch never overwrites newer data.
///
/// Cloning is cheap and clones share the same entries.
pub struct QueryCache<K: QueryKey, T> {
  slots: Arc<Slots<K, T>>,
  generation: Arc<AtomicU64>,
  /// How long before cached data is considered stale
  stale_time: Duration,
  stale_policy: StalePolicy,
}

impl<K: QueryKey, T: Send + Sync + 'static> QueryCache<K, T> {
  /// Create an empty cache with the default stale time and policy.
  pub fn new() -> Self {
    Self {
      slots: Arc::new(Mutex::new(HashMap::new())),
      generation: Arc::new(AtomicU64::new(0)),
      stale_time: DEFAULT_STALE_TIME,
      stale_policy: StalePolicy::default(),
    }
  }

  /// Set the stale time for cached data.
  pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
    self.stale_time = stale_time;
    self
  }

  /// Set what a stale read does while refreshing.
  pub fn with_stale_policy(mut self, stale_policy: StalePolicy) -> Self {
    self.stale_policy = stale_policy;
    self
  }

  /// Fetch a value with cache-first strategy.
  ///
  /// 1. Fresh entry: return it, `fetcher` is not called
  /// 2. Fetch already in flight: wait for it
  /// 3. Stale entry: with `ReturnStale`, return it and refresh in the
  ///    background; with `Block`, wait for the refresh
  /// 4. Empty or failed entry: fetch and wait
  ///
  /// Fetches run as spawned tasks, so they complete and commit even if every
  /// caller waiting on them is dropped.
  pub async fn fetch<F, Fut, E>(&self, key: &K, fetcher: F) -> FetchOutput<T>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    E: StdError + Send + Sync + 'static,
  {
    let pending = {
      let mut slots = self.lock();
      let slot = slots.entry(key.clone()).or_default();

      if let SlotState::Ready {
        data,
        fetched_at,
        fetched_at_utc,
        invalidated,
      } = &slot.state
      {
        let stale = *invalidated || fetched_at.elapsed() >= self.stale_time;
        if !stale {
          debug!(query = %key.description(), "cache hit");
          return Ok(CacheResult::from_cache(
            Arc::clone(data),
            *fetched_at_utc,
            false,
          ));
        }

        if self.stale_policy == StalePolicy::ReturnStale {
          let result = CacheResult::from_cache(Arc::clone(data), *fetched_at_utc, true);
          if slot.in_flight.is_none() {
            debug!(query = %key.description(), "serving stale data, refreshing in background");
            self.start_fetch(key, slot, fetcher);
          }
          return Ok(result);
        }
      }

      match &slot.in_flight {
        Some(in_flight) => {
          debug!(
            query = %key.description(),
            generation = in_flight.generation,
            "attaching to in-flight fetch"
          );
          in_flight.result.clone()
        }
        None => self.start_fetch(key, slot, fetcher),
      }
    };

    pending.await
  }

  pub fn status(&self, key: &K) -> QueryStatus {
    let slots = self.lock();
    let Some(slot) = slots.get(key) else {
      return QueryStatus::Empty;
    };

    if slot.in_flight.is_some() {
      return QueryStatus::Fetching;
    }

    match &slot.state {
      SlotState::Empty => QueryStatus::Empty,
      SlotState::Ready {
        fetched_at,
        invalidated,
        ..
      } => {
        if *invalidated || fetched_at.elapsed() >= self.stale_time {
          QueryStatus::Stale
        } else {
          QueryStatus::Fresh
        }
      }
      SlotState::Failed { .. } => QueryStatus::Failed,
    }
  }

  /// Mark cached data for `key` as stale so the next fetch refreshes it.
  ///
  /// Returns `false` if there was no data to invalidate.
  pub fn invalidate(&self, key: &K) -> bool {
    let mut slots = self.lock();
    match slots.get_mut(key).map(|slot| &mut slot.state) {
      Some(SlotState::Ready { invalidated, .. }) => {
        *invalidated = true;
        debug!(query = %key.description(), "invalidated");
        true
      }
      _ => false,
    }
  }

  /// Drop every entry. Fetches still in flight will not commit.
  pub fn clear(&self) {
    self.lock().clear();
  }

  fn lock(&self) -> MutexGuard<'_, HashMap<K, Slot<T>>> {
    lock_slots(&self.slots)
  }

  /// Spawn the fetch and register it as the slot's in-flight fetch.
  ///
  /// Must be called with the slot lock held so the registration happens
  /// before the spawned task can try to commit.
  fn start_fetch<F, Fut, E>(&self, key: &K, slot: &mut Slot<T>, fetcher: F) -> SharedFetch<T>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    E: StdError + Send + Sync + 'static,
  {
    let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
    let query = key.description();
    info!(query = %query, generation, "fetch started");

    let future = fetcher();
    let slots = Arc::clone(&self.slots);
    let task_key = key.clone();
    let task_query = query.clone();
    let handle = tokio::spawn(async move {
      let result = future
        .await
        .map(Arc::new)
        .map_err(|e| QueryError::fetch_failed(task_query, e));
      commit(&slots, &task_key, generation, result)
    });

    let slots = Arc::clone(&self.slots);
    let abort_key = key.clone();
    let result = async move {
      match handle.await {
        Ok(output) => output,
        Err(e) => {
          warn!(query = %query, generation, error = %e, "fetch task aborted");
          commit(
            &slots,
            &abort_key,
            generation,
            Err(QueryError::Aborted { query }),
          )
        }
      }
    }
    .boxed()
    .shared();

    slot.in_flight = Some(InFlight {
      generation,
      result: result.clone(),
    });
    result
  }
}

impl<K: QueryKey, T: Send + Sync + 'static> Default for QueryCache<K, T> {
  fn default() -> Self {
    Self::new()
  }
}

impl<K: QueryKey, T> Clone for QueryCache<K, T> {
  fn clone(&self) -> Self {
    Self {
      slots: Arc::clone(&self.slots),
      generation: Arc::clone(&self.generation),
      stale_time: self.stale_time,
      stale_policy: self.stale_policy,
    }
  }
}

fn lock_slots<K, T>(slots: &Slots<K, T>) -> MutexGuard<'_, HashMap<K, Slot<T>>> {
  // Slot updates are single assignments, so a poisoned map is still consistent.
  slots.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Store a finished fetch if it is still the key's registered fetch.
fn commit<K: QueryKey, T>(
  slots: &Slots<K, T>,
  key: &K,
  generation: u64,
  result: Result<Arc<T>, QueryError>,
) -> FetchOutput<T> {
  let fetched_at = Instant::now();
  let fetched_at_utc = Utc::now();

  let mut slots = lock_slots(slots);
  match slots.get_mut(key) {
    Some(slot) if slot.in_flight.as_ref().map(|f| f.generation) == Some(generation) => {
      slot.in_flight = None;
      slot.state = match &result {
        Ok(data) => {
          info!(query = %key.description(), generation, "fetch committed");
          SlotState::Ready {
            data: Arc::clone(data),
            fetched_at,
            fetched_at_utc,
            invalidated: false,
          }
        }
        Err(error) => {
          warn!(query = %key.description(), generation, error = %error, "fetch failed");
          SlotState::Failed {
            error: error.clone(),
          }
        }
      };
    }
    _ => {
      debug!(
        query = %key.description(),
        generation,
        "discarding result of superseded fetch"
      );
    }
  }

  result.map(|data| CacheResult::from_network(data, fetched_at_utc))
}
