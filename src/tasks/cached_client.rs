//! Cached task client that wraps TaskClient with transparent caching.

use color_eyre::Result;
use std::sync::Arc;

use crate::cache::{CacheResult, QueryCache, QueryError, QueryStatus};
use crate::config::Config;

use super::client::TaskClient;
use super::keys::TaskQueryKey;
use super::types::Task;

/// Task client with transparent caching support.
///
/// Results are cached per priority for the configured stale time, and
/// concurrent lookups for the same priority share one request. Clones share
/// the same cache.
#[derive(Clone)]
pub struct CachedTaskClient {
  inner: TaskClient,
  cache: QueryCache<TaskQueryKey, Vec<Task>>,
}

impl CachedTaskClient {
  /// Create a new cached task client with a fresh cache.
  pub fn new(config: &Config) -> Result<Self> {
    let inner = TaskClient::new(config)?;
    let cache = QueryCache::new()
      .with_stale_time(config.cache.stale_time()?)
      .with_stale_policy(config.cache.stale_policy);

    Ok(Self::from_parts(inner, cache))
  }

  pub fn from_parts(inner: TaskClient, cache: QueryCache<TaskQueryKey, Vec<Task>>) -> Self {
    Self { inner, cache }
  }

  /// Get the tasks for a priority, from cache when fresh.
  pub async fn get(&self, priority: &str) -> Result<Arc<Vec<Task>>, QueryError> {
    Ok(self.get_with_meta(priority).await?.data)
  }

  /// Like `get`, but also reports where the result came from and when it
  /// was fetched.
  pub async fn get_with_meta(&self, priority: &str) -> Result<CacheResult<Vec<Task>>, QueryError> {
    let key = TaskQueryKey::tasks(priority);

    self
      .cache
      .fetch(&key, || {
        let inner = self.inner.clone();
        let priority = priority.to_string();
        async move { inner.fetch(&priority).await }
      })
      .await
  }

  /// Mark the cached tasks for a priority as stale.
  pub fn invalidate(&self, priority: &str) -> bool {
    self.cache.invalidate(&TaskQueryKey::tasks(priority))
  }

  /// Drop the cached tasks for every priority.
  pub fn clear(&self) {
    self.cache.clear();
  }

  pub fn status(&self, priority: &str) -> QueryStatus {
    self.cache.status(&TaskQueryKey::tasks(priority))
  }

  pub fn base_url(&self) -> &url::Url {
    self.inner.base_url()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::{CacheSource, StalePolicy};
  use crate::tasks::error::FetchError;
  use reqwest::StatusCode;
  use serde_json::json;
  use std::time::Duration;
  use url::Url;
  use wiremock::matchers::{method, path};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  fn client_for(server: &MockServer, stale_time: Duration, policy: StalePolicy) -> CachedTaskClient {
    let inner = TaskClient::with_base_url(Url::parse(&server.uri()).unwrap(), None).unwrap();
    let cache = QueryCache::new()
      .with_stale_time(stale_time)
      .with_stale_policy(policy);
    CachedTaskClient::from_parts(inner, cache)
  }

  fn ship_release() -> serde_json::Value {
    json!([{"task_id": 1, "task_name": "Ship release", "priority": "High", "status": "Open"}])
  }

  #[tokio::test]
  async fn test_second_get_within_stale_time_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/tasks/High"))
      .respond_with(ResponseTemplate::new(200).set_body_json(ship_release()))
      .expect(1)
      .mount(&server)
      .await;
    let client = client_for(&server, Duration::from_secs(5), StalePolicy::ReturnStale);

    let first = client.get_with_meta("High").await.unwrap();
    assert_eq!(first.source, CacheSource::Network);
    assert_eq!(first.data.len(), 1);
    assert_eq!(first.data[0].task_id, 1);
    assert_eq!(first.data[0].name(), "Ship release");

    let second = client.get_with_meta("High").await.unwrap();
    assert_eq!(second.source, CacheSource::CacheFresh);
    assert!(Arc::ptr_eq(&first.data, &second.data));
  }

  #[tokio::test]
  async fn test_concurrent_gets_issue_one_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/tasks/High"))
      .respond_with(
        ResponseTemplate::new(200)
          .set_body_json(ship_release())
          .set_delay(Duration::from_millis(100)),
      )
      .expect(1)
      .mount(&server)
      .await;
    let client = client_for(&server, Duration::from_secs(5), StalePolicy::ReturnStale);

    let results = futures::future::join_all((0..5).map(|_| client.get("High"))).await;

    let first = results[0].as_ref().unwrap();
    for result in &results {
      assert!(Arc::ptr_eq(first, result.as_ref().unwrap()));
    }
  }

  #[tokio::test]
  async fn test_server_error_then_recovery() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/tasks/Low"))
      .respond_with(ResponseTemplate::new(500))
      .up_to_n_times(1)
      .expect(1)
      .mount(&server)
      .await;
    Mock::given(method("GET"))
      .and(path("/tasks/Low"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!([
        {"task_id": 2, "task_name": "Water plants", "priority": "Low", "status": "Done"}
      ])))
      .expect(1)
      .mount(&server)
      .await;
    let client = client_for(&server, Duration::from_secs(5), StalePolicy::ReturnStale);

    let err = client.get("Low").await.unwrap_err();
    assert_eq!(err.to_string(), "Failed to fetch tasks [Low]");
    match err.cause::<FetchError>() {
      Some(FetchError::Remote { status }) => {
        assert_eq!(*status, StatusCode::INTERNAL_SERVER_ERROR)
      }
      other => panic!("expected Remote cause, got {:?}", other),
    }
    assert_eq!(client.status("Low"), QueryStatus::Failed);

    let tasks = client.get("Low").await.unwrap();
    assert_eq!(tasks.len(), 1);
    assert!(tasks[0].is_done());
  }

  #[tokio::test]
  async fn test_refetches_once_after_stale_time() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/tasks/High"))
      .respond_with(ResponseTemplate::new(200).set_body_json(ship_release()))
      .expect(2)
      .mount(&server)
      .await;
    let client = client_for(&server, Duration::from_millis(100), StalePolicy::Block);

    client.get("High").await.unwrap();
    client.get("High").await.unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;

    let refreshed = client.get_with_meta("High").await.unwrap();
    assert_eq!(refreshed.source, CacheSource::Network);
    client.get("High").await.unwrap();
  }

  #[tokio::test]
  async fn test_priorities_are_cached_separately() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/tasks/High"))
      .respond_with(ResponseTemplate::new(200).set_body_json(ship_release()))
      .expect(1)
      .mount(&server)
      .await;
    Mock::given(method("GET"))
      .and(path("/tasks/Medium"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
      .expect(1)
      .mount(&server)
      .await;
    let client = client_for(&server, Duration::from_secs(5), StalePolicy::ReturnStale);

    assert_eq!(client.get("High").await.unwrap().len(), 1);
    assert!(client.get("Medium").await.unwrap().is_empty());
    assert_eq!(client.get("High").await.unwrap().len(), 1);
  }

  #[test]
  fn test_out_of_range_stale_time_is_an_error() {
    let mut config = Config::default();
    config.cache.stale_time_secs = 1e20;
    assert!(CachedTaskClient::new(&config).is_err());
  }

  #[tokio::test]
  async fn test_invalidate_triggers_refetch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/tasks/High"))
      .respond_with(ResponseTemplate::new(200).set_body_json(ship_release()))
      .expect(2)
      .mount(&server)
      .await;
    let client = client_for(&server, Duration::from_secs(5), StalePolicy::Block);

    client.get("High").await.unwrap();
    assert!(client.invalidate("High"));
    let refreshed = client.get_with_meta("High").await.unwrap();
    assert_eq!(refreshed.source, CacheSource::Network);
  }
}
