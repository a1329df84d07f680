use color_eyre::{eyre::eyre, Result};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::config::Config;

use super::error::{self, FetchError};
use super::types::Task;

const USER_AGENT: &str = concat!("taskq/", env!("CARGO_PKG_VERSION"));

/// Client for the tasks endpoint of the demo backend.
#[derive(Clone)]
pub struct TaskClient {
  client: Client,
  base_url: Url,
}

impl TaskClient {
  pub fn new(config: &Config) -> Result<Self> {
    Self::with_base_url(config.server_url()?, config.server.request_timeout())
  }

  /// Create a client for the given base URL.
  ///
  /// Without a timeout the transport's default applies.
  pub fn with_base_url(base_url: Url, timeout: Option<Duration>) -> Result<Self> {
    if base_url.cannot_be_a_base() {
      return Err(eyre!("Server URL cannot be used as a base: {}", base_url));
    }

    let mut builder = Client::builder().user_agent(USER_AGENT);
    if let Some(timeout) = timeout {
      builder = builder.timeout(timeout);
    }
    let client = builder
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self { client, base_url })
  }

  pub fn base_url(&self) -> &Url {
    &self.base_url
  }

  /// Fetch all tasks with the given priority.
  ///
  /// The priority is passed through unvalidated; whether it is meaningful is
  /// up to the server.
  pub async fn fetch(&self, priority: &str) -> error::Result<Vec<Task>> {
    let url = self.tasks_url(priority);
    debug!(%url, "requesting tasks");

    let response = self.client.get(url).send().await?;

    let status = response.status();
    if !status.is_success() {
      return Err(FetchError::Remote { status });
    }

    let body = response.bytes().await?;
    let tasks: Vec<Task> = serde_json::from_slice(&body)?;

    debug!(priority, count = tasks.len(), "tasks received");
    Ok(tasks)
  }

  /// `<base>/tasks/<priority>`, with the priority as one encoded segment.
  fn tasks_url(&self, priority: &str) -> Url {
    let mut url = self.base_url.clone();
    // Checked in the constructor
    if let Ok(mut segments) = url.path_segments_mut() {
      segments.pop_if_empty().push("tasks").push(priority);
    }
    url
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::tasks::error::TransportError;
  use reqwest::StatusCode;
  use serde_json::json;
  use wiremock::matchers::{method, path};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  fn client_for(server: &MockServer) -> TaskClient {
    TaskClient::with_base_url(Url::parse(&server.uri()).unwrap(), None).unwrap()
  }

  #[test]
  fn test_tasks_url() {
    let client =
      TaskClient::with_base_url(Url::parse("http://localhost:3000").unwrap(), None).unwrap();
    assert_eq!(
      client.tasks_url("High").as_str(),
      "http://localhost:3000/tasks/High"
    );
    assert_eq!(
      client.tasks_url("Very High").as_str(),
      "http://localhost:3000/tasks/Very%20High"
    );
    assert_eq!(
      client.tasks_url("a/b").as_str(),
      "http://localhost:3000/tasks/a%2Fb"
    );
  }

  #[test]
  fn test_tasks_url_keeps_base_path() {
    let client =
      TaskClient::with_base_url(Url::parse("http://example.com/api/").unwrap(), None).unwrap();
    assert_eq!(
      client.tasks_url("Low").as_str(),
      "http://example.com/api/tasks/Low"
    );
  }

  #[test]
  fn test_rejects_non_base_url() {
    let url = Url::parse("mailto:tasks@example.com").unwrap();
    assert!(TaskClient::with_base_url(url, None).is_err());
  }

  #[tokio::test]
  async fn test_fetch_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/tasks/High"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!([
        {"task_id": 1, "task_name": "Ship release", "priority": "High", "status": "Open"}
      ])))
      .expect(1)
      .mount(&server)
      .await;

    let tasks = client_for(&server).fetch("High").await.unwrap();

    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].task_id, 1);
    assert_eq!(tasks[0].name(), "Ship release");
    assert_eq!(tasks[0].status.as_deref(), Some("Open"));
  }

  #[tokio::test]
  async fn test_fetch_non_success_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/tasks/Low"))
      .respond_with(ResponseTemplate::new(500))
      .expect(1)
      .mount(&server)
      .await;

    let err = client_for(&server).fetch("Low").await.unwrap_err();

    match err {
      FetchError::Remote { status } => assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR),
      other => panic!("expected Remote error, got {:?}", other),
    }
  }

  #[tokio::test]
  async fn test_fetch_invalid_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/tasks/High"))
      .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
      .mount(&server)
      .await;

    let err = client_for(&server).fetch("High").await.unwrap_err();

    assert!(matches!(
      err,
      FetchError::Transport(TransportError::Parse(_))
    ));
  }

  #[tokio::test]
  async fn test_fetch_connection_refused() {
    let client =
      TaskClient::with_base_url(Url::parse("http://127.0.0.1:1").unwrap(), None).unwrap();

    let err = client.fetch("High").await.unwrap_err();

    assert!(matches!(
      err,
      FetchError::Transport(TransportError::Network(_))
    ));
  }
}
