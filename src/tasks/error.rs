//! Error types for the task fetcher.
//!
//! A server that answered with a failure is kept apart from a request that
//! never produced a usable body.

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
  #[error("Response not ok: HTTP {status}")]
  Remote { status: StatusCode },

  #[error("Transport error: {0}")]
  Transport(#[from] TransportError),
}

#[derive(Error, Debug)]
pub enum TransportError {
  #[error("request failed: {0}")]
  Network(#[from] reqwest::Error),

  #[error("invalid task list: {0}")]
  Parse(#[from] serde_json::Error),
}

impl From<reqwest::Error> for FetchError {
  fn from(e: reqwest::Error) -> Self {
    FetchError::Transport(TransportError::Network(e))
  }
}

impl From<serde_json::Error> for FetchError {
  fn from(e: serde_json::Error) -> Self {
    FetchError::Transport(TransportError::Parse(e))
  }
}

pub type Result<T> = std::result::Result<T, FetchError>;
