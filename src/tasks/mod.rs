//! Task backend: HTTP client, record types, and cached lookups by priority.

pub mod cached_client;
pub mod client;
pub mod error;
pub mod keys;
pub mod types;

pub use cached_client::CachedTaskClient;
pub use types::Task;
