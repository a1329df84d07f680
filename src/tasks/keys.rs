//! Query keys for task lookups.

use crate::cache::QueryKey;

/// Query key types for the task backend.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TaskQueryKey {
  /// Tasks filtered by priority
  Tasks { priority: String },
}

impl TaskQueryKey {
  pub fn tasks(priority: &str) -> Self {
    Self::Tasks {
      priority: priority.to_string(),
    }
  }

  /// Query name and parameter this key was derived from.
  pub fn parts(&self) -> (&'static str, &str) {
    match self {
      Self::Tasks { priority } => ("tasks", priority),
    }
  }
}

impl QueryKey for TaskQueryKey {
  fn description(&self) -> String {
    let (name, param) = self.parts();
    format!("{} [{}]", name, param)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashSet;

  #[test]
  fn test_equal_priorities_share_key() {
    let mut keys = HashSet::new();
    keys.insert(TaskQueryKey::tasks("High"));
    keys.insert(TaskQueryKey::tasks("High"));
    keys.insert(TaskQueryKey::tasks("Low"));

    assert_eq!(keys.len(), 2);
  }

  #[test]
  fn test_priority_is_used_verbatim() {
    assert_ne!(TaskQueryKey::tasks("high"), TaskQueryKey::tasks("High"));
    assert_eq!(TaskQueryKey::tasks(" High").parts(), ("tasks", " High"));
  }

  #[test]
  fn test_description() {
    assert_eq!(TaskQueryKey::tasks("Medium").description(), "tasks [Medium]");
  }
}
