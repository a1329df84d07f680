use serde::Deserialize;

/// Status value the backend uses for completed tasks
pub const STATUS_DONE: &str = "Done";

/// A task record as returned by `GET /tasks/<priority>`.
///
/// Every column except the id is nullable in the backing table. The backend's
/// ORM emits camelCase field names, so those are accepted as aliases.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Task {
  #[serde(alias = "taskId")]
  pub task_id: i64,
  #[serde(default, alias = "taskName")]
  pub task_name: Option<String>,
  #[serde(default)]
  pub description: Option<String>,
  #[serde(default)]
  pub priority: Option<String>,
  #[serde(default)]
  pub status: Option<String>,
}

impl Task {
  pub fn is_done(&self) -> bool {
    self.status.as_deref() == Some(STATUS_DONE)
  }

  pub fn name(&self) -> &str {
    self.task_name.as_deref().unwrap_or("(unnamed)")
  }
}
