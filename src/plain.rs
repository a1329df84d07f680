//! Non-interactive mode: fetch one priority and print it to stdout.

use color_eyre::eyre::Report;
use color_eyre::Result;
use std::io::Write;

use crate::cache::QueryError;
use crate::tasks::error::{FetchError, TransportError};
use crate::tasks::{CachedTaskClient, Task};

/// Fetch the tasks for `priority` once and write them as lines of text.
pub async fn run(tasks: &CachedTaskClient, priority: &str, out: &mut impl Write) -> Result<()> {
  let list = tasks
    .get(priority)
    .await
    .map_err(|e| explain(e, tasks))?;

  if list.is_empty() {
    writeln!(out, "No {} priority tasks", priority)?;
    return Ok(());
  }

  for task in list.iter() {
    writeln!(out, "{}", format_task(task))?;
  }
  Ok(())
}

/// Point at the server when the request never reached it.
fn explain(error: QueryError, tasks: &CachedTaskClient) -> Report {
  let unreachable = matches!(
    error.cause::<FetchError>(),
    Some(FetchError::Transport(TransportError::Network(_)))
  );
  let report = Report::new(error);
  if unreachable {
    report.wrap_err(format!("Could not reach the task server at {}", tasks.base_url()))
  } else {
    report
  }
}

fn format_task(task: &Task) -> String {
  let mark = if task.is_done() { "[x]" } else { "[ ]" };
  match task.status.as_deref() {
    Some(status) if !task.is_done() => {
      format!("{} #{} {} ({})", mark, task.task_id, task.name(), status)
    }
    _ => format!("{} #{} {}", mark, task.task_id, task.name()),
  }
}
