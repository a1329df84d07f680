use ratatui::prelude::{Color, Modifier, Style};

use crate::tasks::types::STATUS_DONE;

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// Get the display color for a task status
pub fn status_color(status: &str) -> Color {
  match status {
    STATUS_DONE => Color::Green,
    "In Progress" => Color::Yellow,
    _ => Color::White,
  }
}

/// Style for a task's name: completed tasks are crossed out and dimmed
pub fn task_name_style(done: bool) -> Style {
  if done {
    Style::default()
      .fg(Color::DarkGray)
      .add_modifier(Modifier::CROSSED_OUT)
  } else {
    Style::default().fg(Color::White)
  }
}

/// Color for a priority label
pub fn priority_color(priority: &str) -> Color {
  match priority {
    "High" => Color::Red,
    "Medium" => Color::Yellow,
    "Low" => Color::Blue,
    _ => Color::White,
  }
}
