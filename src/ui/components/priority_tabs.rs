use super::KeyResult;
use crate::ui::renderfns::priority_color;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::prelude::*;
use ratatui::widgets::Tabs;

/// Events emitted by the priority tabs that the parent needs to handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PriorityEvent {
  /// A different priority was selected
  Changed(String),
}

/// Tab strip for choosing which priority's tasks to show
#[derive(Debug, Clone)]
pub struct PriorityTabs {
  priorities: Vec<String>,
  selected: usize,
}

impl PriorityTabs {
  /// Create tabs for `priorities`, selecting `initial` if present.
  pub fn new(priorities: Vec<String>, initial: &str) -> Self {
    let selected = priorities.iter().position(|p| p == initial).unwrap_or(0);
    Self {
      priorities,
      selected,
    }
  }

  /// The currently selected priority
  pub fn selected(&self) -> &str {
    self
      .priorities
      .get(self.selected)
      .map(String::as_str)
      .unwrap_or_default()
  }

  fn select(&mut self, index: usize) -> KeyResult<PriorityEvent> {
    if index >= self.priorities.len() {
      return KeyResult::Handled;
    }
    if index == self.selected {
      return KeyResult::Handled;
    }
    self.selected = index;
    KeyResult::Event(PriorityEvent::Changed(self.selected().to_string()))
  }

  /// Handle a key event
  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<PriorityEvent> {
    let len = self.priorities.len();
    if len == 0 {
      return KeyResult::NotHandled;
    }

    match key.code {
      KeyCode::Tab | KeyCode::Right | KeyCode::Char('l') => self.select((self.selected + 1) % len),
      KeyCode::BackTab | KeyCode::Left | KeyCode::Char('h') => {
        self.select((self.selected + len - 1) % len)
      }
      KeyCode::Char(c) if c.is_ascii_digit() && !key.modifiers.contains(KeyModifiers::CONTROL) => {
        match c.to_digit(10) {
          Some(n) if n >= 1 => self.select(n as usize - 1),
          _ => KeyResult::NotHandled,
        }
      }
      _ => KeyResult::NotHandled,
    }
  }

  pub fn render(&self, frame: &mut Frame, area: Rect) {
    let titles: Vec<Line> = self
      .priorities
      .iter()
      .enumerate()
      .map(|(i, p)| {
        Line::from(vec![
          Span::styled(format!("{} ", i + 1), Style::default().fg(Color::DarkGray)),
          Span::styled(p.clone(), Style::default().fg(priority_color(p))),
        ])
      })
      .collect();

    let tabs = Tabs::new(titles)
      .select(self.selected)
      .highlight_style(Style::default().add_modifier(Modifier::BOLD | Modifier::REVERSED))
      .divider(Span::styled("│", Style::default().fg(Color::DarkGray)));

    frame.render_widget(tabs, area);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn tabs() -> PriorityTabs {
    PriorityTabs::new(
      vec!["High".to_string(), "Medium".to_string(), "Low".to_string()],
      "Medium",
    )
  }

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  #[test]
  fn test_initial_selection() {
    assert_eq!(tabs().selected(), "Medium");

    let unknown = PriorityTabs::new(vec!["High".to_string()], "Nope");
    assert_eq!(unknown.selected(), "High");
  }

  #[test]
  fn test_tab_wraps_around() {
    let mut tabs = tabs();
    assert_eq!(
      tabs.handle_key(key(KeyCode::Tab)),
      KeyResult::Event(PriorityEvent::Changed("Low".to_string()))
    );
    assert_eq!(
      tabs.handle_key(key(KeyCode::Tab)),
      KeyResult::Event(PriorityEvent::Changed("High".to_string()))
    );
    assert_eq!(
      tabs.handle_key(key(KeyCode::BackTab)),
      KeyResult::Event(PriorityEvent::Changed("Low".to_string()))
    );
  }

  #[test]
  fn test_digit_selects_directly() {
    let mut tabs = tabs();
    assert_eq!(
      tabs.handle_key(key(KeyCode::Char('1'))),
      KeyResult::Event(PriorityEvent::Changed("High".to_string()))
    );
    // Re-selecting the current tab is not a change
    assert_eq!(tabs.handle_key(key(KeyCode::Char('1'))), KeyResult::Handled);
    // Out of range is swallowed
    assert_eq!(tabs.handle_key(key(KeyCode::Char('9'))), KeyResult::Handled);
    assert_eq!(tabs.selected(), "High");
    assert_eq!(tabs.handle_key(key(KeyCode::Char('0'))), KeyResult::NotHandled);
  }

  #[test]
  fn test_other_keys_not_handled() {
    let mut tabs = tabs();
    assert_eq!(tabs.handle_key(key(KeyCode::Char('j'))), KeyResult::NotHandled);
    assert_eq!(tabs.selected(), "Medium");
  }
}
