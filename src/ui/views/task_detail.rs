use crate::tasks::Task;
use crate::ui::renderfns::{priority_color, status_color, task_name_style};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

/// Read-only view of a single task
pub struct TaskDetailView {
  task: Task,
  scroll: u16,
}

impl TaskDetailView {
  pub fn new(task: Task) -> Self {
    Self { task, scroll: 0 }
  }

  fn lines(&self) -> Vec<Line<'static>> {
    let label = |s: &'static str| Span::styled(format!("{:<12}", s), Style::default().fg(Color::DarkGray));
    let priority = self.task.priority.clone().unwrap_or_else(|| "-".to_string());
    let status = self.task.status.clone().unwrap_or_else(|| "-".to_string());

    let mut lines = vec![
      Line::from(vec![
        label("Name"),
        Span::styled(
          self.task.name().to_string(),
          task_name_style(self.task.is_done()).add_modifier(Modifier::BOLD),
        ),
      ]),
      Line::from(vec![
        label("Priority"),
        Span::styled(priority.clone(), Style::default().fg(priority_color(&priority))),
      ]),
      Line::from(vec![
        label("Status"),
        Span::styled(status.clone(), Style::default().fg(status_color(&status))),
      ]),
      Line::raw(""),
    ];

    match &self.task.description {
      Some(description) if !description.trim().is_empty() => {
        lines.extend(description.lines().map(|l| Line::raw(l.to_string())));
      }
      _ => lines.push(Line::styled(
        "No description.",
        Style::default().fg(Color::DarkGray),
      )),
    }

    lines
  }
}

impl View for TaskDetailView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => {
        self.scroll = self.scroll.saturating_add(1);
      }
      KeyCode::Char('k') | KeyCode::Up => {
        self.scroll = self.scroll.saturating_sub(1);
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let block = Block::default()
      .title(format!(" Task #{} ", self.task.task_id))
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let paragraph = Paragraph::new(self.lines())
      .block(block)
      .wrap(Wrap { trim: false })
      .scroll((self.scroll, 0));

    frame.render_widget(paragraph, area);
  }

  fn breadcrumb_label(&self) -> String {
    format!("#{}", self.task.task_id)
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("j/k", "scroll").with_priority(10),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }
}
