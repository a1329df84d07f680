use crate::cache::{CacheResult, CacheSource, QueryStatus};
use crate::query::{Query, QueryState};
use crate::tasks::{CachedTaskClient, Task};
use crate::ui::components::{KeyResult, PriorityEvent, PriorityTabs};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{status_color, task_name_style, truncate};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::TaskDetailView;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};

type TaskQuery = Query<String, CacheResult<Vec<Task>>>;

/// View for displaying the tasks of one priority at a time
pub struct TaskListView {
  tasks: CachedTaskClient,
  tabs: PriorityTabs,
  query: TaskQuery,
  list_state: ListState,
}

impl TaskListView {
  pub fn new(tasks: CachedTaskClient, priorities: Vec<String>, initial: &str) -> Self {
    let tabs = PriorityTabs::new(priorities, initial);

    let client = tasks.clone();
    let mut query = Query::new(move |priority: String| {
      let client = client.clone();
      async move {
        client
          .get_with_meta(&priority)
          .await
          .map_err(|e| error_chain(&e))
      }
    });

    // Start fetching immediately
    query.fetch(tabs.selected().to_string());

    Self {
      tasks,
      tabs,
      query,
      list_state: ListState::default(),
    }
  }

  fn tasks(&self) -> &[Task] {
    self
      .query
      .latest_data()
      .map(|result| result.data.as_slice())
      .unwrap_or(&[])
  }

  fn priority(&self) -> &str {
    self.tabs.selected()
  }

  fn select_priority(&mut self, priority: String) {
    self.list_state = ListState::default();
    self.query.fetch(priority);
  }

  fn refresh(&mut self) {
    self.tasks.invalidate(self.priority());
    self.query.refetch();
  }

  /// Forget every priority's tasks, then reload the current one
  fn reload_all(&mut self) {
    self.tasks.clear();
    self.query.refetch();
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect) {
    let len = self.tasks().len();
    ensure_valid_selection(&mut self.list_state, len);

    let title = match self.query.state() {
      QueryState::Loading => format!(" Tasks [{}] (loading...) ", self.priority()),
      QueryState::Error(_) => format!(" Tasks [{}] (error) ", self.priority()),
      _ => format!(" Tasks [{}] ({}) ", self.priority(), len),
    };

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if let Some(error) = self.query.error() {
      let paragraph = Paragraph::new(vec![
        Line::styled(format!("Error: {}", error), Style::default().fg(Color::Red)),
        Line::raw(""),
        Line::styled(
          "Press 'r' to retry.",
          Style::default().fg(Color::DarkGray),
        ),
      ])
      .block(block)
      .wrap(Wrap { trim: false });
      frame.render_widget(paragraph, area);
      return;
    }

    if len == 0 {
      let content = if self.query.is_loading() {
        ""
      } else {
        "No tasks found."
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let items: Vec<ListItem> = self
      .tasks()
      .iter()
      .map(|task| ListItem::new(task_line(task)))
      .collect();

    let list = List::new(items)
      .block(block)
      .highlight_style(
        Style::default()
          .bg(Color::DarkGray)
          .add_modifier(Modifier::BOLD),
      )
      .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut self.list_state);
  }
}

/// An error and its causes, outermost first
fn error_chain(error: &dyn std::error::Error) -> String {
  let mut message = error.to_string();
  let mut source = error.source();
  while let Some(cause) = source {
    message.push_str(": ");
    message.push_str(&cause.to_string());
    source = cause.source();
  }
  message
}

/// One list row: id, name (crossed out when done), status
fn task_line(task: &Task) -> Line<'static> {
  let status = task.status.as_deref().unwrap_or("-");

  Line::from(vec![
    Span::styled(
      format!("#{:<6}", task.task_id),
      Style::default().fg(Color::Cyan),
    ),
    Span::styled(
      format!("{:<50}", truncate(task.name(), 50)),
      task_name_style(task.is_done()),
    ),
    Span::raw(" "),
    Span::styled(
      truncate(status, 12),
      Style::default().fg(status_color(status)),
    ),
  ])
}

impl View for TaskListView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    // Let the priority tabs try to handle first
    match self.tabs.handle_key(key) {
      KeyResult::Event(PriorityEvent::Changed(priority)) => {
        self.select_priority(priority);
        return ViewAction::None;
      }
      KeyResult::Handled => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    match key.code {
      KeyCode::Char('j') | KeyCode::Down => {
        self.list_state.select_next();
      }
      KeyCode::Char('k') | KeyCode::Up => {
        self.list_state.select_previous();
      }
      KeyCode::Char('r') => self.refresh(),
      KeyCode::Char('R') => self.reload_all(),
      KeyCode::Enter => {
        if let Some(task) = self
          .list_state
          .selected()
          .and_then(|idx| self.tasks().get(idx))
        {
          return ViewAction::Push(Box::new(TaskDetailView::new(task.clone())));
        }
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Length(1), Constraint::Min(1)])
      .split(area);

    self.tabs.render(frame, chunks[0]);
    self.render_list(frame, chunks[1]);
  }

  fn breadcrumb_label(&self) -> String {
    format!("Tasks [{}]", self.priority())
  }

  fn status(&self) -> Option<String> {
    let result = self.query.latest_data()?;
    let source = match result.source {
      CacheSource::Network => "network",
      CacheSource::CacheFresh => "cache",
      CacheSource::CacheStale => "stale cache, refreshing",
    };
    Some(format!(
      "fetched {} ({})",
      result
        .fetched_at
        .with_timezone(&chrono::Local)
        .format("%H:%M:%S"),
      source
    ))
  }

  fn tick(&mut self) {
    self.query.poll();

    // A stale result started a background refresh; once it lands or fails,
    // query again so the new data or the error replaces the stale list
    let showing_stale = self
      .query
      .data()
      .is_some_and(|result| result.source == CacheSource::CacheStale);
    if showing_stale {
      match self.tasks.status(self.priority()) {
        QueryStatus::Fresh | QueryStatus::Failed => self.query.refetch(),
        _ => {}
      }
    }
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("tab", "priority").with_priority(10),
      ShortcutInfo::new("1-9", "jump").with_priority(20),
      ShortcutInfo::new("r", "refresh").with_priority(30),
      ShortcutInfo::new("R", "reload all").with_priority(35).hidden(),
      ShortcutInfo::new("enter", "details").with_priority(40),
      ShortcutInfo::new("j/k", "move").with_priority(50).hidden(),
      ShortcutInfo::new("q", "quit").with_priority(90),
    ]
  }
}
