use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

use crate::ui::view::{ShortcutInfo, ShortcutVisibility};

/// Draw the header bar with logo, server, and shortcuts
pub fn draw_header(frame: &mut Frame, area: Rect, server_url: &str, shortcuts: &[ShortcutInfo]) {
  let mut spans = vec![
    Span::styled(" taskq ", Style::default().fg(Color::Cyan).bold()),
    Span::styled("│", Style::default().fg(Color::DarkGray)),
    Span::styled(
      format!(" {} ", extract_host(server_url)),
      Style::default().fg(Color::White),
    ),
    Span::raw(" "),
  ];

  // Shortcuts - keys and brackets highlighted, descriptions dimmed
  let mut shortcuts: Vec<&ShortcutInfo> = shortcuts
    .iter()
    .filter(|s| s.visibility == ShortcutVisibility::Always)
    .collect();
  shortcuts.sort_by_key(|s| s.priority);

  for shortcut in shortcuts {
    spans.push(Span::raw("  "));
    spans.push(Span::styled(
      format!("<{}>", shortcut.key),
      Style::default().fg(Color::Cyan),
    ));
    spans.push(Span::styled(
      format!(" {}", shortcut.label),
      Style::default().fg(Color::DarkGray),
    ));
  }

  let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));

  frame.render_widget(paragraph, area);
}

/// Extract host[:port] from the server URL
fn extract_host(url: &str) -> &str {
  url
    .strip_prefix("https://")
    .or_else(|| url.strip_prefix("http://"))
    .unwrap_or(url)
    .split('/')
    .next()
    .unwrap_or(url)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_extract_host() {
    assert_eq!(extract_host("http://localhost:3000"), "localhost:3000");
    assert_eq!(
      extract_host("https://tasks.example.com/api/"),
      "tasks.example.com"
    );
    assert_eq!(extract_host("localhost"), "localhost");
  }
}
