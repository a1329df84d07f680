use crossterm::event::{self, Event as CrosstermEvent, KeyEvent, KeyEventKind};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::warn;

/// Application events
#[derive(Debug)]
pub enum Event {
  /// Terminal key press
  Key(KeyEvent),
  /// Terminal was resized; the next draw picks up the new size
  Resize,
  /// Periodic tick for UI refresh and query polling
  Tick,
}

/// Event handler that produces events from terminal input and a tick timer
pub struct EventHandler {
  rx: mpsc::UnboundedReceiver<Event>,
}

impl EventHandler {
  /// Create a new event handler with the given tick rate
  pub fn new(tick_rate: Duration) -> Self {
    let (tx, rx) = mpsc::unbounded_channel();

    // crossterm's poll/read block, so keep them off the async workers
    tokio::task::spawn_blocking(move || {
      let mut last_tick = Instant::now();

      loop {
        // Ticks keep coming while keys are held down
        let timeout = tick_rate.saturating_sub(last_tick.elapsed());

        let event = match event::poll(timeout) {
          Ok(true) => match event::read() {
            // Ignore key release/repeat events reported by some terminals
            Ok(CrosstermEvent::Key(key)) if key.kind == KeyEventKind::Press => Some(Event::Key(key)),
            Ok(CrosstermEvent::Resize(_, _)) => Some(Event::Resize),
            Ok(_) => None,
            Err(e) => {
              warn!(error = %e, "failed to read terminal event");
              None
            }
          },
          Ok(false) => None,
          Err(e) => {
            warn!(error = %e, "failed to poll terminal events");
            break;
          }
        };

        if let Some(event) = event {
          if tx.send(event).is_err() {
            break;
          }
        }

        if last_tick.elapsed() >= tick_rate {
          if tx.send(Event::Tick).is_err() {
            break;
          }
          last_tick = Instant::now();
        }
      }
    });

    Self { rx }
  }

  /// Receive the next event
  pub async fn next(&mut self) -> Option<Event> {
    self.rx.recv().await
  }
}
