mod app;
mod cache;
mod config;
mod event;
mod plain;
mod query;
mod tasks;
mod ui;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "taskq")]
#[command(about = "A terminal client for browsing tasks by priority")]
#[command(version)]
struct Args {
  /// Path to config file (default: ./taskq.yaml or $XDG_CONFIG_HOME/taskq/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Base URL of the task server
  #[arg(short, long)]
  url: Option<String>,

  /// Priority to show first
  #[arg(short, long)]
  priority: Option<String>,

  /// Seconds a fetched list stays fresh
  #[arg(long)]
  stale_time: Option<f64>,

  /// Print the tasks for one priority and exit
  #[arg(long)]
  plain: bool,
}

impl Args {
  /// Apply command line overrides on top of the loaded config.
  fn apply(&self, mut config: config::Config) -> config::Config {
    if let Some(url) = &self.url {
      config.server.url = url.clone();
    }
    if let Some(secs) = self.stale_time {
      config.cache.stale_time_secs = secs;
    }
    if let Some(priority) = &self.priority {
      // Priorities are passed through verbatim, so an unlisted one gets its own tab
      if !config.priorities.contains(priority) {
        config.priorities.push(priority.clone());
      }
      config.default_priority = Some(priority.clone());
    }
    config
  }
}

/// Log to a daily file; stdout belongs to the TUI.
fn init_logging() -> WorkerGuard {
  let dir = dirs::data_local_dir()
    .unwrap_or_else(std::env::temp_dir)
    .join("taskq")
    .join("logs");
  let appender = tracing_appender::rolling::daily(dir, "taskq.log");
  let (writer, guard) = tracing_appender::non_blocking(appender);

  let filter = EnvFilter::try_from_env("TASKQ_LOG").unwrap_or_else(|_| EnvFilter::new("info"));

  tracing_subscriber::registry()
    .with(filter)
    .with(fmt::layer().with_writer(writer).with_ansi(false))
    .init();

  guard
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let _guard = init_logging();

  // Load configuration
  let config = args.apply(config::Config::load(args.config.as_deref())?);
  config.validate()?;

  let tasks = tasks::CachedTaskClient::new(&config)?;

  if args.plain {
    let mut stdout = std::io::stdout().lock();
    return plain::run(&tasks, config.initial_priority(), &mut stdout).await;
  }

  // Initialize and run the app
  let mut app = app::App::new(&config, tasks);
  app.run().await?;

  Ok(())
}
