mod analytics;
mod app;
mod cache;
mod commands;
mod config;
mod logging;
mod queue;
mod remote;
mod sync;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "station-sync")]
#[command(about = "Expiring cache and offline write queue for a fuel station dashboard")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/station-sync/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Queue every write instead of contacting the remote store
  #[arg(long)]
  offline: bool,

  /// Directory for log files (default: $XDG_DATA_HOME/station-sync/logs)
  #[arg(long)]
  log_dir: Option<PathBuf>,

  #[command(subcommand)]
  command: commands::Command,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  let log_dir = match args.log_dir {
    Some(dir) => dir,
    None => logging::default_dir()?,
  };
  let _log_guard = logging::init(&log_dir)?;

  // Load configuration
  let config = config::Config::load(args.config.as_deref())?;

  // Override offline mode if specified on command line
  let config = if args.offline {
    config::Config {
      sync: config::SyncConfig {
        offline: true,
        ..config.sync
      },
      ..config
    }
  } else {
    config
  };

  let app = app::App::new(config)?;
  app.run(args.command).await?;

  Ok(())
}
