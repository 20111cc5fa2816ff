use std::path::PathBuf;

use clap::Parser;
use log::LevelFilter;

/// Running and queued slots per user and queue, as a static HTML page.
#[derive(Debug, Clone, PartialEq, Parser)]
#[command(version, about)]
pub struct Args {
    /// where to write the page
    #[arg(short, long, default_value = "index.html")]
    pub filename: PathBuf,
    /// queues to draw, one tab each [default: from the settings]
    #[arg(short, long, value_delimiter = ',')]
    pub queue: Option<Vec<String>>,
    #[arg(long, default_value_t = LevelFilter::Warn)]
    pub log_level: LevelFilter,
    /// settings file to use instead of ~/.config/qstats/config.toml
    #[arg(long)]
    pub config: Option<PathBuf>,
}
