use std::{
    io::{self, IsTerminal as _, Write},
    path::PathBuf,
};

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use log::{debug, info, LevelFilter};
use qstats_data::{
    summary::{JobSummaryTable, QueueStatusTable},
    Qstat, Settings,
};

mod render;

use render::TableFormat;

/// Slot usage per queue and running/pending jobs per user, from `qstat`.
#[derive(Debug, Clone, Parser)]
#[command(version, about)]
struct Args {
    /// users to highlight
    #[arg(short, long, env = "USER", value_delimiter = ',')]
    users: Vec<String>,
    /// queues to report on [default: from the settings]
    #[arg(short, long, value_delimiter = ',')]
    queue: Option<Vec<String>>,
    #[arg(short, long, value_enum, default_value_t)]
    format: TableFormat,
    #[arg(long, default_value_t = LevelFilter::Warn)]
    log_level: LevelFilter,
    /// settings file to use instead of ~/.config/qstats/config.toml
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logger(args.log_level);

    let settings = read_config(args.config)?;
    let queues = args.queue.unwrap_or_else(|| settings.queues.clone());
    debug!("Reporting on queues {queues:?}, highlighting {:?}", args.users);

    let qstat = Qstat::from_settings(&settings);
    let summaries = qstat.queue_status().context("querying queue summary")?;
    let jobs = qstat.pending_jobs().context("querying jobs")?;
    info!("{} queues, {} jobs", summaries.len(), jobs.len());

    let colorize = io::stdout().is_terminal();
    let queue_table = QueueStatusTable::build(&summaries, &queues);
    let job_table = JobSummaryTable::build(&jobs, &queues, Local::now().naive_local());

    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{}\n", render::queue_table(&queue_table, args.format, colorize))?;
    writeln!(
        stdout,
        "{}",
        render::job_table(&job_table, &args.users, args.format, colorize)
    )?;
    Ok(())
}

fn init_logger(level: LevelFilter) {
    env_logger::Builder::new()
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] - {}",
                Local::now().format("%Y-%m-%dT%H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .filter(None, level)
        .parse_default_env()
        .init();
}

fn read_config(file: Option<PathBuf>) -> Result<Settings> {
    info!("Loading config");
    match file {
        Some(file) => Settings::from_file(&file).with_context(|| format!("parsing config file {}", file.display())),
        None => Settings::new().context("parsing config file"),
    }
}
