mod cli;
mod render;

use std::{fs, io::Write as _, path::PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use log::{debug, info, LevelFilter};
use qstats_data::{
    charts::{load_display_names, pending_bars, running_wedges, DisplayNames},
    Qstat, Settings,
};
use render::QueueTab;

fn main() -> Result<()> {
    let args = cli::Args::parse();
    init_logger(args.log_level);

    let settings = read_config(args.config)?;
    let queues = args.queue.unwrap_or_else(|| settings.queues.clone());

    let qstat = Qstat::from_settings(&settings);
    let summaries = qstat.queue_status().context("querying queue summary")?;
    let jobs = qstat.pending_jobs().context("querying jobs")?;
    info!("{} queues, {} jobs", summaries.len(), jobs.len());

    let names = match &settings.users_file {
        Some(path) => load_display_names(path)
            .with_context(|| format!("reading display names from {}", path.display()))?,
        None => DisplayNames::new(),
    };

    let wedges = running_wedges(&jobs, &summaries, &names);
    let bars = pending_bars(&jobs, &names);
    debug!("{} pie wedges, {} bars", wedges.len(), bars.len());

    let tabs = queues
        .iter()
        .map(|queue| QueueTab::new(queue, &wedges, &bars).with_context(|| format!("drawing charts for {queue}")))
        .collect::<Result<Vec<_>>>()?;
    let page = render::page(&tabs, Local::now().naive_local());

    fs::write(&args.filename, page.into_string())
        .with_context(|| format!("writing {}", args.filename.display()))?;
    info!("Wrote {}", args.filename.display());
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
