use std::process::Command;

use color_eyre::Result;
use qstats_data::{Qstat, Settings};

fn are_we_on_sge_machine() -> bool {
    let success = Command::new("which")
        .arg("qstat")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false);
    if !success {
        eprintln!("No qstat found, SKIPPING");
    }
    success
}

#[test]
fn qstat_jobs_and_queues() -> Result<()> {
    if !are_we_on_sge_machine() {
        return Ok(());
    }
    // we can't know what the cluster is doing, only that querying and parsing works
    let qstat = Qstat::from_settings(&Settings::new()?);
    let jobs = qstat.pending_jobs()?;
    println!("{} jobs", jobs.len());
    let queues = qstat.queue_status()?;
    println!("{queues:?}");
    Ok(())
}
