pub mod accounting;
pub mod charts;
pub mod command;
pub mod error;
pub mod job;
pub mod live;
pub mod queue;
pub mod settings;
pub mod sge;
pub mod summary;

pub mod misc {
    pub mod parsing;
}

use std::{path::Path, time::Duration};

use log::debug;

pub use accounting::finished_jobs;
pub use error::{Error, Result};
pub use job::{Job, JobState};
pub use live::{pending_jobs, Qstat};
pub use queue::{queue_status, QueueSummary};
pub use settings::Settings;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Running and pending jobs from `qstat`, followed by finished and failed jobs from the
/// accounting file at `accounting_file`.
pub fn all_jobs(qstat: &Qstat, accounting_file: impl AsRef<Path>) -> Result<Vec<Job>> {
    let mut jobs = qstat.pending_jobs()?;
    let finished = finished_jobs(accounting_file)?;
    debug!("{} live and {} finished jobs", jobs.len(), finished.len());
    jobs.extend(finished);
    Ok(jobs)
}

/// Keep jobs of the given owners that requested one of the given queues. An empty list doesn't
/// filter. Queues are compared without their `@host` part.
pub fn filter_jobs(jobs: Vec<Job>, users: &[String], queues: &[String]) -> Vec<Job> {
    jobs.into_iter()
        .filter(|job| users.is_empty() || users.iter().any(|user| user == job.owner.as_str()))
        .filter(|job| {
            queues.is_empty()
                || job
                    .requested_queue()
                    .is_some_and(|requested| queues.iter().any(|queue| queue == requested))
        })
        .collect()
}
