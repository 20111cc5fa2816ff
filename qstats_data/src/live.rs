//! Running and pending jobs, straight from `qstat -g dt`.

use std::{process::Command, time::Duration};

use log::debug;
use serde::Deserialize;

use crate::{
    command::{run_command, CommandOutput},
    error::{Error, Result},
    job::{sort_jobs, Job, JobSource, RawJob},
    settings::Settings,
    DEFAULT_TIMEOUT,
};

/// `qstat -xml -ext -r -urg -g dt -u "*"`: every job of every user, one line per array task.
pub const JOB_INFO_ARGS: [&str; 8] = ["-xml", "-ext", "-r", "-urg", "-g", "dt", "-u", "*"];

/// Handle on the `qstat` binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Qstat {
    pub program: String,
    pub timeout: Duration,
}

impl Default for Qstat {
    fn default() -> Self {
        Qstat {
            program: "qstat".to_owned(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl Qstat {
    pub fn from_settings(settings: &Settings) -> Self {
        Qstat {
            program: settings.qstat.clone(),
            timeout: *settings.command_timeout,
        }
    }

    pub(crate) fn query(&self, args: &[&str]) -> Result<CommandOutput> {
        let mut command = Command::new(&self.program);
        command.args(args);
        let output = run_command(&mut command, self.timeout)?;
        if output.stdout.trim().is_empty() {
            return Err(Error::MissingSection {
                section: "job_info",
                stderr: output.stderr.trim().to_owned(),
            });
        }
        Ok(output)
    }

    /// Running and pending jobs of all users. Filtering by user is up to the caller.
    pub fn pending_jobs(&self) -> Result<Vec<Job>> {
        let output = self.query(&JOB_INFO_ARGS)?;
        parse_job_info(&output.stdout).map_err(|error| with_stderr(error, &output))
    }
}

/// Attach the command's stderr to a missing-section error, it usually says why.
pub(crate) fn with_stderr(error: Error, output: &CommandOutput) -> Error {
    match error {
        Error::MissingSection { section, .. } => Error::MissingSection {
            section,
            stderr: output.stderr.trim().to_owned(),
        },
        error => error,
    }
}

#[derive(Debug, Deserialize)]
struct JobInfoDocument {
    queue_info: Option<JobList>,
    job_info: Option<JobList>,
}

#[derive(Debug, Default, Deserialize)]
struct JobList {
    #[serde(rename = "job_list", default)]
    jobs: Vec<RawJob>,
}

/// Parse `qstat -xml -g dt` output into the unified job table: running jobs, then pending ones,
/// sorted by job number and task.
///
/// An empty or missing pending section just means nothing is queued. A document without the
/// running section (`queue_info`) is not `qstat -g dt` output and is rejected.
pub fn parse_job_info(xml: &str) -> Result<Vec<Job>> {
    let document: JobInfoDocument = quick_xml::de::from_str(xml)?;

    let running = document
        .queue_info
        .ok_or(Error::MissingSection {
            section: "job_info.queue_info",
            stderr: String::new(),
        })?
        .jobs;
    let pending = document.job_info.unwrap_or_default().jobs;
    debug!("qstat reported {} running and {} pending jobs", running.len(), pending.len());

    let mut jobs = running
        .into_iter()
        .map(|raw| raw.normalize(JobSource::Running))
        .chain(pending.into_iter().map(|raw| raw.normalize(JobSource::Pending)))
        .collect::<Result<Vec<_>>>()?;
    sort_jobs(&mut jobs);
    Ok(jobs)
}

/// [`Qstat::pending_jobs`] with the default `qstat` on `PATH`.
pub fn pending_jobs() -> Result<Vec<Job>> {
    Qstat::default().pending_jobs()
}
