use std::{fmt, str::FromStr};

use chrono::NaiveDateTime;
use derive_more::derive::{Deref, Display, From};
use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    sge::{datetime_from_epoch, parse_xml_datetime, SgeUser},
};

/// Column names of the unified job table, in order. Every job source gets projected onto these.
pub const JOB_COLUMNS: [&str; 20] = [
    "@state",
    "JB_job_number",
    "JAT_prio",
    "JB_name",
    "JB_owner",
    "state",
    "JB_submission_time",
    "JAT_start_time",
    "JAT_end_time",
    "cpu_usage",
    "mem_usage",
    "io_usage",
    "queue_name",
    "slots",
    "tasks",
    "full_job_name",
    "exit_status",
    "failed",
    "maxvmem",
    "hard_req_queue",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Pending,
    Running,
    Finished,
    Failed,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Pending => "pending",
            JobState::Running => "running",
            JobState::Finished => "finished",
            JobState::Failed => "failed",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "pending" => Ok(JobState::Pending),
            "running" => Ok(JobState::Running),
            "finished" => Ok(JobState::Finished),
            "failed" => Ok(JobState::Failed),
            other => Err(Error::UnknownState(other.to_owned())),
        }
    }
}

/// The short state letters SGE prints (`r`, `qw`, `Eqw`, `hqw`, `t`, ... plus `f`/`F` for
/// finished/failed accounting records). Kept verbatim, only used for display and grouping.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deref, Display, From, Serialize)]
pub struct StateCode(pub String);

/// One row of the unified job table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Job {
    #[serde(rename = "@state")]
    pub state: JobState,
    #[serde(rename = "JB_job_number")]
    pub job_number: u64,
    #[serde(rename = "JAT_prio")]
    pub priority: f64,
    #[serde(rename = "JB_name")]
    pub name: String,
    #[serde(rename = "JB_owner")]
    pub owner: SgeUser,
    #[serde(rename = "state")]
    pub state_code: StateCode,
    #[serde(rename = "JB_submission_time")]
    pub submission_time: Option<NaiveDateTime>,
    #[serde(rename = "JAT_start_time")]
    pub start_time: Option<NaiveDateTime>,
    #[serde(rename = "JAT_end_time")]
    pub end_time: Option<NaiveDateTime>,
    pub cpu_usage: Option<f64>,
    pub mem_usage: Option<f64>,
    pub io_usage: Option<f64>,
    pub queue_name: Option<String>,
    pub slots: u64,
    pub tasks: u64,
    pub full_job_name: Option<String>,
    pub exit_status: u64,
    pub failed: u64,
    pub maxvmem: Option<f64>,
    pub hard_req_queue: Option<String>,
}

impl Job {
    /// Queue the job asked for, without a `@host` part (`hep.q@node01` -> `hep.q`).
    pub fn requested_queue(&self) -> Option<&str> {
        self.hard_req_queue
            .as_deref()
            .and_then(|queue| queue.split('@').next())
            .filter(|queue| !queue.is_empty())
    }
}

/// Where a row came from. Decides which columns the source can't know about and therefore get
/// filled with defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobSource {
    /// `job_info.queue_info.job_list` of `qstat -g dt`
    Running,
    /// `job_info.job_info.job_list` of `qstat -g dt`
    Pending,
    /// a line of the accounting file
    Accounting,
}

/// A job row before casting. Field names match the `qstat -xml` elements, the accounting reader
/// fills the same struct from its colon separated fields.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawJob {
    #[serde(rename = "@state")]
    pub state: Option<String>,
    #[serde(rename = "JB_job_number")]
    pub job_number: Option<String>,
    #[serde(rename = "JAT_prio")]
    pub priority: Option<String>,
    #[serde(rename = "JB_name")]
    pub name: Option<String>,
    #[serde(rename = "JB_owner")]
    pub owner: Option<String>,
    #[serde(rename = "state")]
    pub state_code: Option<String>,
    #[serde(rename = "JB_submission_time")]
    pub submission_time: Option<String>,
    #[serde(rename = "JAT_start_time")]
    pub start_time: Option<String>,
    #[serde(rename = "JAT_end_time")]
    pub end_time: Option<String>,
    pub cpu_usage: Option<String>,
    pub mem_usage: Option<String>,
    pub io_usage: Option<String>,
    pub queue_name: Option<String>,
    pub slots: Option<String>,
    pub tasks: Option<String>,
    pub full_job_name: Option<String>,
    pub exit_status: Option<String>,
    pub failed: Option<String>,
    pub maxvmem: Option<String>,
    /// One entry per queue given to `qsub -q`, in request order.
    #[serde(rename = "hard_req_queue", default)]
    pub hard_req_queues: Vec<String>,
}

impl RawJob {
    /// Fill in what `source` doesn't provide, then cast every column to its canonical type.
    pub fn normalize(self, source: JobSource) -> Result<Job> {
        use JobSource::*;

        let state = match (non_empty(self.state), source) {
            (Some(state), _) => state.parse()?,
            (None, Running) => JobState::Running,
            (None, Pending) => JobState::Pending,
            (None, Accounting) => return Err(Error::Missing { column: "@state" }),
        };

        let (submission_time, start_time, end_time) = match source {
            Running => (None, timestamp("JAT_start_time", self.start_time, source)?, None),
            Pending => (timestamp("JB_submission_time", self.submission_time, source)?, None, None),
            Accounting => (
                timestamp("JB_submission_time", self.submission_time, source)?,
                timestamp("JAT_start_time", self.start_time, source)?,
                timestamp("JAT_end_time", self.end_time, source)?,
            ),
        };

        let (cpu_usage, mem_usage, io_usage) = match source {
            Pending => (Some(0.), Some(0.), Some(0.)),
            Running | Accounting => (
                optional_float("cpu_usage", self.cpu_usage)?,
                optional_float("mem_usage", self.mem_usage)?,
                optional_float("io_usage", self.io_usage)?,
            ),
        };

        let (exit_status, failed, maxvmem) = match source {
            Running | Pending => (0, 0, None),
            Accounting => (
                unsigned("exit_status", self.exit_status)?,
                unsigned("failed", self.failed)?,
                optional_float("maxvmem", self.maxvmem)?,
            ),
        };

        Ok(Job {
            state,
            job_number: unsigned("JB_job_number", self.job_number)?,
            priority: float("JAT_prio", self.priority)?,
            name: required("JB_name", self.name)?,
            owner: SgeUser(required("JB_owner", self.owner)?),
            state_code: StateCode(required("state", self.state_code)?),
            submission_time,
            start_time,
            end_time,
            cpu_usage,
            mem_usage,
            io_usage,
            queue_name: non_empty(self.queue_name),
            slots: unsigned("slots", self.slots)?,
            tasks: task_count(self.tasks)?,
            full_job_name: non_empty(self.full_job_name),
            exit_status,
            failed,
            maxvmem,
            hard_req_queue: self.hard_req_queues.into_iter().find_map(|queue| non_empty(Some(queue))),
        })
    }
}

/// Stable sort by job number, then task.
pub fn sort_jobs(jobs: &mut [Job]) {
    jobs.sort_by_key(|job| (job.job_number, job.tasks));
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn required(column: &'static str, value: Option<String>) -> Result<String> {
    non_empty(value).ok_or(Error::Missing { column })
}

fn unsigned(column: &'static str, value: Option<String>) -> Result<u64> {
    let value = required(column, value)?;
    value.parse().map_err(|_| Error::cast(column, value, "u64"))
}

fn float(column: &'static str, value: Option<String>) -> Result<f64> {
    let value = required(column, value)?;
    value.parse().map_err(|_| Error::cast(column, value, "f64"))
}

fn optional_float(column: &'static str, value: Option<String>) -> Result<Option<f64>> {
    non_empty(value)
        .map(|value| value.parse().map_err(|_| Error::cast(column, value, "f64")))
        .transpose()
}

/// `tasks` is a plain task id for running array tasks, but pending array jobs report the whole
/// range (`1-100:1`) or a list (`3,5,7`). Those count as their first task.
fn task_count(value: Option<String>) -> Result<u64> {
    let Some(value) = non_empty(value) else {
        return Ok(0);
    };
    let first = value
        .split(|c: char| c == '-' || c == ',' || c == ':')
        .next()
        .unwrap_or_default();
    first.parse().map_err(|_| Error::cast("tasks", value.clone(), "u64"))
}

/// Epoch values above this are milliseconds (newer Univa accounting files).
const EPOCH_MILLIS_THRESHOLD: i64 = 100_000_000_000;

fn timestamp(column: &'static str, value: Option<String>, source: JobSource) -> Result<Option<NaiveDateTime>> {
    let Some(value) = non_empty(value) else {
        return Ok(None);
    };
    match source {
        JobSource::Accounting => {
            let secs: i64 = value
                .parse()
                .map_err(|_| Error::cast(column, value.clone(), "epoch seconds"))?;
            let secs = if secs > EPOCH_MILLIS_THRESHOLD { secs / 1000 } else { secs };
            Ok(datetime_from_epoch(secs))
        }
        JobSource::Running | JobSource::Pending => parse_xml_datetime(&value)
            .map(Some)
            .ok_or_else(|| Error::cast(column, value, "datetime")),
    }
}
