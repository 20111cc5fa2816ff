//! Finished and failed jobs from the SGE accounting file.

use std::{fs, path::Path};

use itertools::Itertools as _;
use log::debug;

use crate::{
    error::{Error, Result},
    job::{Job, JobSource, RawJob},
};

/// Leading fields of an accounting line, in file order. Anything after these is ignored.
pub const ACCOUNTING_COLUMNS: [&str; 45] = [
    "qname",
    "hostname",
    "group",
    "JB_owner",
    "JB_name",
    "JB_job_number",
    "account",
    "JAT_prio",
    "JB_submission_time",
    "JAT_start_time",
    "JAT_end_time",
    "failed",
    "exit_status",
    "ru_wallclock",
    "ru_utime",
    "ru_stime",
    "ru_maxrss",
    "ru_ixrss",
    "ru_ismrss",
    "ru_idrss",
    "ru_isrss",
    "ru_minflt",
    "ru_majflt",
    "ru_nswap",
    "ru_inblock",
    "ru_oublock",
    "ru_msgsnd",
    "ru_msgrcv",
    "ru_nsignals",
    "ru_nvcsw",
    "ru_nivcsw",
    "project",
    "department",
    "granted_pe",
    "slots",
    "tasks",
    "cpu_usage",
    "mem_usage",
    "io_usage",
    "category",
    "iow",
    "pe_taskid",
    "maxvmem",
    "arid",
    "ar_submission_time",
];

/// One accounting line, split into its leading fields.
#[derive(Debug, Clone, Copy)]
struct Record<'a>([&'a str; ACCOUNTING_COLUMNS.len()]);

impl<'a> Record<'a> {
    fn parse(line_number: usize, line: &'a str) -> Result<Self> {
        let fields = line.split(':').take(ACCOUNTING_COLUMNS.len()).collect_vec();
        let fields: [&str; ACCOUNTING_COLUMNS.len()] = fields.try_into().map_err(|fields: Vec<&str>| Error::ShortRow {
            line: line_number,
            expected: ACCOUNTING_COLUMNS.len(),
            fields: fields.len(),
        })?;
        Ok(Record(fields))
    }

    fn get(&self, column: &str) -> &'a str {
        ACCOUNTING_COLUMNS
            .iter()
            .position(|name| *name == column)
            .map(|index| self.0[index])
            .unwrap_or_default()
    }

    fn field(&self, column: &str) -> Option<String> {
        Some(self.get(column).to_owned())
    }

    /// Non-zero `failed` or `exit_status` (compared as text, like SGE writes them) means failed.
    fn is_failure(&self) -> bool {
        self.get("failed").trim() != "0" || self.get("exit_status").trim() != "0"
    }

    fn into_raw(self) -> RawJob {
        let (state, state_code) = if self.is_failure() {
            ("failed", "F")
        } else {
            ("finished", "f")
        };
        RawJob {
            state: Some(state.to_owned()),
            job_number: self.field("JB_job_number"),
            priority: self.field("JAT_prio"),
            name: self.field("JB_name"),
            owner: self.field("JB_owner"),
            state_code: Some(state_code.to_owned()),
            submission_time: self.field("JB_submission_time"),
            start_time: self.field("JAT_start_time"),
            end_time: self.field("JAT_end_time"),
            cpu_usage: self.field("cpu_usage"),
            mem_usage: self.field("mem_usage"),
            io_usage: self.field("io_usage"),
            queue_name: Some(format!("{}@{}", self.get("qname"), self.get("hostname"))),
            slots: self.field("slots"),
            tasks: self.field("tasks"),
            full_job_name: self.field("JB_name"),
            exit_status: self.field("exit_status"),
            failed: self.field("failed"),
            maxvmem: self.field("maxvmem"),
            hard_req_queues: self.field("qname").into_iter().collect(),
        }
    }
}

/// Parse the contents of an accounting file. Comment (`#`) and blank lines are skipped, a line
/// with fewer than 45 fields fails the whole read.
pub fn parse_accounting(input: &str) -> Result<Vec<Job>> {
    input
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line))
        .filter(|(_, line)| !line.trim().is_empty() && !line.starts_with('#'))
        .map(|(line_number, line)| Record::parse(line_number, line)?.into_raw().normalize(JobSource::Accounting))
        .collect()
}

/// Finished and failed jobs from the accounting file at `path`, in file order.
pub fn finished_jobs(path: impl AsRef<Path>) -> Result<Vec<Job>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| Error::Accounting {
        path: path.to_owned(),
        source,
    })?;
    let jobs = parse_accounting(&content)?;
    debug!("Read {} finished jobs from {}", jobs.len(), path.display());
    Ok(jobs)
}
