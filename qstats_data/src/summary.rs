//! The two tables of the console report: slot usage per queue and job counts per user.

use std::{
    cmp::Reverse,
    collections::{BTreeMap, BTreeSet},
};

use chrono::{Duration, NaiveDateTime};
use itertools::Itertools as _;

use crate::{
    job::{Job, JobState},
    queue::QueueSummary,
    sge::SgeUser,
};

/// `JAT_prio` is normalized to 0..1, scaled up to make differences readable.
pub const PRIORITY_SCALE: f64 = 200.;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueColumn {
    Available,
    Used,
    Total,
    Unknown,
    Error,
}

impl QueueColumn {
    pub const ALL: [QueueColumn; 5] = [
        QueueColumn::Available,
        QueueColumn::Used,
        QueueColumn::Total,
        QueueColumn::Unknown,
        QueueColumn::Error,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            QueueColumn::Available => "available",
            QueueColumn::Used => "used",
            QueueColumn::Total => "total",
            QueueColumn::Unknown => "unknown",
            QueueColumn::Error => "error",
        }
    }

    pub fn value(&self, queue: &QueueSummary) -> u64 {
        match self {
            QueueColumn::Available => queue.available,
            QueueColumn::Used => queue.used,
            QueueColumn::Total => queue.total,
            QueueColumn::Unknown => queue.unknown,
            QueueColumn::Error => queue.error,
        }
    }
}

/// Requested queues, least used first, without the columns that are zero everywhere.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueStatusTable {
    pub columns: Vec<QueueColumn>,
    pub rows: Vec<QueueSummary>,
}

impl QueueStatusTable {
    pub fn build(queues: &[QueueSummary], requested: &[String]) -> Self {
        let rows = queues
            .iter()
            .filter(|queue| requested.contains(&queue.name))
            .sorted_by_key(|queue| queue.used)
            .cloned()
            .collect_vec();
        let columns = QueueColumn::ALL
            .into_iter()
            .filter(|column| rows.iter().map(|queue| column.value(queue)).sum::<u64>() > 0)
            .collect();
        QueueStatusTable { columns, rows }
    }
}

/// What one user has going on in one queue.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueActivity {
    /// slots of running jobs
    pub running: u64,
    /// slots of pending jobs
    pub pending: u64,
    /// wall time of running jobs so far, `None` without running jobs
    pub duration_min: Option<Duration>,
    pub duration_mean: Option<Duration>,
    pub duration_max: Option<Duration>,
    /// highest scaled priority of the pending jobs, `None` without pending jobs
    pub priority_max: Option<f64>,
}

impl QueueActivity {
    fn from_jobs(jobs: &[&Job], now: NaiveDateTime) -> Self {
        let (running, pending): (Vec<&Job>, Vec<&Job>) =
            jobs.iter().copied().partition(|job| job.state == JobState::Running);

        let durations = running
            .iter()
            .map(|job| job.start_time.map(|start| now - start).unwrap_or_else(Duration::zero))
            .collect_vec();
        let duration_mean = match durations.len() {
            0 => None,
            len => Some(Duration::seconds(
                durations.iter().map(Duration::num_seconds).sum::<i64>() / len as i64,
            )),
        };

        QueueActivity {
            running: running.iter().map(|job| job.slots).sum(),
            pending: pending.iter().map(|job| job.slots).sum(),
            duration_min: durations.iter().min().copied(),
            duration_mean,
            duration_max: durations.iter().max().copied(),
            priority_max: pending
                .iter()
                .map(|job| job.priority * PRIORITY_SCALE)
                .max_by(f64::total_cmp),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserSummary {
    pub user: SgeUser,
    /// one entry per column queue of the table, `None` if the user has no jobs there
    pub queues: Vec<Option<QueueActivity>>,
}

/// Running/pending jobs per user, one column group per requested queue.
#[derive(Debug, Clone, PartialEq)]
pub struct JobSummaryTable {
    /// requested queues that have at least one job, in the order they were asked for
    pub queues: Vec<String>,
    pub rows: Vec<UserSummary>,
}

impl JobSummaryTable {
    /// Finished and failed jobs are ignored, as are jobs that didn't ask for a queue. Rows are
    /// sorted by running slots in the first requested queue, busiest first, users without jobs
    /// there last.
    pub fn build(jobs: &[Job], requested: &[String], now: NaiveDateTime) -> Self {
        let mut groups = BTreeMap::<(&SgeUser, &str), Vec<&Job>>::new();
        for job in jobs
            .iter()
            .filter(|job| matches!(job.state, JobState::Running | JobState::Pending))
        {
            if let Some(queue) = job.hard_req_queue.as_deref() {
                groups.entry((&job.owner, queue)).or_default().push(job);
            }
        }

        let queues = requested
            .iter()
            .filter(|requested| groups.keys().any(|(_, queue)| *queue == requested.as_str()))
            .cloned()
            .collect_vec();
        let users: BTreeSet<&SgeUser> = groups.keys().map(|(user, _)| *user).collect();

        let mut rows = users
            .into_iter()
            .map(|user| UserSummary {
                user: user.clone(),
                queues: queues
                    .iter()
                    .map(|queue| {
                        groups
                            .get(&(user, queue.as_str()))
                            .map(|jobs| QueueActivity::from_jobs(jobs, now))
                    })
                    .collect(),
            })
            .collect_vec();

        let sort_queue = requested.first().and_then(|first| queues.iter().position(|queue| queue == first));
        if let Some(index) = sort_queue {
            rows.sort_by_key(|row| Reverse(row.queues[index].as_ref().map(|activity| activity.running)));
        }

        JobSummaryTable { queues, rows }
    }
}
