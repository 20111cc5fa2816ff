//! Data behind the chart report: running slots per owner (pie) and pending slots per owner (bar).

use std::{
    cmp::Reverse,
    collections::HashMap,
    fmt,
    path::Path,
};

use config::{Config, File, FileFormat};
use itertools::Itertools as _;
use log::debug;

use crate::{
    error::Result,
    job::{Job, JobState},
    queue::QueueSummary,
    sge::SgeUser,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

pub const FREE_COLOR: Rgb = Rgb(0xd9, 0xd9, 0xd9);
pub const FREE_OWNER: &str = "free";
pub const FREE_NAME: &str = "Free";

/// Owners get these in order of their first job, wrapping around.
pub const PALETTE: [Rgb; 11] = [
    Rgb(0x80, 0xb1, 0xd3),
    Rgb(0xfb, 0x80, 0x72),
    Rgb(0xfd, 0xb4, 0x62),
    Rgb(0xb3, 0xde, 0x69),
    Rgb(0x8d, 0xd3, 0xc7),
    Rgb(0xff, 0xff, 0xb3),
    Rgb(0xbe, 0xba, 0xda),
    Rgb(0xfc, 0xcd, 0xe5),
    Rgb(0xbc, 0x80, 0xbd),
    Rgb(0xcc, 0xeb, 0xc5),
    Rgb(0xff, 0xed, 0x6f),
];

/// Login -> display name, from a YAML file of `login: Full Name` lines.
pub type DisplayNames = HashMap<String, String>;

/// A missing file is just an empty mapping.
pub fn load_display_names(path: &Path) -> Result<DisplayNames> {
    let names: DisplayNames = Config::builder()
        .add_source(File::new(&path.to_string_lossy(), FileFormat::Yaml).required(false))
        .build()?
        .try_deserialize()?;
    debug!("Loaded {} display names from {}", names.len(), path.display());
    Ok(names)
}

/// Slots of one owner (or the free slots) in one queue.
#[derive(Debug, Clone, PartialEq)]
pub struct Slice {
    pub queue: String,
    pub owner: String,
    pub name: String,
    pub color: Rgb,
    pub njobs: u64,
}

/// A pie slice with its share of the queue.
#[derive(Debug, Clone, PartialEq)]
pub struct Wedge {
    pub slice: Slice,
    pub frac: f64,
}

impl Wedge {
    /// Share of the queue in percent, what the pie labels show.
    pub fn prct(&self) -> f64 {
        100. * self.frac
    }
}

/// Available slots of every queue, as slices of the pseudo owner `free`.
pub fn free_slots(queues: &[QueueSummary]) -> Vec<Slice> {
    queues
        .iter()
        .map(|queue| Slice {
            queue: queue.name.clone(),
            owner: FREE_OWNER.to_owned(),
            name: FREE_NAME.to_owned(),
            color: FREE_COLOR,
            njobs: queue.available,
        })
        .collect()
}

/// Palette colour per owner, assigned in order of first appearance in `jobs`.
pub fn owner_colors(jobs: &[Job]) -> HashMap<&SgeUser, Rgb> {
    jobs.iter()
        .map(|job| &job.owner)
        .unique()
        .zip(PALETTE.iter().copied().cycle())
        .collect()
}

/// Slots in `state` summed per (queue, owner). The queue is the requested queue without host,
/// jobs that didn't request one are left out.
pub fn owner_slices(jobs: &[Job], state: JobState, names: &DisplayNames) -> Vec<Slice> {
    let colors = owner_colors(jobs);
    jobs.iter()
        .filter(|job| job.state == state)
        .filter_map(|job| Some(((job.requested_queue()?, &job.owner), job.slots)))
        .into_grouping_map()
        .sum()
        .into_iter()
        .sorted_by(|a, b| a.0.cmp(&b.0))
        .map(|((queue, owner), njobs)| Slice {
            queue: queue.to_owned(),
            owner: owner.to_string(),
            name: names.get(owner.as_str()).cloned().unwrap_or_else(|| owner.to_string()),
            color: colors.get(owner).copied().unwrap_or(PALETTE[0]),
            njobs,
        })
        .collect()
}

/// Order in which slices go around the pie, as 1-based labels for the slices sorted by size.
///
/// Start with the identity. Even `n`: the odd positions from 1 get the upper half, the even
/// positions from 2 the lower half without its first element. Odd `n`: the even positions from 2
/// get the upper half, the odd positions the lower half (without its first element) rotated right
/// by one. Then everything but the first and last position is reversed. Small and big slices end
/// up alternating, which keeps the small ones' labels apart.
pub fn pie_order(n: usize) -> Vec<usize> {
    if n == 0 {
        return vec![];
    }
    let identity = (1..=n).collect_vec();
    let mut order = identity.clone();
    let half = (n + 1) / 2;

    let (evens, odds) = if n % 2 == 0 {
        (identity[1..half].to_vec(), identity[half..].to_vec())
    } else {
        let mut lower = identity[1..half].to_vec();
        let shift = 1.min(lower.len());
        lower.rotate_right(shift);
        (identity[half..].to_vec(), lower)
    };
    for (position, label) in (2..n).step_by(2).zip(evens) {
        order[position] = label;
    }
    for (position, label) in (1..n).step_by(2).zip(odds) {
        order[position] = label;
    }

    if n > 2 {
        order[1..n - 1].reverse();
    }
    order
}

/// Running slots per owner plus free slots, per queue arranged by [`pie_order`], with each
/// wedge's share of its queue.
pub fn running_wedges(jobs: &[Job], queues: &[QueueSummary], names: &DisplayNames) -> Vec<Wedge> {
    let slices = owner_slices(jobs, JobState::Running, names)
        .into_iter()
        .chain(free_slots(queues))
        .sorted_by(|a, b| (&a.queue, a.njobs).cmp(&(&b.queue, b.njobs)))
        .collect_vec();

    slices
        .into_iter()
        .chunk_by(|slice| slice.queue.clone())
        .into_iter()
        .flat_map(|(_, group)| {
            let group = group.collect_vec();
            let total: u64 = group.iter().map(|slice| slice.njobs).sum();
            pie_order(group.len())
                .into_iter()
                .zip(group)
                .sorted_by_key(|(label, _)| *label)
                .map(move |(_, slice)| Wedge {
                    frac: if total == 0 { 0. } else { slice.njobs as f64 / total as f64 },
                    slice,
                })
        })
        .collect()
}

/// Pending slots per owner, biggest first.
pub fn pending_bars(jobs: &[Job], names: &DisplayNames) -> Vec<Slice> {
    owner_slices(jobs, JobState::Pending, names)
        .into_iter()
        .sorted_by_key(|slice| Reverse((slice.queue.clone(), slice.njobs)))
        .collect()
}

#[allow(non_snake_case)]
#[cfg(test)]
mod test {
    use std::io::Write as _;

    use super::*;
    use crate::job::{JobSource, RawJob};

    fn job(owner: &str, queue: &str, source: JobSource, slots: u64) -> Result<Job> {
        RawJob {
            job_number: Some("1".into()),
            priority: Some("0.5".into()),
            name: Some("job".into()),
            owner: Some(owner.into()),
            state_code: Some("r".into()),
            slots: Some(slots.to_string()),
            hard_req_queues: vec![queue.into()],
            ..Default::default()
        }
        .normalize(source)
    }

    fn summary(name: &str, available: u64) -> QueueSummary {
        QueueSummary {
            name: name.into(),
            used: 0,
            available,
            total: available,
            unknown: 0,
            error: 0,
        }
    }

    #[test]
    fn pie_order__small_sizes() {
        assert_eq!(pie_order(0), Vec::<usize>::new());
        assert_eq!(pie_order(1), vec![1]);
        assert_eq!(pie_order(2), vec![1, 2]);
        assert_eq!(pie_order(3), vec![1, 2, 3]);
        assert_eq!(pie_order(4), vec![1, 2, 3, 4]);
        assert_eq!(pie_order(5), vec![1, 2, 4, 3, 5]);
        assert_eq!(pie_order(6), vec![1, 3, 5, 2, 4, 6]);
        assert_eq!(pie_order(7), vec![1, 3, 6, 2, 5, 4, 7]);
        assert_eq!(pie_order(8), vec![1, 4, 7, 3, 6, 2, 5, 8]);
    }

    #[test]
    fn pie_order__is_a_permutation() {
        for n in 0..40 {
            let mut order = pie_order(n);
            order.sort();
            assert_eq!(order, (1..=n).collect_vec());
        }
    }

    #[test]
    fn Rgb__display_as_hex() {
        assert_eq!(PALETTE[0].to_string(), "#80b1d3");
        assert_eq!(FREE_COLOR.to_string(), "#d9d9d9");
    }

    #[test]
    fn owner_colors__first_appearance_order() -> Result<()> {
        let jobs = vec![
            job("bob", "hep.q", JobSource::Running, 1)?,
            job("alice", "hep.q", JobSource::Running, 1)?,
            job("bob", "gpu.q", JobSource::Pending, 1)?,
        ];
        let colors = owner_colors(&jobs);
        assert_eq!(colors[&SgeUser::from("bob")], PALETTE[0]);
        assert_eq!(colors[&SgeUser::from("alice")], PALETTE[1]);
        Ok(())
    }

    #[test]
    fn owner_slices__groups_by_queue_without_host() -> Result<()> {
        let jobs = vec![
            job("bob", "hep.q@node01", JobSource::Running, 2)?,
            job("bob", "hep.q", JobSource::Running, 3)?,
            job("alice", "hep.q", JobSource::Pending, 7)?,
        ];
        let names = DisplayNames::from([("bob".to_owned(), "Bob B.".to_owned())]);
        let running = owner_slices(&jobs, JobState::Running, &names);
        assert_eq!(running.len(), 1);
        assert_eq!(running[0].queue, "hep.q");
        assert_eq!(running[0].njobs, 5);
        assert_eq!(running[0].name, "Bob B.");

        let pending = owner_slices(&jobs, JobState::Pending, &names);
        assert_eq!(pending[0].name, "alice");
        Ok(())
    }

    #[test]
    fn running_wedges__shares_and_order() -> Result<()> {
        let jobs = vec![
            job("a", "hep.q", JobSource::Running, 10)?,
            job("b", "hep.q", JobSource::Running, 20)?,
            job("c", "hep.q", JobSource::Running, 30)?,
            job("d", "hep.q", JobSource::Running, 40)?,
            job("x", "gpu.q", JobSource::Running, 1)?,
        ];
        let wedges = running_wedges(&jobs, &[summary("hep.q", 50), summary("gpu.q", 0)], &DisplayNames::new());

        let gpu = wedges.iter().filter(|w| w.slice.queue == "gpu.q").collect_vec();
        assert_eq!(gpu.len(), 2);
        assert_eq!(gpu.iter().map(|w| w.frac).sum::<f64>(), 1.);

        // sizes 10, 20, 30, 40, 50 get labels [1, 2, 4, 3, 5]
        let hep = wedges
            .iter()
            .filter(|w| w.slice.queue == "hep.q")
            .map(|w| w.slice.njobs)
            .collect_vec();
        assert_eq!(hep, vec![10, 20, 40, 30, 50]);

        let total: f64 = wedges.iter().filter(|w| w.slice.queue == "hep.q").map(Wedge::prct).sum();
        assert!((total - 100.).abs() < 1e-9);
        Ok(())
    }

    #[test]
    fn pending_bars__biggest_first() -> Result<()> {
        let jobs = vec![
            job("a", "hep.q", JobSource::Pending, 1)?,
            job("b", "hep.q", JobSource::Pending, 5)?,
            job("c", "hep.q", JobSource::Running, 9)?,
        ];
        let bars = pending_bars(&jobs, &DisplayNames::new());
        assert_eq!(bars.iter().map(|bar| bar.owner.as_str()).collect_vec(), vec!["b", "a"]);
        Ok(())
    }

    #[test]
    fn load_display_names__yaml_and_missing() -> color_eyre::Result<()> {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile()?;
        writeln!(file, "alice: Alice Liddell\nbob: Bob Builder")?;
        file.flush()?;

        let names = load_display_names(file.path())?;
        assert_eq!(names.get("alice").map(String::as_str), Some("Alice Liddell"));
        assert_eq!(names.len(), 2);

        assert!(load_display_names(Path::new("/nonexistent/.users.yaml"))?.is_empty());
        Ok(())
    }
}
