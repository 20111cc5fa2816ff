//! Per-queue slot counts from `qstat -g c`.

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::{
    error::Result,
    live::{with_stderr, Qstat},
};

/// `qstat -xml -ext -r -urg -g c`: cluster queue summary
pub const QUEUE_SUMMARY_ARGS: [&str; 6] = ["-xml", "-ext", "-r", "-urg", "-g", "c"];

pub const QUEUE_COLUMNS: [&str; 6] = ["name", "used", "available", "total", "unknown", "error"];

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct QueueSummary {
    pub name: String,
    pub used: u64,
    pub available: u64,
    pub total: u64,
    /// `unknown` and `error` are only reported with `-ext`
    #[serde(default)]
    pub unknown: u64,
    #[serde(default)]
    pub error: u64,
}

impl QueueSummary {
    /// Slots in one of the accounted-for states never exceed the total.
    pub fn is_consistent(&self) -> bool {
        self.used + self.available + self.unknown + self.error <= self.total
    }
}

#[derive(Debug, Deserialize)]
struct QueueSummaryDocument {
    #[serde(rename = "cluster_queue_summary", default)]
    queues: Vec<QueueSummary>,
}

pub fn parse_queue_summary(xml: &str) -> Result<Vec<QueueSummary>> {
    let document: QueueSummaryDocument = quick_xml::de::from_str(xml)?;
    for queue in document.queues.iter().filter(|queue| !queue.is_consistent()) {
        warn!(
            "queue {}: used {} + available {} + unknown {} + error {} exceeds total {}",
            queue.name, queue.used, queue.available, queue.unknown, queue.error, queue.total
        );
    }
    debug!("qstat reported {} cluster queues", document.queues.len());
    Ok(document.queues)
}

impl Qstat {
    pub fn queue_status(&self) -> Result<Vec<QueueSummary>> {
        let output = self.query(&QUEUE_SUMMARY_ARGS)?;
        parse_queue_summary(&output.stdout).map_err(|error| with_stderr(error, &output))
    }
}

/// [`Qstat::queue_status`] with the default `qstat` on `PATH`.
pub fn queue_status() -> Result<Vec<QueueSummary>> {
    Qstat::default().queue_status()
}

#[allow(non_snake_case)]
#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use crate::error::Error;

    pub(crate) const SUMMARY: &str = r#"<?xml version='1.0'?>
<job_info xmlns:xsd="http://arc.liv.ac.uk/repos/darcs/sge/source/dist/util/resources/schemas/qstat/qstat.xsd">
  <cluster_queue_summary>
    <name>hep.q</name>
    <load>0.81000</load>
    <used>410</used>
    <resv>0</resv>
    <available>86</available>
    <total>512</total>
    <temp_disabled>0</temp_disabled>
    <manual_intervention>16</manual_intervention>
    <suspend_manual>0</suspend_manual>
    <unknown>16</unknown>
    <error>0</error>
  </cluster_queue_summary>
  <cluster_queue_summary>
    <name>gpu.q</name>
    <load>0.25000</load>
    <used>6</used>
    <resv>0</resv>
    <available>2</available>
    <total>8</total>
    <temp_disabled>0</temp_disabled>
    <manual_intervention>0</manual_intervention>
    <unknown>0</unknown>
    <error>0</error>
  </cluster_queue_summary>
</job_info>"#;

    #[test]
    fn parse_queue_summary__reads_counts() -> Result<()> {
        let queues = parse_queue_summary(SUMMARY)?;
        assert_eq!(
            queues[0],
            QueueSummary {
                name: "hep.q".into(),
                used: 410,
                available: 86,
                total: 512,
                unknown: 16,
                error: 0,
            }
        );
        assert_eq!(queues[1].name, "gpu.q");
        assert!(queues.iter().all(QueueSummary::is_consistent));
        Ok(())
    }

    #[test]
    fn parse_queue_summary__without_ext_columns() -> Result<()> {
        let queues = parse_queue_summary(
            "<job_info><cluster_queue_summary><name>fw.q</name><used>1</used><available>3</available>\
             <total>4</total></cluster_queue_summary></job_info>",
        )?;
        assert_eq!((queues[0].unknown, queues[0].error), (0, 0));
        Ok(())
    }

    #[test]
    fn parse_queue_summary__not_a_number() {
        let result = parse_queue_summary(
            "<job_info><cluster_queue_summary><name>fw.q</name><used>lots</used><available>3</available>\
             <total>4</total></cluster_queue_summary></job_info>",
        );
        assert!(matches!(result, Err(Error::Xml(_))));
    }
}
