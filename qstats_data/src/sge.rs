use chrono::{DateTime, Local, NaiveDateTime, Timelike as _};
use derive_more::derive::{Deref, Display, From, Into};
use serde::Serialize;

/// Login name of a job owner, as reported by `qstat`/the accounting file.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deref, Display, From, Into, Serialize)]
pub struct SgeUser(pub String);

impl From<&str> for SgeUser {
    fn from(value: &str) -> Self {
        SgeUser(value.to_owned())
    }
}

/// Timestamps in `qstat -xml` output look like `2020-03-01T12:00:00`, some versions add
/// fractional seconds (`2020-03-01T12:00:00.513`). SGE prints them in the local timezone of the
/// qmaster, without offset. Fractions are cut off, everything is kept at second resolution.
pub fn parse_xml_datetime(input: &str) -> Option<NaiveDateTime> {
    const FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"];
    let input = input.trim();
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(input, fmt).ok())
        .and_then(|datetime| datetime.with_nanosecond(0))
}

/// The accounting file stores epoch seconds, `0` meaning "never happened" (e.g. start time of a
/// job deleted while pending). Converted to local time to line up with the xml timestamps.
pub fn datetime_from_epoch(secs: i64) -> Option<NaiveDateTime> {
    match secs {
        0 => None,
        secs => DateTime::from_timestamp(secs, 0).map(|utc| utc.with_timezone(&Local).naive_local()),
    }
}
