use std::{io, path::PathBuf, time::Duration};

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Everything that can go wrong between calling `qstat`/reading the accounting file and handing
/// out a typed table. All of these are fatal for the call that produced them.
#[derive(Debug, Error)]
pub enum Error {
    #[error("could not execute `{command}`")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("`{command}` did not finish within {timeout:?}")]
    Timeout { command: String, timeout: Duration },
    #[error("qstat output has no `{section}` section (stderr: {stderr})")]
    MissingSection { section: &'static str, stderr: String },

    #[error("malformed qstat xml")]
    Xml(#[from] quick_xml::de::DeError),

    #[error("reading accounting file {}", path.display())]
    Accounting {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("accounting line {line}: expected at least {expected} fields, got {fields}")]
    ShortRow { line: usize, expected: usize, fields: usize },

    #[error("column `{column}` is missing")]
    Missing { column: &'static str },
    #[error("column `{column}`: cannot cast {value:?} to {to}")]
    Cast {
        column: &'static str,
        value: String,
        to: &'static str,
    },
    #[error("unknown job state {0:?}")]
    UnknownState(String),

    #[error("loading settings")]
    Settings(#[from] config::ConfigError),
}

impl Error {
    pub(crate) fn cast(column: &'static str, value: impl Into<String>, to: &'static str) -> Self {
        Error::Cast {
            column,
            value: value.into(),
            to,
        }
    }
}
