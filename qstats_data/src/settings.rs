use std::path::{Path, PathBuf};

use config::{builder::DefaultState, Config, ConfigBuilder, ConfigError, Environment, File};
use log::debug;
use serde::Deserialize;

use crate::misc::parsing::Duration;

pub const DEFAULT_QSTAT: &str = "qstat";
pub const DEFAULT_QUEUES: [&str; 3] = ["hep.q", "gpu.q", "fw.q"];
pub const DEFAULT_ACCOUNTING_FILE: &str = "/opt/sge/default/common/accounting";
pub const DEFAULT_COMMAND_TIMEOUT: &str = "30s";
/// Relative to the home directory, maps logins to display names for the charts.
pub const USERS_FILE_NAME: &str = ".users.yaml";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// program to call for queue information
    pub qstat: String,
    /// queues reported on when none are asked for explicitly
    pub queues: Vec<String>,
    pub accounting_file: PathBuf,
    pub users_file: Option<PathBuf>,
    pub command_timeout: Duration,
}

impl Settings {
    /// Defaults, overlaid by `~/.config/qstats/config.toml` (if it exists), overlaid by
    /// `QSTATS_*` environment variables (`QSTATS_QUEUES=hep.q,gpu.q`).
    pub fn new() -> Result<Self, ConfigError> {
        let config_file = dirs::config_dir().map(|dir| dir.join("qstats").join("config.toml"));
        Self::load(config_file.as_deref(), false)
    }

    /// Like [`Settings::new`], but with an explicit settings file that has to exist.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        Self::load(Some(path), true)
    }

    fn load(file: Option<&Path>, required: bool) -> Result<Self, ConfigError> {
        let mut builder = Self::defaults()?;
        if let Some(file) = file {
            debug!("Loading settings from {}", file.display());
            builder = builder.add_source(File::from(file).required(required));
        }
        builder
            .add_source(
                Environment::with_prefix("qstats")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("queues"),
            )
            .build()?
            .try_deserialize()
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        let mut builder = Config::builder()
            .set_default("qstat", DEFAULT_QSTAT)?
            .set_default("queues", DEFAULT_QUEUES.to_vec())?
            .set_default("accounting_file", DEFAULT_ACCOUNTING_FILE)?
            .set_default("command_timeout", DEFAULT_COMMAND_TIMEOUT)?;
        if let Some(users_file) = dirs::home_dir().map(|home| home.join(USERS_FILE_NAME)) {
            builder = builder.set_default("users_file", users_file.to_string_lossy().into_owned())?;
        }
        Ok(builder)
    }
}

#[allow(non_snake_case)]
#[cfg(test)]
mod test {
    use std::io::Write as _;

    use super::*;

    #[test]
    fn Settings__from_file__overrides_defaults() -> color_eyre::Result<()> {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile()?;
        writeln!(file, "queues = [\"short.q\", \"long.q\"]")?;
        writeln!(file, "command_timeout = \"2m\"")?;
        file.flush()?;

        let settings = Settings::from_file(file.path())?;
        assert_eq!(settings.queues, vec!["short.q", "long.q"]);
        assert_eq!(*settings.command_timeout, std::time::Duration::from_secs(120));
        assert_eq!(settings.qstat, DEFAULT_QSTAT);
        assert_eq!(settings.accounting_file, PathBuf::from(DEFAULT_ACCOUNTING_FILE));
        Ok(())
    }

    #[test]
    fn Settings__from_file__rejects_bad_timeout() -> color_eyre::Result<()> {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile()?;
        writeln!(file, "command_timeout = \"soon\"")?;
        file.flush()?;

        assert!(Settings::from_file(file.path()).is_err());
        Ok(())
    }

    #[test]
    fn Settings__from_file__missing_file() {
        assert!(Settings::from_file(Path::new("/nonexistent/qstats.toml")).is_err());
    }
}
