pub mod duration {
    use std::ops::Deref;
    use std::time::Duration;

    use color_eyre::eyre::{bail, eyre, Context as _};
    use itertools::Itertools as _;
    use serde::Deserialize;

    /// Human duration from the settings file: `500ms`, `30s`, `2m`, `1h`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
    #[serde(try_from = "String")]
    pub struct DurationWrapper(pub Duration);

    impl TryFrom<String> for DurationWrapper {
        type Error = color_eyre::Report;

        fn try_from(value: String) -> Result<Self, Self::Error> {
            let chars = value.trim().chars().collect_vec();
            let (amount, unit, scale): (&[char], &str, u64) = match chars.as_slice() {
                [millis @ .., 'm', 's'] => (millis, "milliseconds", 1),
                [secs @ .., 's'] => (secs, "seconds", 1_000),
                [mins @ .., 'm'] => (mins, "minutes", 60 * 1_000),
                [hours @ .., 'h'] => (hours, "hours", 60 * 60 * 1_000),
                x => bail!(
                    "parsing duration: {x}: invalid suffix (only h, m, s, ms)",
                    x = x.iter().collect::<String>()
                ),
            };
            let amount = amount.iter().collect::<String>();
            let millis = amount
                .parse::<u64>()
                .context("parsing duration from string")?
                .checked_mul(scale)
                .ok_or_else(|| eyre!("{amount} {unit} don't fit into a duration"))?;
            Ok(DurationWrapper(Duration::from_millis(millis)))
        }
    }

    impl TryFrom<&str> for DurationWrapper {
        type Error = color_eyre::Report;

        fn try_from(value: &str) -> Result<Self, Self::Error> {
            Self::try_from(value.to_owned())
        }
    }

    impl Deref for DurationWrapper {
        type Target = Duration;

        fn deref(&self) -> &Self::Target {
            &self.0
        }
    }
}

pub use duration::DurationWrapper as Duration;
