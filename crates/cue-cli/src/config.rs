use cue_core::config::SchedulingConfig;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// JSON file holding the event records
    pub events_file: PathBuf,
    /// Length of the default listing window
    pub default_days: u32,
    /// Occurrences shown by `expand` when no count is given
    pub preview_count: usize,
    pub scheduling: SchedulingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            events_file: PathBuf::from("events.json"),
            default_days: 7,
            preview_count: 10,
            scheduling: SchedulingConfig::default(),
        }
    }
}

impl Config {
    /// Defaults, then `cue.toml`, then `CUE_*` variables
    /// (`CUE_SCHEDULING__SNAP_MINUTES=5` sets a nested key).
    pub fn new() -> Result<Self, figment::Error> {
        Self::figment(Figment::new().merge(Toml::file("cue.toml"))).extract()
    }

    fn figment(files: Figment) -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(files)
            .merge(Env::prefixed("CUE_").split("__"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_defaults_without_sources() {
        Jail::expect_with(|_jail| {
            let config = Config::new()?;
            assert_eq!(config, Config::default());
            assert_eq!(config.scheduling.snap_minutes, 15);
            Ok(())
        });
    }

    #[test]
    fn test_toml_and_env_merge() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "cue.toml",
                r#"
                    events_file = "season.json"

                    [scheduling]
                    snap_minutes = 5

                    [scheduling.buffer]
                    default_minutes = 10
                    venues = { main-stage = 30 }
                "#,
            )?;
            jail.set_env("CUE_DEFAULT_DAYS", "14");
            jail.set_env("CUE_SCHEDULING__COMMIT_TIMEOUT_MS", "250");

            let config = Config::new()?;
            assert_eq!(config.events_file, PathBuf::from("season.json"));
            assert_eq!(config.default_days, 14);
            assert_eq!(config.scheduling.snap_minutes, 5);
            assert_eq!(config.scheduling.commit_timeout_ms, 250);
            assert_eq!(config.scheduling.buffer.minutes_for("main-stage"), 30);
            assert_eq!(config.scheduling.buffer.minutes_for("studio"), 10);
            Ok(())
        });
    }
}
