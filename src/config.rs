//! Layered settings: built-in defaults, then an optional TOML file, then
//! `STREAMSIM_*` environment variables. CLI flags are applied on top by the
//! binary.

use std::path::Path;

use ::config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::simulator::ChannelFilter;

pub const DEFAULT_CONFIG_FILE: &str = "streamsim.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    pub exchange: String,
    /// Absent means "track every channel".
    #[serde(default)]
    pub channel_filter: Option<Vec<String>>,
    pub log_filter: String,
    pub metrics_port: u16,
}

impl Settings {
    /// `path` of `None` looks for `streamsim.toml` in the working directory
    /// and silently skips it when missing.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(p) => File::from(p).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        Config::builder()
            .set_default("exchange", "bitmex")?
            .set_default("log_filter", "streamsim=info")?
            .set_default("metrics_port", 9000)?
            .add_source(file)
            .add_source(
                Environment::with_prefix("STREAMSIM")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("channel_filter"),
            )
            .build()?
            .try_deserialize()
    }

    pub fn channel_filter(&self) -> ChannelFilter {
        ChannelFilter::from_list(self.channel_filter.clone())
    }
}
