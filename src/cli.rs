//! Command-Line Interface (CLI) argument parsing.
//!
//! The arguments are parsed with `clap` and then merged as the final,
//! highest-priority layer of the `figment` configuration.

use clap::Parser;
use figment::{
    value::{Dict, Map, Tag, Value},
    Error, Metadata, Profile, Provider,
};
use std::path::PathBuf;

/// Fans out "message stored" signals to the configured webhook panels.
#[derive(Parser, Debug, Default, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the TOML settings file.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Path to the panel configuration JSON.
    #[arg(short, long, value_name = "FILE")]
    pub panels: Option<PathBuf>,

    /// Address for the host bridge to listen on.
    #[arg(short, long, value_name = "ADDR")]
    pub listen: Option<String>,

    /// Logging filter, e.g. "debug" or "panelhook=trace".
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Wait between delivery attempts in milliseconds.
    #[arg(long, value_name = "MS")]
    pub backoff_ms: Option<u64>,

    /// Skip disabled panels instead of halting the dispatch at the first one.
    #[arg(long)]
    pub skip_disabled: bool,
}

impl Provider for Cli {
    fn metadata(&self) -> Metadata {
        Metadata::named("Command-Line Arguments")
    }

    fn data(&self) -> Result<Map<Profile, Dict>, Error> {
        let mut dict = Dict::new();

        if let Some(path) = &self.panels {
            dict.insert(
                "panels_path".into(),
                Value::from(path.to_string_lossy().into_owned()),
            );
        }

        if let Some(addr) = &self.listen {
            dict.insert("listen_addr".into(), Value::from(addr.clone()));
        }

        if let Some(level) = &self.log_level {
            dict.insert("log_level".into(), Value::from(level.clone()));
        }

        let mut delivery = Dict::new();
        if let Some(backoff) = self.backoff_ms {
            delivery.insert("backoff_ms".into(), Value::from(backoff));
        }
        // Only an explicit flag overrides; absence leaves the lower layers alone.
        if self.skip_disabled {
            delivery.insert("on_disabled_panel".into(), Value::from("skip"));
        }
        if !delivery.is_empty() {
            dict.insert("delivery".into(), Value::Dict(Tag::Default, delivery));
        }

        let mut map = Map::new();
        map.insert(Profile::Default, dict);
        Ok(map)
    }
}
