use std::path::PathBuf;

use crate::cli::Cli;
use crate::config::PartialConfig;

/// What the command line asks for, separated from logging concerns.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub config_path: Option<PathBuf>,
    pub overrides: PartialConfig,
    pub once: bool,
}

impl From<Cli> for RuntimeConfig {
    fn from(cli: Cli) -> Self {
        Self {
            config_path: cli.config,
            overrides: PartialConfig {
                root: cli.root,
                snapshot_path: cli.snapshot_path,
                hash_algorithm: cli.hash_algorithm,
                interval_seconds: cli.interval_seconds,
                concurrency: cli.concurrency,
                ..PartialConfig::default()
            },
            once: cli.once,
        }
    }
}
