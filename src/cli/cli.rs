use std::num::NonZeroUsize;
use std::path::PathBuf;

use clap::Parser;

use crate::application::data::LogLevel;
use crate::digest::HashAlgorithm;

/// Watches a directory tree and reports files that were added, modified or removed.
#[derive(Parser, Debug, Clone)]
#[command(version)]
pub struct Cli {
    /// YAML configuration file
    #[clap(long, short)]
    pub config: Option<PathBuf>,

    /// Directory tree to monitor
    #[clap(long, short)]
    pub root: Option<PathBuf>,

    /// Where the snapshot of known digests is kept
    #[clap(long)]
    pub snapshot_path: Option<PathBuf>,

    #[clap(long, value_enum)]
    pub hash_algorithm: Option<HashAlgorithm>,

    #[clap(long)]
    pub interval_seconds: Option<NonZeroUsize>,

    /// Number of files digested in parallel
    #[clap(long)]
    pub concurrency: Option<NonZeroUsize>,

    /// Run a single cycle and exit
    #[clap(long)]
    pub once: bool,

    #[clap(long, short, default_value = "info", value_enum)]
    pub log_level: LogLevel,

    /// Append log output to this file instead of standard output
    #[clap(long)]
    pub log_file: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_leave_everything_to_the_config_file() {
        let cli = Cli::try_parse_from(["fimon"]).unwrap();

        assert!(cli.config.is_none());
        assert!(cli.root.is_none());
        assert!(!cli.once);
        assert!(matches!(cli.log_level, LogLevel::Info));
    }

    #[test]
    fn parses_overrides() {
        let cli = Cli::try_parse_from([
            "fimon",
            "--root",
            "/srv/data",
            "--hash-algorithm",
            "blake3",
            "--interval-seconds",
            "5",
            "--concurrency",
            "4",
            "--once",
            "--log-level",
            "debug",
        ])
        .unwrap();

        assert_eq!(cli.root, Some(PathBuf::from("/srv/data")));
        assert_eq!(cli.hash_algorithm, Some(HashAlgorithm::Blake3));
        assert_eq!(cli.interval_seconds, NonZeroUsize::new(5));
        assert_eq!(cli.concurrency, NonZeroUsize::new(4));
        assert!(cli.once);
    }

    #[test]
    fn rejects_zero_interval() {
        assert!(Cli::try_parse_from(["fimon", "--interval-seconds", "0"]).is_err());
    }
}
