use std::borrow::Cow;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::thread::available_parallelism;
use std::time::Duration;

use compio::fs;
use hashlink::LinkedHashMap;
use saphyr::{LoadableYamlNode, Scalar, Yaml};
use snafu::prelude::*;
use tracing::debug;

use crate::config::{JiraConfig, ReporterConfig};
use crate::digest::{HashAlgorithm, UnknownAlgorithmError};
use crate::ext::PathExt;

const DEFAULT_SNAPSHOT_PATH: &str = "./file_hashes.json";
const DEFAULT_INTERVAL_SECONDS: u64 = 60;
const DEFAULT_READ_TIMEOUT_SECONDS: u64 = 30;
const DEFAULT_JIRA_ISSUE_TYPE: &str = "Bug";

/// Fully resolved settings of the monitor. Built once at startup and never
/// changed afterwards.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub root: PathBuf,
    pub snapshot_path: PathBuf,
    pub hash_algorithm: HashAlgorithm,
    pub interval: Duration,
    pub concurrency: NonZeroUsize,
    pub read_timeout: Duration,
    pub reporter: ReporterConfig,
}

/// Settings from one source (config file or command line); unset fields fall
/// through to the next source and finally to the defaults.
#[derive(Debug, Clone, Default)]
pub struct PartialConfig {
    pub root: Option<PathBuf>,
    pub snapshot_path: Option<PathBuf>,
    pub hash_algorithm: Option<HashAlgorithm>,
    pub interval_seconds: Option<NonZeroUsize>,
    pub concurrency: Option<NonZeroUsize>,
    pub read_timeout_seconds: Option<NonZeroUsize>,
    pub reporter: Option<ReporterConfig>,
}

impl MonitorConfig {
    /// Reads the optional config file and applies `overrides` on top of it.
    pub async fn read(
        path: Option<&Path>,
        overrides: PartialConfig,
    ) -> Result<Self, ConfigCreationError> {
        let from_file = match path {
            Some(path) => PartialConfig::from_path(path).await?,
            None => PartialConfig::default(),
        };
        overrides.or(from_file).resolve()
    }
}

impl PartialConfig {
    pub async fn from_path(path: &Path) -> Result<Self, ConfigCreationError> {
        debug!("Reading config file: {}", path.best_effort_path_display());
        let bytes = fs::read(path).await.context(ReadSnafu {
            file_path: path.best_effort_path_display(),
        })?;
        let contents = String::from_utf8(bytes).context(EncodingSnafu {
            file_path: path.best_effort_path_display(),
        })?;
        debug!("Successfully read config file: {} bytes", contents.len());
        contents.as_str().try_into()
    }

    /// Fields set in `self` win over those in `fallback`.
    pub fn or(self, fallback: PartialConfig) -> PartialConfig {
        PartialConfig {
            root: self.root.or(fallback.root),
            snapshot_path: self.snapshot_path.or(fallback.snapshot_path),
            hash_algorithm: self.hash_algorithm.or(fallback.hash_algorithm),
            interval_seconds: self.interval_seconds.or(fallback.interval_seconds),
            concurrency: self.concurrency.or(fallback.concurrency),
            read_timeout_seconds: self.read_timeout_seconds.or(fallback.read_timeout_seconds),
            reporter: self.reporter.or(fallback.reporter),
        }
    }

    pub fn resolve(self) -> Result<MonitorConfig, ConfigCreationError> {
        let root = self.root.context(MissingRootSnafu)?;
        let seconds = |value: Option<NonZeroUsize>, default: u64| {
            value.map_or(default, |value| value.get() as u64)
        };

        Ok(MonitorConfig {
            root,
            snapshot_path: self
                .snapshot_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SNAPSHOT_PATH)),
            hash_algorithm: self.hash_algorithm.unwrap_or_default(),
            interval: Duration::from_secs(seconds(self.interval_seconds, DEFAULT_INTERVAL_SECONDS)),
            concurrency: self.concurrency.unwrap_or_else(default_concurrency),
            read_timeout: Duration::from_secs(seconds(
                self.read_timeout_seconds,
                DEFAULT_READ_TIMEOUT_SECONDS,
            )),
            reporter: self.reporter.unwrap_or_default(),
        })
    }

    fn parse_reporter(
        mapping: &LinkedHashMap<Yaml, Yaml>,
    ) -> Result<ReporterConfig, ConfigCreationError> {
        let reporter_type = string_field(mapping, "type")?;
        match reporter_type.as_deref() {
            None | Some("log") => Ok(ReporterConfig::Log),
            Some("console") => Ok(ReporterConfig::Console),
            Some("jira") => Self::parse_jira(mapping).map(ReporterConfig::Jira),
            Some(other) => UnknownReporterSnafu { reporter: other }.fail(),
        }
    }

    fn parse_jira(mapping: &LinkedHashMap<Yaml, Yaml>) -> Result<JiraConfig, ConfigCreationError> {
        let required = |name: &'static str| -> Result<String, ConfigCreationError> {
            string_field(mapping, name)?.context(MissingFieldSnafu {
                field: format!("reporter.{name}"),
            })
        };

        let api_token = match string_field(mapping, "apiToken")? {
            Some(token) => token,
            None => {
                let variable = required("apiTokenEnv")?;
                std::env::var(&variable).context(MissingEnvSnafu { variable })?
            }
        };

        Ok(JiraConfig {
            url: required("url")?,
            project_key: required("projectKey")?,
            issue_type: string_field(mapping, "issueType")?
                .unwrap_or_else(|| DEFAULT_JIRA_ISSUE_TYPE.to_owned()),
            email: required("email")?,
            api_token,
        })
    }
}

impl TryFrom<&str> for PartialConfig {
    type Error = ConfigCreationError;

    fn try_from(contents: &str) -> Result<Self, Self::Error> {
        let documents = Yaml::load_from_str(contents).context(ParseSnafu)?;
        let document = documents
            .first()
            .ok_or(ConfigCreationError::MalformedConfig)?;
        let top_level = document
            .as_mapping()
            .ok_or(ConfigCreationError::TopLevelNotMap)?;

        let hash_algorithm = string_field(top_level, "hashAlgorithm")?
            .map(|name| name.parse::<HashAlgorithm>())
            .transpose()
            .context(AlgorithmSnafu)?;

        let reporter = match top_level.get(&key("reporter")) {
            None | Some(Yaml::Value(Scalar::Null)) => None,
            Some(value) => Some(Self::parse_reporter(
                value
                    .as_mapping()
                    .ok_or(ConfigCreationError::ReporterNotMap)?,
            )?),
        };

        Ok(PartialConfig {
            root: string_field(top_level, "root")?.map(PathBuf::from),
            snapshot_path: string_field(top_level, "snapshotPath")?.map(PathBuf::from),
            hash_algorithm,
            interval_seconds: positive_field(top_level, "intervalSeconds")?,
            concurrency: positive_field(top_level, "concurrency")?,
            read_timeout_seconds: positive_field(top_level, "readTimeoutSeconds")?,
            reporter,
        })
    }
}

fn default_concurrency() -> NonZeroUsize {
    available_parallelism().unwrap_or(NonZeroUsize::MIN)
}

fn key(name: &'static str) -> Yaml<'static> {
    Yaml::Value(Scalar::String(Cow::Borrowed(name)))
}

fn string_field(
    mapping: &LinkedHashMap<Yaml, Yaml>,
    name: &'static str,
) -> Result<Option<String>, ConfigCreationError> {
    match mapping.get(&key(name)) {
        None | Some(Yaml::Value(Scalar::Null)) => Ok(None),
        Some(value) => value
            .as_str()
            .map(|value| Some(value.to_owned()))
            .context(InvalidFieldSnafu {
                field: name,
                expected: "a string",
            }),
    }
}

fn positive_field(
    mapping: &LinkedHashMap<Yaml, Yaml>,
    name: &'static str,
) -> Result<Option<NonZeroUsize>, ConfigCreationError> {
    match mapping.get(&key(name)) {
        None | Some(Yaml::Value(Scalar::Null)) => Ok(None),
        Some(Yaml::Value(Scalar::Integer(value))) => usize::try_from(*value)
            .ok()
            .and_then(NonZeroUsize::new)
            .map(Some)
            .context(InvalidFieldSnafu {
                field: name,
                expected: "a positive integer",
            }),
        Some(_) => InvalidFieldSnafu {
            field: name,
            expected: "a positive integer",
        }
        .fail(),
    }
}

#[derive(Debug, Snafu)]
pub enum ConfigCreationError {
    #[snafu(display("Failed to read the config file: {}", file_path))]
    ReadError {
        file_path: String,
        source: std::io::Error,
    },
    #[snafu(display("Config file {} is not valid UTF-8", file_path))]
    EncodingError {
        file_path: String,
        source: std::string::FromUtf8Error,
    },
    #[snafu(display("Failed to parse the config file"))]
    ParseError { source: saphyr::ScanError },
    #[snafu(display("Improperly formatted config file"))]
    MalformedConfig,
    #[snafu(display("Top level of config should be a map"))]
    TopLevelNotMap,
    #[snafu(display("Reporter section should be a map"))]
    ReporterNotMap,
    #[snafu(display("Config field '{}' should be {}", field, expected))]
    InvalidFieldError {
        field: &'static str,
        expected: &'static str,
    },
    #[snafu(display("Config field '{}' is required", field))]
    MissingFieldError { field: String },
    #[snafu(display("No monitored root given in the config file or on the command line"))]
    MissingRootError,
    #[snafu(display("Unknown reporter type '{}'", reporter))]
    UnknownReporterError { reporter: String },
    #[snafu(display("Environment variable '{}' is not set", variable))]
    MissingEnvError {
        variable: String,
        source: std::env::VarError,
    },
    #[snafu(display("Invalid hash algorithm in config"))]
    AlgorithmError { source: UnknownAlgorithmError },
}
