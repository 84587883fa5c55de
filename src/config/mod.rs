mod config;
mod reporter_config;

pub use config::{ConfigCreationError, MonitorConfig, PartialConfig};
pub use reporter_config::{JiraConfig, ReporterConfig};
