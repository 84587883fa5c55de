//! Destinations for detected changes.

mod console_reporter;
mod jira_reporter;
mod log_reporter;
mod reporter;

pub use console_reporter::ConsoleReporter;
pub use jira_reporter::JiraReporter;
pub use log_reporter::LogReporter;
pub use reporter::{ReportError, Reporter, ReporterTrait};
