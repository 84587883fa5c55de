use snafu::Snafu;

use crate::config::ReporterConfig;
use crate::reporter::{ConsoleReporter, JiraReporter, LogReporter};
use crate::snapshot::ChangeKind;

/// Records one detected change somewhere outside the monitor.
pub trait ReporterTrait {
    async fn report(&self, path: &str, kind: ChangeKind) -> Result<(), ReportError>;
}

#[derive(Debug)]
pub enum Reporter {
    Log(LogReporter),
    Console(ConsoleReporter),
    Jira(JiraReporter),
}

impl Reporter {
    pub fn from_config(config: &ReporterConfig) -> Self {
        match config {
            ReporterConfig::Log => Reporter::Log(LogReporter),
            ReporterConfig::Console => Reporter::Console(ConsoleReporter::new()),
            ReporterConfig::Jira(jira) => Reporter::Jira(JiraReporter::new(jira)),
        }
    }
}

impl ReporterTrait for Reporter {
    async fn report(&self, path: &str, kind: ChangeKind) -> Result<(), ReportError> {
        match self {
            Reporter::Log(reporter) => reporter.report(path, kind).await,
            Reporter::Console(reporter) => reporter.report(path, kind).await,
            Reporter::Jira(reporter) => reporter.report(path, kind).await,
        }
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ReportError {
    #[snafu(display("Failed to send report for '{}'", path))]
    RequestError {
        path: String,
        #[snafu(source(from(ureq::Error, Box::new)))]
        source: Box<ureq::Error>,
    },
    #[snafu(display("Issue tracker rejected report for '{}' with status {}: {}", path, status, body))]
    RejectedError {
        path: String,
        status: u16,
        body: String,
    },
    #[snafu(display("Report worker for '{}' panicked", path))]
    WorkerPanickedError { path: String },
    #[snafu(display("Failed to write report for '{}'", path))]
    OutputError {
        path: String,
        source: std::io::Error,
    },
}
