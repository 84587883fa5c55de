use std::io::Write;

use colored::{ColoredString, Colorize};
use snafu::ResultExt;
use supports_color::Stream;

use crate::reporter::reporter::OutputSnafu;
use crate::reporter::{ReportError, ReporterTrait};
use crate::snapshot::ChangeKind;

/// Prints one line per change to stdout.
#[derive(Debug, Clone)]
pub struct ConsoleReporter {
    colored: bool,
}

impl ConsoleReporter {
    pub fn new() -> Self {
        let colored = supports_color::on(Stream::Stdout).is_some();
        colored::control::set_override(colored);
        Self { colored }
    }

    fn label(&self, kind: ChangeKind) -> ColoredString {
        let label = format!("{:<8}", kind.to_string());
        match kind {
            ChangeKind::Added => label.green(),
            ChangeKind::Modified => label.yellow().bold(),
            ChangeKind::Removed => label.red(),
        }
    }

    pub(crate) fn render(&self, path: &str, kind: ChangeKind) -> String {
        if self.colored {
            format!("{} {}", self.label(kind), path)
        } else {
            format!("{:<8} {}", kind.to_string(), path)
        }
    }
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReporterTrait for ConsoleReporter {
    async fn report(&self, path: &str, kind: ChangeKind) -> Result<(), ReportError> {
        let line = self.render(path, kind);
        writeln!(std::io::stdout().lock(), "{line}").context(OutputSnafu { path })
    }
}
