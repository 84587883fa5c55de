use tracing::info;

use crate::reporter::{ReportError, ReporterTrait};
use crate::snapshot::ChangeKind;

/// Records changes in the log only.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter;

impl ReporterTrait for LogReporter {
    async fn report(&self, path: &str, kind: ChangeKind) -> Result<(), ReportError> {
        info!(path, %kind, "Change recorded: {}", kind.description());
        Ok(())
    }
}
