use derive_more::Display;
use snafu::Snafu;

use crate::snapshot::{ChangeEvent, ChangeKind, SnapshotPersistError};

/// Steps of one monitoring cycle. A cycle moves through them strictly in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
pub enum CyclePhase {
    #[default]
    Idle,
    Loading,
    Scanning,
    Diffing,
    Reporting,
    Persisting,
}

impl CyclePhase {
    pub fn next(self) -> CyclePhase {
        match self {
            CyclePhase::Idle => CyclePhase::Loading,
            CyclePhase::Loading => CyclePhase::Scanning,
            CyclePhase::Scanning => CyclePhase::Diffing,
            CyclePhase::Diffing => CyclePhase::Reporting,
            CyclePhase::Reporting => CyclePhase::Persisting,
            CyclePhase::Persisting => CyclePhase::Idle,
        }
    }
}

/// What a completed cycle observed and did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleSummary {
    pub files_scanned: usize,
    pub files_excluded: usize,
    pub entries_skipped: usize,
    pub report_failures: usize,
    /// The stored snapshot could not be used and the cycle compared against nothing.
    pub prior_degraded: bool,
    /// The monitored root could not be walked and the fresh snapshot is empty.
    pub scan_degraded: bool,
    pub events: Vec<ChangeEvent>,
}

impl CycleSummary {
    pub fn count(&self, kind: ChangeKind) -> usize {
        self.events.iter().filter(|event| event.kind == kind).count()
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CycleError {
    #[snafu(display("Failed to persist the new snapshot"))]
    PersistError { source: SnapshotPersistError },
    #[snafu(display("A cycle is already in progress"))]
    AlreadyRunningError,
    #[snafu(display("Cycle abandoned because of a shutdown request"))]
    AbandonedError,
}
