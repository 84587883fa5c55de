use std::cell::Cell;
use std::path::PathBuf;
use std::sync::Arc;

use snafu::{ResultExt, Snafu};
use tracing::{debug, error, info, warn};

use crate::config::MonitorConfig;
use crate::ext::PathExt;
use crate::monitor::cycle::{AbandonedSnafu, AlreadyRunningSnafu, PersistSnafu};
use crate::monitor::{CycleError, CyclePhase, CycleSummary, Shutdown};
use crate::reporter::ReporterTrait;
use crate::scanner::{ScanError, ScanMerger, ScanOutcome, Scanner, ScannerCreationError};
use crate::snapshot::{ChangeEvent, ChangeKind, Snapshot, SnapshotStore, diff};

/// Runs scan, diff, report and persist cycles for one monitored tree.
pub struct Monitor<R> {
    config: Arc<MonitorConfig>,
    scanner: Scanner,
    store: SnapshotStore,
    reporter: R,
    shutdown: Shutdown,
    phase: Cell<CyclePhase>,
}

/// Holds the monitor out of `Idle` for the duration of a cycle.
struct PhaseGuard<'a> {
    phase: &'a Cell<CyclePhase>,
}

impl PhaseGuard<'_> {
    fn enter(&self, next: CyclePhase) {
        let current = self.phase.get();
        debug_assert_eq!(current.next(), next, "cycle phases must advance in order");
        debug!("Cycle phase {} -> {}", current, next);
        self.phase.set(next);
    }
}

impl Drop for PhaseGuard<'_> {
    fn drop(&mut self) {
        self.phase.set(CyclePhase::Idle);
    }
}

impl<R: ReporterTrait> Monitor<R> {
    pub fn new(
        config: Arc<MonitorConfig>,
        reporter: R,
        shutdown: Shutdown,
    ) -> Result<Self, MonitorCreationError> {
        let scanner = Scanner::new(config.hash_algorithm, config.concurrency, config.read_timeout)
            .context(ScannerSnafu)?;
        let store = SnapshotStore::new(&config.snapshot_path);

        Ok(Self {
            config,
            scanner,
            store,
            reporter,
            shutdown,
            phase: Cell::new(CyclePhase::Idle),
        })
    }

    pub fn phase(&self) -> CyclePhase {
        self.phase.get()
    }

    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    /// One complete cycle. Only a failed persist or a shutdown request end it
    /// early; everything else is logged and the cycle carries on.
    pub async fn run_cycle(&self) -> Result<CycleSummary, CycleError> {
        let guard = self.begin()?;
        info!("Starting file integrity check...");

        let (prior, prior_degraded) = self.load_prior().await;
        if self.shutdown.is_requested() {
            return AbandonedSnafu.fail();
        }

        guard.enter(CyclePhase::Scanning);
        let scanned = self
            .scanner
            .scan(&self.config.root, &self.excluded_paths(), &self.shutdown)
            .await;
        let (scan, scan_degraded) = self.settle_scan(scanned)?;

        let mut summary = self.reconcile(&guard, prior, prior_degraded, scan).await?;
        summary.scan_degraded = scan_degraded;
        guard.enter(CyclePhase::Idle);
        info!(
            "File integrity check completed: {} added, {} modified, {} removed, {} excluded",
            summary.count(ChangeKind::Added),
            summary.count(ChangeKind::Modified),
            summary.count(ChangeKind::Removed),
            summary.files_excluded
        );
        Ok(summary)
    }

    fn begin(&self) -> Result<PhaseGuard<'_>, CycleError> {
        if self.phase.get() != CyclePhase::Idle {
            return AlreadyRunningSnafu.fail();
        }
        let guard = PhaseGuard { phase: &self.phase };
        guard.enter(CyclePhase::Loading);
        Ok(guard)
    }

    /// A cancelled scan abandons the cycle; any other scan failure leaves an
    /// empty fresh snapshot so the cycle still reaches Persisting.
    fn settle_scan(
        &self,
        scanned: Result<ScanOutcome, ScanError>,
    ) -> Result<(ScanOutcome, bool), CycleError> {
        match scanned {
            Ok(scan) => Ok((scan, false)),
            Err(ScanError::CancelledError) => AbandonedSnafu.fail(),
            Err(error) => {
                error!(
                    "Treating the monitored tree as empty: {}",
                    snafu::Report::from_error(&error)
                );
                Ok((ScanMerger::new(self.config.hash_algorithm).finish(0), true))
            }
        }
    }

    async fn load_prior(&self) -> (Snapshot, bool) {
        match self.store.load(self.config.hash_algorithm).await {
            Ok(snapshot) => (snapshot, false),
            Err(error) => {
                warn!(
                    "Starting with an empty snapshot: {}",
                    snafu::Report::from_error(&error)
                );
                (Snapshot::empty(self.config.hash_algorithm), true)
            }
        }
    }

    /// The snapshot file must never show up as a change of the tree it describes.
    fn excluded_paths(&self) -> Vec<PathBuf> {
        vec![
            self.store.path().resolve_lenient(),
            self.store.temp_path().resolve_lenient(),
        ]
    }

    async fn reconcile(
        &self,
        guard: &PhaseGuard<'_>,
        prior: Snapshot,
        mut prior_degraded: bool,
        scan: ScanOutcome,
    ) -> Result<CycleSummary, CycleError> {
        guard.enter(CyclePhase::Diffing);
        let ScanOutcome {
            snapshot: fresh,
            unavailable,
            skipped,
        } = scan;
        let events = match diff(&prior, &fresh) {
            Ok(events) => events,
            Err(error) => {
                warn!("Comparing against an empty snapshot: {}", error);
                prior_degraded = true;
                diff(&Snapshot::empty(fresh.algorithm()), &fresh).unwrap_or_default()
            }
        };

        guard.enter(CyclePhase::Reporting);
        let mut report_failures = 0;
        for event in &events {
            log_change(event);
            if let Err(error) = self.reporter.report(&event.path, event.kind).await {
                error!(
                    "Failed to report {} of {}: {}",
                    event.kind,
                    event.path,
                    snafu::Report::from_error(&error)
                );
                report_failures += 1;
            }
        }

        guard.enter(CyclePhase::Persisting);
        if let Err(error) = self.store.persist(&fresh).await {
            error!(
                "Failed to save snapshot: {}",
                snafu::Report::from_error(&error)
            );
            return Err(error).context(PersistSnafu);
        }

        Ok(CycleSummary {
            files_scanned: fresh.len(),
            files_excluded: unavailable.len(),
            entries_skipped: skipped,
            report_failures,
            prior_degraded,
            scan_degraded: false,
            events,
        })
    }
}

fn log_change(event: &ChangeEvent) {
    match event.kind {
        ChangeKind::Added => warn!("New file detected: {}", event.path),
        ChangeKind::Modified => warn!("Integrity issue detected: {}", event.path),
        ChangeKind::Removed => warn!("File removed: {}", event.path),
    }
}

#[derive(Debug, Snafu)]
pub enum MonitorCreationError {
    #[snafu(display("Failed to set up the scanner"))]
    ScannerError { source: ScannerCreationError },
}
