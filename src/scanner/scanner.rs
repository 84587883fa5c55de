use std::future::Future;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use compio::dispatcher::{Dispatcher, DispatcherBuilder};
use futures::StreamExt;
use futures::stream::FuturesUnordered;
use snafu::{ResultExt, Snafu};
use tracing::{debug, error, info, warn};

use crate::digest::{Digest, DigestUnavailable, HashAlgorithm};
use crate::monitor::Shutdown;
use crate::scanner::walker::{self, DiscoveredFile, ScanError, WalkOutcome};
use crate::snapshot::{Snapshot, SnapshotBuilder};

/// Result of scanning the tree once.
#[derive(Debug)]
pub struct ScanOutcome {
    pub snapshot: Snapshot,
    /// Files that were found but left out because their digest failed.
    pub unavailable: Vec<DigestUnavailable>,
    /// Directory entries that were not regular files or could not be listed.
    pub skipped: usize,
}

/// Single point where digests coming back from the workers are merged into
/// the fresh snapshot.
#[derive(Debug)]
pub struct ScanMerger {
    builder: SnapshotBuilder,
    unavailable: Vec<DigestUnavailable>,
}

impl ScanMerger {
    pub fn new(algorithm: HashAlgorithm) -> Self {
        Self {
            builder: SnapshotBuilder::new(algorithm),
            unavailable: Vec::new(),
        }
    }

    pub fn accept(&mut self, key: String, result: Result<Digest, DigestUnavailable>) {
        match result {
            Ok(digest) => {
                if let Err(error) = self.builder.insert(key, digest) {
                    error!("Dropping record from snapshot: {}", error);
                }
            }
            Err(unavailable) => {
                warn!(
                    "Excluding file from snapshot: {}",
                    snafu::Report::from_error(&unavailable)
                );
                self.unavailable.push(unavailable);
            }
        }
    }

    pub fn finish(self, skipped: usize) -> ScanOutcome {
        ScanOutcome {
            snapshot: self.builder.build(),
            unavailable: self.unavailable,
            skipped,
        }
    }
}

/// Walks the monitored tree and digests every regular file on a pool of
/// worker threads.
pub struct Scanner {
    dispatcher: Dispatcher,
    algorithm: HashAlgorithm,
    concurrency: NonZeroUsize,
    read_timeout: Duration,
}

impl Scanner {
    pub fn new(
        algorithm: HashAlgorithm,
        concurrency: NonZeroUsize,
        read_timeout: Duration,
    ) -> Result<Self, ScannerCreationError> {
        debug!("Using {} worker threads for digesting", concurrency);

        let dispatcher = DispatcherBuilder::new()
            .worker_threads(concurrency)
            .build()
            .context(DispatcherSnafu)?;

        Ok(Self {
            dispatcher,
            algorithm,
            concurrency,
            read_timeout,
        })
    }

    /// Builds a fresh snapshot of `root`. Files in `excluded` are never digested.
    pub async fn scan(
        &self,
        root: &Path,
        excluded: &[PathBuf],
        shutdown: &Shutdown,
    ) -> Result<ScanOutcome, ScanError> {
        let walked = walker::walk(root, excluded, shutdown)?;
        self.digest_all(walked, shutdown).await
    }

    /// Digests the walked files with at most `concurrency` digests in flight.
    pub(crate) async fn digest_all(
        &self,
        walked: WalkOutcome,
        shutdown: &Shutdown,
    ) -> Result<ScanOutcome, ScanError> {
        info!("Found {} files to digest", walked.files.len());

        let mut merger = ScanMerger::new(self.algorithm);
        let mut in_flight = FuturesUnordered::new();

        for file in walked.files {
            if shutdown.is_requested() {
                return Err(ScanError::CancelledError);
            }
            if in_flight.len() >= self.concurrency.get() {
                if let Some((key, result)) = in_flight.next().await {
                    merger.accept(key, result);
                }
            }
            in_flight.push(self.dispatch_digest(file));
        }

        while let Some((key, result)) = in_flight.next().await {
            merger.accept(key, result);
        }

        Ok(merger.finish(walked.skipped))
    }

    /// Hands one file to the worker pool and resolves to its digest.
    fn dispatch_digest(
        &self,
        file: DiscoveredFile,
    ) -> impl Future<Output = (String, Result<Digest, DigestUnavailable>)> + use<> {
        let DiscoveredFile { key, path } = file;
        let algorithm = self.algorithm;
        let read_timeout = self.read_timeout;
        let worker_path = path.clone();

        let receiver = self
            .dispatcher
            .dispatch(move || async move {
                Digest::compute(&worker_path, algorithm, read_timeout).await
            })
            .map_err(|e| e.to_string());

        async move {
            let result = match receiver {
                Ok(receiver) => match receiver.await {
                    Ok(result) => result,
                    Err(source) => Err(DigestUnavailable::CanceledError { path, source }),
                },
                Err(message) => Err(DigestUnavailable::DispatchError { path, message }),
            };
            (key, result)
        }
    }
}

#[derive(Debug, Snafu)]
pub enum ScannerCreationError {
    #[snafu(display("Failed to create digest worker pool"))]
    DispatcherError { source: std::io::Error },
}
