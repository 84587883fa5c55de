use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use snafu::Snafu;

use crate::digest::{Digest, HashAlgorithm};

/// Observed state of the monitored tree: canonical path to content digest.
///
/// A snapshot is immutable once built. Every digest in it was produced by the
/// same [`HashAlgorithm`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    algorithm: HashAlgorithm,
    records: BTreeMap<String, Digest>,
}

impl Snapshot {
    pub fn empty(algorithm: HashAlgorithm) -> Self {
        Self {
            algorithm,
            records: BTreeMap::new(),
        }
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, path: &str) -> Option<&Digest> {
        self.records.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.records.contains_key(path)
    }

    /// Records in lexicographic path order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Digest)> {
        self.records
            .iter()
            .map(|(path, digest)| (path.as_str(), digest))
    }
}

/// Collects records for a new [`Snapshot`], enforcing one digest per path and
/// a single hash algorithm.
#[derive(Debug)]
pub struct SnapshotBuilder {
    algorithm: HashAlgorithm,
    records: BTreeMap<String, Digest>,
}

impl SnapshotBuilder {
    pub fn new(algorithm: HashAlgorithm) -> Self {
        Self {
            algorithm,
            records: BTreeMap::new(),
        }
    }

    pub fn insert(
        &mut self,
        path: impl Into<String>,
        digest: Digest,
    ) -> Result<(), SnapshotBuildError> {
        let path = path.into();
        if digest.algorithm() != self.algorithm {
            return Err(SnapshotBuildError::MixedAlgorithmError {
                path,
                expected: self.algorithm,
                found: digest.algorithm(),
            });
        }
        match self.records.entry(path) {
            Entry::Occupied(entry) => Err(SnapshotBuildError::DuplicatePathError {
                path: entry.key().clone(),
            }),
            Entry::Vacant(entry) => {
                entry.insert(digest);
                Ok(())
            }
        }
    }

    pub fn build(self) -> Snapshot {
        Snapshot {
            algorithm: self.algorithm,
            records: self.records,
        }
    }
}

#[derive(Debug, Snafu)]
pub enum SnapshotBuildError {
    #[snafu(display("Digest for '{}' uses {} but the snapshot uses {}", path, found, expected))]
    MixedAlgorithmError {
        path: String,
        expected: HashAlgorithm,
        found: HashAlgorithm,
    },
    #[snafu(display("Path '{}' is recorded more than once", path))]
    DuplicatePathError { path: String },
}
