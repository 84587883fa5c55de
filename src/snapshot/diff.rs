use derive_more::Display;
use snafu::Snafu;

use crate::digest::HashAlgorithm;
use crate::snapshot::Snapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
pub enum ChangeKind {
    Added,
    Modified,
    Removed,
}

impl ChangeKind {
    /// Wording used in tickets and log lines.
    pub fn description(&self) -> &'static str {
        match self {
            ChangeKind::Added => "New File",
            ChangeKind::Modified => "Modification",
            ChangeKind::Removed => "File Removal",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Display)]
#[display("{kind} {path}")]
pub struct ChangeEvent {
    pub path: String,
    pub kind: ChangeKind,
}

impl ChangeEvent {
    pub fn new(path: impl Into<String>, kind: ChangeKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

/// Three-way comparison of two snapshots, ordered by path.
///
/// Paths only in `fresh` are `Added`, paths only in `prior` are `Removed`,
/// and paths in both with different digests are `Modified`.
pub fn diff(
    prior: &Snapshot,
    fresh: &Snapshot,
) -> Result<Vec<ChangeEvent>, AlgorithmMismatchError> {
    if !prior.is_empty() && !fresh.is_empty() && prior.algorithm() != fresh.algorithm() {
        return AlgorithmMismatchSnafu {
            prior: prior.algorithm(),
            fresh: fresh.algorithm(),
        }
        .fail();
    }

    let mut events = Vec::new();
    for (path, fresh_digest) in fresh.iter() {
        match prior.get(path) {
            None => events.push(ChangeEvent::new(path, ChangeKind::Added)),
            Some(prior_digest) if prior_digest != fresh_digest => {
                events.push(ChangeEvent::new(path, ChangeKind::Modified))
            }
            Some(_) => {}
        }
    }
    events.extend(
        prior
            .iter()
            .filter(|(path, _)| !fresh.contains(path))
            .map(|(path, _)| ChangeEvent::new(path, ChangeKind::Removed)),
    );

    // A path shows up in at most one event, so this order is total.
    events.sort_by(|left, right| left.path.cmp(&right.path));
    Ok(events)
}

#[derive(Debug, Snafu)]
#[snafu(display("Cannot compare a {} snapshot with a {} snapshot", prior, fresh))]
pub struct AlgorithmMismatchError {
    prior: HashAlgorithm,
    fresh: HashAlgorithm,
}
