//! Snapshots of the monitored tree, their comparison and their storage.

mod diff;
mod snapshot;
mod store;

pub use diff::{AlgorithmMismatchError, ChangeEvent, ChangeKind, diff};
pub use snapshot::{Snapshot, SnapshotBuildError, SnapshotBuilder};
pub use store::{SnapshotLoadError, SnapshotPersistError, SnapshotStore};
