//! Discovery and digesting of the files under the monitored root.

mod scanner;
mod walker;

pub use scanner::{ScanMerger, ScanOutcome, Scanner, ScannerCreationError};
pub use walker::{DiscoveredFile, ScanError, WalkOutcome, walk};
