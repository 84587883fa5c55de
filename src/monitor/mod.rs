mod cycle;
mod monitor;
mod schedule;
mod shutdown;

pub use cycle::{CycleError, CyclePhase, CycleSummary};
pub use monitor::{Monitor, MonitorCreationError};
pub use schedule::{IntervalTrigger, OnceTrigger, Scheduler, Trigger};
pub use shutdown::Shutdown;
