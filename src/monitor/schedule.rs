use std::time::{Duration, Instant};

use tracing::{debug, error, info};

use crate::monitor::{CycleError, CycleSummary, Monitor, Shutdown};
use crate::reporter::ReporterTrait;

/// Slice used while waiting for the next tick, so shutdown stays responsive.
const POLL_SLICE: Duration = Duration::from_secs(1);

/// Decides when the next cycle starts.
pub trait Trigger {
    /// Waits for the next tick. `false` means no further cycles should run.
    async fn next(&mut self) -> bool;
}

/// Fires exactly once.
#[derive(Debug, Default)]
pub struct OnceTrigger {
    fired: bool,
}

impl OnceTrigger {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Trigger for OnceTrigger {
    async fn next(&mut self) -> bool {
        !std::mem::replace(&mut self.fired, true)
    }
}

/// Fires immediately, then once per interval measured from the end of the
/// previous cycle. Ticks missed while a cycle runs long are dropped.
#[derive(Debug)]
pub struct IntervalTrigger {
    interval: Duration,
    shutdown: Shutdown,
    fired: bool,
}

impl IntervalTrigger {
    pub fn new(interval: Duration, shutdown: Shutdown) -> Self {
        Self {
            interval,
            shutdown,
            fired: false,
        }
    }
}

impl Trigger for IntervalTrigger {
    async fn next(&mut self) -> bool {
        if self.shutdown.is_requested() {
            return false;
        }
        if !std::mem::replace(&mut self.fired, true) {
            return true;
        }

        let deadline = Instant::now() + self.interval;
        loop {
            let now = Instant::now();
            if now >= deadline {
                return !self.shutdown.is_requested();
            }
            compio::time::sleep(POLL_SLICE.min(deadline - now)).await;
            if self.shutdown.is_requested() {
                return false;
            }
        }
    }
}

pub struct Scheduler;

impl Scheduler {
    /// Runs cycles until the trigger stops. Failed cycles are logged and the
    /// schedule continues; the outcome of the last cycle is returned.
    pub async fn run<R: ReporterTrait, T: Trigger>(
        monitor: &Monitor<R>,
        trigger: &mut T,
    ) -> Option<Result<CycleSummary, CycleError>> {
        let mut last = None;
        let mut cycles = 0usize;

        while trigger.next().await {
            cycles += 1;
            debug!("Starting cycle {}", cycles);
            let outcome = monitor.run_cycle().await;
            match &outcome {
                Ok(_) => {}
                Err(CycleError::AbandonedError) => {
                    info!("Shutdown requested, cycle abandoned");
                }
                Err(error) => {
                    error!("Cycle failed: {}", snafu::Report::from_error(error));
                }
            }
            last = Some(outcome);
        }

        info!("Monitoring stopped after {} cycles", cycles);
        last
    }
}
