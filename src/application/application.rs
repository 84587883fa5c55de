use std::sync::Arc;

use snafu::Snafu;
use snafu::prelude::*;
use tracing::{debug, info};

use crate::application::RuntimeConfig;
use crate::config::{ConfigCreationError, MonitorConfig};
use crate::ext::PathExt;
use crate::monitor::{
    CycleError, IntervalTrigger, Monitor, MonitorCreationError, OnceTrigger, Scheduler, Shutdown,
};
use crate::reporter::Reporter;

pub struct Application;

impl Application {
    pub async fn run(runtime: impl Into<RuntimeConfig>) -> Result<(), ApplicationError> {
        let runtime: RuntimeConfig = runtime.into();
        let config = MonitorConfig::read(runtime.config_path.as_deref(), runtime.overrides)
            .await
            .context(ConfigSnafu)?;
        debug!("Loaded config: {:?}", config);

        let shutdown = Shutdown::new();
        shutdown.install_signal_handlers().context(SignalSnafu)?;

        let reporter = Reporter::from_config(&config.reporter);
        let interval = config.interval;
        info!(
            "Monitoring {} every {:?} using {}",
            config.root.best_effort_path_display(),
            interval,
            config.hash_algorithm
        );

        let monitor = Monitor::new(Arc::new(config), reporter, shutdown.clone())
            .context(MonitorCreationSnafu)?;

        if runtime.once {
            match Scheduler::run(&monitor, &mut OnceTrigger::new()).await {
                None | Some(Err(CycleError::AbandonedError)) => {}
                Some(outcome) => {
                    outcome.context(CycleSnafu)?;
                }
            }
        } else {
            Scheduler::run(&monitor, &mut IntervalTrigger::new(interval, shutdown)).await;
        }

        Ok(())
    }
}

#[derive(Debug, Snafu)]
pub enum ApplicationError {
    #[snafu(display("Critical failure encountered during configuration stage"))]
    ConfigError { source: ConfigCreationError },
    #[snafu(display("Failed to install shutdown signal handlers"))]
    SignalError { source: std::io::Error },
    #[snafu(display("Critical failure encountered during monitor creation"))]
    MonitorCreationError { source: MonitorCreationError },
    #[snafu(display("Monitoring cycle failed"))]
    CycleError { source: CycleError },
}
