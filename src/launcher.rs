//! Carries out an invocation in order: ownership fix-up, NUMA check and
//! wrapping, optional native privilege drop, then process replacement.

use crate::command_line::CommandLine;
use crate::config::EntrypointConfig;
use crate::dispatch::{route, server_plan, LaunchPlan, Route};
use crate::error::Result;
use crate::numa::CapabilityProbe;
use crate::ownership::fix_ownership;
use crate::privilege::drop_privileges;
use crate::process::{command_for, replace_process};
use std::convert::Infallible;

/// Runs invocations against one configuration and capability probe.
pub struct Launcher<'a> {
    config: &'a EntrypointConfig,
    probe: &'a dyn CapabilityProbe,
}

impl<'a> Launcher<'a> {
    pub fn new(config: &'a EntrypointConfig, probe: &'a dyn CapabilityProbe) -> Self {
        Self { config, probe }
    }

    /// Launch `args`. Only returns on failure.
    ///
    /// The data directory is re-owned before the probe runs, so a failed
    /// fix-up aborts without spawning anything.
    pub fn launch(&self, args: CommandLine) -> Result<Infallible> {
        let route = route(args, self.config);

        if let Some(fix) = route.ownership(self.config) {
            fix_ownership(&fix.data_dir, &fix.user)?;
        }

        let plan = match route {
            Route::Server(args) => server_plan(args, self.config, self.probe),
            Route::Passthrough(args) => LaunchPlan::passthrough(args),
        };

        exec_plan(&plan)
    }
}

/// Drop privileges natively if the plan asks for it, then exec.
fn exec_plan(plan: &LaunchPlan) -> Result<Infallible> {
    let mut cmd = command_for(&plan.command);

    if plan.needs_native_drop() {
        if let Some(run_as) = &plan.run_as {
            let user = drop_privileges(&run_as.user)?;
            cmd.env("HOME", &user.dir);
        }
    }

    tracing::info!("exec: {}", plan.command);
    Err(replace_process(cmd))
}
