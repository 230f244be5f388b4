//! The dispatch decision: server launch or verbatim pass-through.
//!
//! The decision comes in two halves. `route` applies the flag rewrite and
//! picks the branch without running anything. `server_plan` probes the NUMA
//! wrapper and adds the privilege drop; the launcher calls it only after the
//! data directory has been re-owned. Neither touches the filesystem or the
//! process credentials.

use crate::command_line::CommandLine;
use crate::config::{EntrypointConfig, PrivilegeDrop};
use crate::numa::CapabilityProbe;
use crate::privilege::helper_command;
use serde::Serialize;
use std::ffi::OsString;
use std::path::PathBuf;

/// Which branch the invocation took.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LaunchKind {
    /// The configured server command, prepared and privilege-dropped
    Server,
    /// Anything else, executed as given
    Passthrough,
}

/// Directory to hand over to the server account before launch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OwnershipFix {
    pub data_dir: PathBuf,
    pub user: String,
}

/// Account the final process runs as, and how we get there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunAs {
    pub user: String,
    pub privilege_drop: PrivilegeDrop,
}

/// Everything decided before the first side effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LaunchPlan {
    pub kind: LaunchKind,
    /// Exactly what gets exec'd.
    pub command: CommandLine,
    pub ownership: Option<OwnershipFix>,
    pub run_as: Option<RunAs>,
    /// Whether the NUMA wrapper was applied.
    pub numa: bool,
}

impl LaunchPlan {
    /// Plan for a command that is exec'd as given.
    pub fn passthrough(command: CommandLine) -> Self {
        Self {
            kind: LaunchKind::Passthrough,
            command,
            ownership: None,
            run_as: None,
            numa: false,
        }
    }

    /// True when the launcher must switch credentials itself before exec.
    pub fn needs_native_drop(&self) -> bool {
        matches!(
            self.run_as,
            Some(RunAs {
                privilege_drop: PrivilegeDrop::Native,
                ..
            })
        )
    }
}

/// First half of the decision: which branch `args` takes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Server command line, flag rewrite applied, not yet wrapped
    Server(CommandLine),
    Passthrough(CommandLine),
}

impl Route {
    /// Ownership fix-up this route requires before the server is prepared.
    pub fn ownership(&self, config: &EntrypointConfig) -> Option<OwnershipFix> {
        match self {
            Self::Server(_) => Some(OwnershipFix {
                data_dir: config.data_dir.clone(),
                user: config.user.clone(),
            }),
            Self::Passthrough(_) => None,
        }
    }
}

/// Apply the flag rewrite and pick the branch. Runs nothing.
pub fn route(args: CommandLine, config: &EntrypointConfig) -> Route {
    let args = args.resolve(&config.server_command);

    if args.is_command(&config.server_command) {
        Route::Server(args)
    } else {
        tracing::info!("Passing through to {}", args.program().to_string_lossy());
        Route::Passthrough(args)
    }
}

/// Second half for the server branch: NUMA probe and privilege drop wrapping.
///
/// The launcher calls this only after the data directory has been re-owned.
pub fn server_plan(
    args: CommandLine,
    config: &EntrypointConfig,
    probe: &dyn CapabilityProbe,
) -> LaunchPlan {
    let wrapper: Vec<OsString> = config.numa_wrapper.iter().map(OsString::from).collect();
    let numa = probe.available(&wrapper);
    let args = if numa {
        tracing::debug!("NUMA wrapper usable: {}", config.numa_wrapper.join(" "));
        args.prepend(wrapper)
    } else {
        args
    };

    let command = match &config.privilege_drop {
        PrivilegeDrop::Helper { program } => helper_command(program, &config.user, args),
        PrivilegeDrop::Native => args,
    };

    tracing::info!("Launching {} as {}", config.server_command, config.user);
    LaunchPlan {
        kind: LaunchKind::Server,
        command,
        ownership: Some(OwnershipFix {
            data_dir: config.data_dir.clone(),
            user: config.user.clone(),
        }),
        run_as: Some(RunAs {
            user: config.user.clone(),
            privilege_drop: config.privilege_drop.clone(),
        }),
        numa,
    }
}

/// The whole decision for `args` without any side effect except the probe.
/// Used for dry runs; the launcher interleaves the ownership fix-up.
pub fn plan(args: CommandLine, config: &EntrypointConfig, probe: &dyn CapabilityProbe) -> LaunchPlan {
    match route(args, config) {
        Route::Server(args) => server_plan(args, config, probe),
        Route::Passthrough(args) => LaunchPlan::passthrough(args),
    }
}
