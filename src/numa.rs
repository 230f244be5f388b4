//! NUMA interleaving capability probe.
//!
//! `numactl` may be installed but unusable (no NUMA support in the kernel,
//! seccomp blocking `set_mempolicy`, ...). The only reliable check is to run
//! it around a no-op command and look at the exit status.

use crate::process::CommandProcessGroup;
use std::ffi::OsString;
use std::process::{Command, Stdio};

/// Decides whether a wrapper command can be used.
pub trait CapabilityProbe {
    /// True if `wrapper` can launch a program on this host.
    fn available(&self, wrapper: &[OsString]) -> bool;
}

/// Runs `wrapper... <no-op>` with all output discarded.
#[derive(Debug, Clone)]
pub struct NumactlProbe {
    noop: OsString,
}

impl NumactlProbe {
    pub fn new(noop: impl Into<OsString>) -> Self {
        Self { noop: noop.into() }
    }
}

impl Default for NumactlProbe {
    fn default() -> Self {
        Self::new("true")
    }
}

impl CapabilityProbe for NumactlProbe {
    fn available(&self, wrapper: &[OsString]) -> bool {
        let Some((program, args)) = wrapper.split_first() else {
            return false;
        };

        let status = Command::new(program)
            .args(args)
            .arg(&self.noop)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .in_new_process_group()
            .status();

        match status {
            Ok(status) => {
                tracing::debug!(
                    "NUMA probe {:?} exited with {:?}",
                    program,
                    status.code()
                );
                status.success()
            }
            Err(e) => {
                tracing::debug!("NUMA probe {:?} could not start: {}", program, e);
                false
            }
        }
    }
}

/// Probe with a fixed answer. An empty wrapper is still unavailable.
#[derive(Debug, Clone, Copy)]
pub struct FixedProbe(pub bool);

impl CapabilityProbe for FixedProbe {
    fn available(&self, wrapper: &[OsString]) -> bool {
        self.0 && !wrapper.is_empty()
    }
}
