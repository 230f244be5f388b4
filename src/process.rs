//! Child process setup and process image replacement.
//!
//! The entrypoint only ever starts one short-lived child (the NUMA probe).
//! That child runs in its own process group and is tied to our lifetime
//! with `PR_SET_PDEATHSIG`, so a probe that hangs cannot outlive us.
//! Everything else ends in `exec`, which replaces this process outright.

use crate::command_line::CommandLine;
use crate::error::EntrypointError;
use nix::libc;
use nix::unistd::Pid;
use std::os::unix::process::CommandExt;
use std::process::Command;

/// Extension trait for std::process::Command to isolate short-lived children
pub trait CommandProcessGroup {
    /// Run the child in its own process group and have the kernel send it
    /// SIGTERM if the entrypoint dies first.
    fn in_new_process_group(&mut self) -> &mut Self;
}

impl CommandProcessGroup for Command {
    fn in_new_process_group(&mut self) -> &mut Self {
        unsafe {
            self.pre_exec(|| {
                nix::unistd::setpgid(Pid::from_raw(0), Pid::from_raw(0))
                    .map_err(std::io::Error::from)?;

                if libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGTERM) == -1 {
                    return Err(std::io::Error::last_os_error());
                }

                Ok(())
            });
        }
        self
    }
}

/// Build the `Command` for a command line, resolving the program via `PATH`.
pub fn command_for(line: &CommandLine) -> Command {
    let mut cmd = Command::new(line.program());
    cmd.args(line.args());
    cmd
}

/// Replace the current process image with `cmd`.
///
/// Environment, working directory and open standard streams are inherited.
/// On success this never returns; the returned value is always the reason
/// the exec failed.
pub fn replace_process(mut cmd: Command) -> EntrypointError {
    let program = cmd.get_program().to_string_lossy().into_owned();
    let source = cmd.exec();
    EntrypointError::Exec { program, source }
}
