//! Moving the server process off root.
//!
//! With a helper (gosu, su-exec, ...) the drop happens in the helper: we just
//! exec `helper <user> <command...>`. The native path switches supplementary
//! groups, gid and uid in this process right before exec.

use crate::command_line::CommandLine;
use crate::error::{EntrypointError, Result};
use crate::ownership::resolve_user;
use nix::unistd::{self, User};
use std::ffi::CString;

/// Command line that runs `command` as `user` through `helper`.
pub fn helper_command(helper: &str, user: &str, command: CommandLine) -> CommandLine {
    command.prepend([helper, user])
}

/// Switch this process to `user_name`. Returns the account switched to.
///
/// Order matters: groups and gid must change while we are still root.
/// If we already run as the target uid nothing is changed.
pub fn drop_privileges(user_name: &str) -> Result<User> {
    let user = resolve_user(user_name)?;

    if unistd::geteuid() == user.uid {
        tracing::debug!("Already running as {}, no privilege change", user_name);
        return Ok(user);
    }

    let c_name = CString::new(user_name)
        .map_err(|e| EntrypointError::privilege_drop(user_name, e))?;

    unistd::initgroups(&c_name, user.gid)
        .map_err(|e| EntrypointError::privilege_drop(user_name, format!("initgroups: {}", e)))?;
    unistd::setgid(user.gid)
        .map_err(|e| EntrypointError::privilege_drop(user_name, format!("setgid: {}", e)))?;
    unistd::setuid(user.uid)
        .map_err(|e| EntrypointError::privilege_drop(user_name, format!("setuid: {}", e)))?;

    tracing::debug!(
        "Dropped privileges to {} (uid={}, gid={})",
        user_name,
        user.uid,
        user.gid
    );
    Ok(user)
}
