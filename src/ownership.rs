//! Recursive ownership fix-up for the data directory.
//!
//! Behaves like `chown -R <user> <dir>`: only the owner changes, group
//! ownership is left alone, and symlinks below the root are re-owned
//! themselves rather than followed.

use crate::error::{EntrypointError, Result};
use nix::unistd::{Uid, User};
use std::os::unix::fs::{chown, lchown};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Summary of a completed ownership walk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OwnershipReport {
    /// Entries whose owner was set, root included.
    pub entries: usize,
}

/// Look up an account in the user database.
pub fn resolve_user(name: &str) -> Result<User> {
    match User::from_name(name) {
        Ok(Some(user)) => Ok(user),
        Ok(None) => Err(EntrypointError::UnknownUser(name.to_string())),
        Err(errno) => Err(EntrypointError::Io(errno.into())),
    }
}

/// Give `dir` and everything under it to `uid`.
///
/// Stops at the first failure and reports the offending path.
pub fn change_owner_recursive(dir: &Path, uid: Uid) -> Result<OwnershipReport> {
    let mut report = OwnershipReport::default();

    for entry in WalkDir::new(dir).follow_links(false) {
        let entry = entry.map_err(|e| {
            let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| dir.to_path_buf());
            ownership_error(path, e.into())
        })?;

        let changed = if entry.depth() == 0 {
            chown(entry.path(), Some(uid.as_raw()), None)
        } else {
            lchown(entry.path(), Some(uid.as_raw()), None)
        };
        changed.map_err(|e| ownership_error(entry.path().to_path_buf(), e))?;

        report.entries += 1;
    }

    tracing::debug!(
        "Changed owner of {} entries under {} to uid {}",
        report.entries,
        dir.display(),
        uid
    );
    Ok(report)
}

/// Resolve `user` and hand `dir` over to it.
pub fn fix_ownership(dir: &Path, user: &str) -> Result<OwnershipReport> {
    let account = resolve_user(user)?;
    tracing::info!("Changing ownership of {} to {}", dir.display(), user);
    change_owner_recursive(dir, account.uid)
}

fn ownership_error(path: PathBuf, source: std::io::Error) -> EntrypointError {
    EntrypointError::Ownership { path, source }
}
