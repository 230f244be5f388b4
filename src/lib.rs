//! MongoDB container entrypoint
//!
//! Decides whether the container was asked to run the database server or some
//! other command. The server gets its data directory re-owned, an optional
//! NUMA interleaving wrapper and a privilege drop; anything else is exec'd
//! as given.

pub mod command_line;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod launcher;
pub mod numa;
pub mod ownership;
pub mod privilege;
pub mod process;

pub use command_line::CommandLine;
pub use config::{EntrypointConfig, PrivilegeDrop};
pub use dispatch::{plan, route, server_plan, LaunchKind, LaunchPlan, OwnershipFix, Route, RunAs};
pub use error::{EntrypointError, Result};
pub use launcher::Launcher;
pub use numa::{CapabilityProbe, FixedProbe, NumactlProbe};
pub use ownership::{change_owner_recursive, fix_ownership, resolve_user, OwnershipReport};
pub use process::{replace_process, CommandProcessGroup};
