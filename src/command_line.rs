//! The argument vector the entrypoint was invoked with.
//!
//! `CommandLine` is never empty: construction rejects an empty argument list,
//! and every transformation builds a new list from the old one.

use crate::error::{EntrypointError, Result};
use serde::{Serialize, Serializer};
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::os::unix::ffi::OsStrExt;

/// An ordered, non-empty program invocation (`args[0]` is the program).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    args: Vec<OsString>,
}

impl CommandLine {
    /// Build a command line from raw arguments.
    ///
    /// Arguments are kept byte-for-byte, including non-UTF-8 values.
    pub fn from_args<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        let args: Vec<OsString> = args.into_iter().map(Into::into).collect();
        if args.is_empty() {
            return Err(EntrypointError::NoCommand);
        }
        Ok(Self { args })
    }

    /// The program to run.
    pub fn program(&self) -> &OsStr {
        &self.args[0]
    }

    /// Arguments after the program.
    pub fn args(&self) -> &[OsString] {
        &self.args[1..]
    }

    /// The full argument vector, program included.
    pub fn as_slice(&self) -> &[OsString] {
        &self.args
    }

    /// True if the first argument looks like an option rather than a command.
    pub fn starts_with_flag(&self) -> bool {
        self.program().as_bytes().first() == Some(&b'-')
    }

    /// Exact, case-sensitive match of the program name.
    pub fn is_command(&self, name: &str) -> bool {
        self.program() == OsStr::new(name)
    }

    /// Treat a leading flag as arguments to `server_command`.
    pub fn resolve(self, server_command: &str) -> Self {
        if self.starts_with_flag() {
            self.prepend([server_command])
        } else {
            self
        }
    }

    /// New command line with `tokens` placed in front of the current one.
    pub fn prepend<I, S>(self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        let mut args: Vec<OsString> = tokens.into_iter().map(Into::into).collect();
        args.extend(self.args);
        Self { args }
    }

    pub fn into_vec(self) -> Vec<OsString> {
        self.args
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for arg in &self.args {
            if !first {
                f.write_str(" ")?;
            }
            first = false;
            write!(f, "{}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

impl Serialize for CommandLine {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(self.args.iter().map(|a| a.to_string_lossy()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::ffi::OsStringExt;

    fn cmd(args: &[&str]) -> CommandLine {
        CommandLine::from_args(args.iter().copied()).expect("non-empty")
    }

    #[test]
    fn test_empty_is_rejected() {
        let result = CommandLine::from_args(Vec::<String>::new());
        assert!(matches!(result, Err(EntrypointError::NoCommand)));
    }

    #[test]
    fn test_leading_flag_gets_server_command() {
        let resolved = cmd(&["--port", "27018"]).resolve("mongod");
        assert_eq!(resolved, cmd(&["mongod", "--port", "27018"]));
    }

    #[test]
    fn test_single_dash_counts_as_flag() {
        let resolved = cmd(&["-v"]).resolve("mongod");
        assert!(resolved.is_command("mongod"));
        assert_eq!(resolved.args(), &[OsString::from("-v")]);
    }

    #[test]
    fn test_command_is_left_alone() {
        let resolved = cmd(&["bash", "-c", "true"]).resolve("mongod");
        assert_eq!(resolved, cmd(&["bash", "-c", "true"]));
    }

    #[test]
    fn test_empty_program_is_not_a_flag() {
        let line = cmd(&[""]);
        assert!(!line.starts_with_flag());
        assert_eq!(line.clone().resolve("mongod"), line);
    }

    #[test]
    fn test_is_command_is_case_sensitive() {
        assert!(cmd(&["mongod"]).is_command("mongod"));
        assert!(!cmd(&["Mongod"]).is_command("mongod"));
        assert!(!cmd(&["/usr/bin/mongod"]).is_command("mongod"));
    }

    #[test]
    fn test_prepend_keeps_order() {
        let line = cmd(&["mongod", "--bind_ip_all"]).prepend(["numactl", "--interleave=all"]);
        assert_eq!(
            line,
            cmd(&["numactl", "--interleave=all", "mongod", "--bind_ip_all"])
        );
    }

    #[test]
    fn test_non_utf8_arguments_survive() {
        let raw = OsString::from_vec(vec![b'-', 0xff, 0xfe]);
        let line = CommandLine::from_args([raw.clone()]).expect("non-empty");
        let resolved = line.resolve("mongod");
        assert_eq!(resolved.args(), &[raw]);
    }

    #[test]
    fn test_display_joins_with_spaces() {
        assert_eq!(cmd(&["gosu", "mongodb", "mongod"]).to_string(), "gosu mongodb mongod");
    }

    #[test]
    fn test_serializes_as_string_array() {
        let json = serde_json::to_string(&cmd(&["mongod", "--port", "1"])).expect("serialize");
        assert_eq!(json, r#"["mongod","--port","1"]"#);
    }
}
