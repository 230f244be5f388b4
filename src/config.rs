//! Entrypoint configuration.
//!
//! Defaults describe the stock image: `mongod` runs as `mongodb` out of
//! `/data/db`, wrapped in `numactl --interleave=all` when that works, with
//! privileges dropped through `gosu`. An optional JSON file and individual
//! environment variables can override any of them; the environment wins.

use anyhow::{Context, Result as AnyResult};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{EntrypointError, Result};

pub const ENV_CONFIG_FILE: &str = "MONGO_ENTRYPOINT_CONFIG";
pub const ENV_DATA_DIR: &str = "MONGO_ENTRYPOINT_DATA_DIR";
pub const ENV_USER: &str = "MONGO_ENTRYPOINT_USER";
pub const ENV_SERVER_COMMAND: &str = "MONGO_ENTRYPOINT_SERVER_COMMAND";
pub const ENV_NUMA: &str = "MONGO_ENTRYPOINT_NUMA";
pub const ENV_PRIVILEGE_DROP: &str = "MONGO_ENTRYPOINT_PRIVILEGE_DROP";
pub const ENV_DRY_RUN: &str = "MONGO_ENTRYPOINT_DRY_RUN";

/// How the server process is moved off root.
///
/// In a config file this is either the same plain string the environment
/// variable takes (`"gosu"`, `"native"`) or the tagged form
/// `{"helper": {"program": "su-exec"}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "PrivilegeDropRepr")]
pub enum PrivilegeDrop {
    /// Exec `program <user> <command...>` and let it switch users.
    Helper { program: String },
    /// Switch groups, gid and uid in-process, then exec the command.
    Native,
}

impl Default for PrivilegeDrop {
    fn default() -> Self {
        Self::Helper {
            program: "gosu".to_string(),
        }
    }
}

impl FromStr for PrivilegeDrop {
    type Err = EntrypointError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "" => Err(EntrypointError::config("privilege drop helper must not be empty")),
            "native" => Ok(Self::Native),
            program => Ok(Self::Helper {
                program: program.to_string(),
            }),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PrivilegeDropRepr {
    Name(String),
    Tagged(TaggedPrivilegeDrop),
}

#[derive(Deserialize)]
#[serde(rename_all = "snake_case")]
enum TaggedPrivilegeDrop {
    Helper { program: String },
    Native,
}

impl TryFrom<PrivilegeDropRepr> for PrivilegeDrop {
    type Error = EntrypointError;

    fn try_from(repr: PrivilegeDropRepr) -> Result<Self> {
        match repr {
            PrivilegeDropRepr::Name(name) => name.parse(),
            PrivilegeDropRepr::Tagged(TaggedPrivilegeDrop::Helper { program }) => {
                if program.trim().is_empty() {
                    return Err(EntrypointError::config(
                        "privilege drop helper must not be empty",
                    ));
                }
                Ok(Self::Helper { program })
            }
            PrivilegeDropRepr::Tagged(TaggedPrivilegeDrop::Native) => Ok(Self::Native),
        }
    }
}

/// Environment facts the dispatcher needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntrypointConfig {
    /// Program name that selects the server path (exact match).
    pub server_command: String,
    /// Directory re-owned before the server starts.
    pub data_dir: PathBuf,
    /// Account the server runs as.
    pub user: String,
    /// Wrapper tokens placed in front of the server command. Empty disables.
    pub numa_wrapper: Vec<String>,
    /// No-op command appended to the wrapper to probe it.
    pub numa_probe_command: String,
    pub privilege_drop: PrivilegeDrop,
    /// Print the launch plan instead of acting on it.
    pub dry_run: bool,
}

impl Default for EntrypointConfig {
    fn default() -> Self {
        Self {
            server_command: "mongod".to_string(),
            data_dir: PathBuf::from("/data/db"),
            user: "mongodb".to_string(),
            numa_wrapper: vec!["numactl".to_string(), "--interleave=all".to_string()],
            numa_probe_command: "true".to_string(),
            privilege_drop: PrivilegeDrop::default(),
            dry_run: false,
        }
    }
}

impl EntrypointConfig {
    /// Load configuration from a JSON file. Missing fields keep defaults.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> AnyResult<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read configuration from {:?}", path.as_ref()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse configuration JSON in {:?}", path.as_ref()))?;

        Ok(config)
    }

    /// Build the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var_os(key))
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<OsString>,
    {
        let mut config = match lookup(ENV_CONFIG_FILE) {
            Some(path) if !path.is_empty() => Self::load_from_file(PathBuf::from(path))?,
            _ => Self::default(),
        };

        let text = |key: &str| -> Result<Option<String>> {
            match lookup(key) {
                None => Ok(None),
                Some(value) => value
                    .into_string()
                    .map(Some)
                    .map_err(|_| EntrypointError::config(format!("{} is not valid UTF-8", key))),
            }
        };

        if let Some(dir) = lookup(ENV_DATA_DIR) {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(user) = text(ENV_USER)? {
            config.user = user;
        }
        if let Some(command) = text(ENV_SERVER_COMMAND)? {
            config.server_command = command;
        }
        if let Some(numa) = text(ENV_NUMA)? {
            config.numa_wrapper = numa.split_whitespace().map(str::to_string).collect();
        }
        if let Some(drop) = text(ENV_PRIVILEGE_DROP)? {
            config.privilege_drop = drop.parse()?;
        }
        if let Some(flag) = text(ENV_DRY_RUN)? {
            config.dry_run = parse_flag(&flag);
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make the launch meaningless.
    pub fn validate(&self) -> Result<()> {
        if self.server_command.is_empty() {
            return Err(EntrypointError::config("server command must not be empty"));
        }
        if self.server_command.starts_with('-') {
            return Err(EntrypointError::config(
                "server command must not start with '-'",
            ));
        }
        if self.user.trim().is_empty() {
            return Err(EntrypointError::config("user must not be empty"));
        }
        if !self.data_dir.is_absolute() {
            return Err(EntrypointError::config(format!(
                "data directory must be absolute: {}",
                self.data_dir.display()
            )));
        }
        if let PrivilegeDrop::Helper { program } = &self.privilege_drop {
            if program.trim().is_empty() {
                return Err(EntrypointError::config(
                    "privilege drop helper must not be empty",
                ));
            }
        }
        Ok(())
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<OsString> {
        let map: HashMap<String, OsString> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), OsString::from(v)))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_match_stock_image() {
        let config = EntrypointConfig::from_lookup(lookup_from(&[])).expect("defaults");
        assert_eq!(config.server_command, "mongod");
        assert_eq!(config.data_dir, PathBuf::from("/data/db"));
        assert_eq!(config.user, "mongodb");
        assert_eq!(config.numa_wrapper, vec!["numactl", "--interleave=all"]);
        assert_eq!(config.numa_probe_command, "true");
        assert_eq!(
            config.privilege_drop,
            PrivilegeDrop::Helper {
                program: "gosu".into()
            }
        );
        assert!(!config.dry_run);
    }

    #[test]
    fn test_env_overrides() {
        let config = EntrypointConfig::from_lookup(lookup_from(&[
            (ENV_DATA_DIR, "/srv/mongo"),
            (ENV_USER, "mongo"),
            (ENV_NUMA, "  numactl   --interleave=0,1 "),
            (ENV_PRIVILEGE_DROP, "native"),
            (ENV_DRY_RUN, "TRUE"),
        ]))
        .expect("valid");

        assert_eq!(config.data_dir, PathBuf::from("/srv/mongo"));
        assert_eq!(config.user, "mongo");
        assert_eq!(config.numa_wrapper, vec!["numactl", "--interleave=0,1"]);
        assert_eq!(config.privilege_drop, PrivilegeDrop::Native);
        assert!(config.dry_run);
    }

    #[test]
    fn test_empty_numa_disables_wrapper() {
        let config =
            EntrypointConfig::from_lookup(lookup_from(&[(ENV_NUMA, "")])).expect("valid");
        assert!(config.numa_wrapper.is_empty());
    }

    #[test]
    fn test_relative_data_dir_rejected() {
        let result = EntrypointConfig::from_lookup(lookup_from(&[(ENV_DATA_DIR, "data/db")]));
        assert!(matches!(result, Err(EntrypointError::Config(_))));
    }

    #[test]
    fn test_flag_like_server_command_rejected() {
        let result =
            EntrypointConfig::from_lookup(lookup_from(&[(ENV_SERVER_COMMAND, "--mongod")]));
        assert!(matches!(result, Err(EntrypointError::Config(_))));
    }

    #[test]
    fn test_privilege_drop_parse() {
        assert_eq!("native".parse::<PrivilegeDrop>().ok(), Some(PrivilegeDrop::Native));
        assert_eq!(
            "su-exec".parse::<PrivilegeDrop>().ok(),
            Some(PrivilegeDrop::Helper {
                program: "su-exec".into()
            })
        );
        assert!(" ".parse::<PrivilegeDrop>().is_err());
    }

    #[test]
    fn test_file_then_env_layering() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(
            file,
            r#"{{"user": "db", "data_dir": "/var/lib/mongo", "privilege_drop": "native"}}"#
        )
        .expect("write");

        let path = file.path().to_string_lossy().into_owned();
        let config = EntrypointConfig::from_lookup(lookup_from(&[
            (ENV_CONFIG_FILE, path.as_str()),
            (ENV_USER, "override"),
        ]))
        .expect("valid");

        assert_eq!(config.user, "override");
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/mongo"));
        assert_eq!(config.privilege_drop, PrivilegeDrop::Native);
        assert_eq!(config.server_command, "mongod");
    }

    #[test]
    fn test_missing_config_file_is_config_error() {
        let result = EntrypointConfig::from_lookup(lookup_from(&[(
            ENV_CONFIG_FILE,
            "/nonexistent/entrypoint.json",
        )]));
        assert!(matches!(result, Err(EntrypointError::Config(_))));
    }

    fn parse_drop(json: &str) -> std::result::Result<PrivilegeDrop, serde_json::Error> {
        serde_json::from_str(json)
    }

    #[test]
    fn test_file_accepts_plain_helper_name() {
        assert_eq!(
            parse_drop(r#""su-exec""#).expect("plain name"),
            PrivilegeDrop::Helper {
                program: "su-exec".into()
            }
        );
        assert_eq!(parse_drop(r#""native""#).expect("plain name"), PrivilegeDrop::Native);
        assert_eq!(
            parse_drop(r#"{"helper": {"program": "su-exec"}}"#).expect("tagged"),
            PrivilegeDrop::Helper {
                program: "su-exec".into()
            }
        );
        assert!(parse_drop(r#""  ""#).is_err());
    }

    #[test]
    fn test_file_and_env_forms_agree() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, r#"{{"privilege_drop": "su-exec"}}"#).expect("write");
        let path = file.path().to_string_lossy().into_owned();

        let from_file =
            EntrypointConfig::from_lookup(lookup_from(&[(ENV_CONFIG_FILE, path.as_str())]))
                .expect("valid");
        let from_env =
            EntrypointConfig::from_lookup(lookup_from(&[(ENV_PRIVILEGE_DROP, "su-exec")]))
                .expect("valid");

        assert_eq!(from_file.privilege_drop, from_env.privilege_drop);
    }

    #[test]
    fn test_serialized_config_loads_back() {
        let config = EntrypointConfig {
            privilege_drop: PrivilegeDrop::Helper {
                program: "su-exec".into(),
            },
            ..EntrypointConfig::default()
        };
        let json = serde_json::to_string(&config).expect("serialize");
        let loaded: EntrypointConfig = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_helper_serializes_externally_tagged() {
        let config = EntrypointConfig::default();
        let json = serde_json::to_value(&config).expect("serialize");
        assert_eq!(json["privilege_drop"]["helper"]["program"], "gosu");
    }
}
