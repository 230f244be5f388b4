//! docker-entrypoint - container entry point for mongod
//!
//! Every argument is forwarded untouched; the entrypoint has no options of
//! its own and is configured through `MONGO_ENTRYPOINT_*` variables.

use std::io::IsTerminal;
use std::process::ExitCode;

use mongo_entrypoint::{plan, CommandLine, EntrypointConfig, Launcher, NumactlProbe, Result};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Initialize the logger. Output goes to stderr so the workload keeps stdout.
fn init_logger() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    // RUST_LOG overrides the default level; colour only on a terminal
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .try_init();
}

fn main() -> ExitCode {
    init_logger();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("docker-entrypoint: {}", e);
            ExitCode::from(u8::try_from(e.exit_code()).unwrap_or(1))
        }
    }
}

fn run() -> Result<()> {
    let config = EntrypointConfig::from_env()?;
    debug!("Configuration: {:?}", config);

    let args = CommandLine::from_args(std::env::args_os().skip(1))?;
    let probe = NumactlProbe::new(&config.numa_probe_command);

    if config.dry_run {
        let plan = plan(args, &config, &probe);
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    match Launcher::new(&config, &probe).launch(args)? {}
}
