mod cli;
mod commands;
mod context;

use clap::Parser;

use cli::{Cli, Command};
use context::Context;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => cli.log_level.as_str(),
        1 => "debug",
        _ => "trace",
    };
    let env_filter = tracing_subscriber::EnvFilter::try_new(level)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));

    // Hold the non-blocking guards for the lifetime of main so logs flush on exit.
    let _log_guards = init_logging(env_filter, cli.log_file.as_deref())?;

    let ctx = Context::from_cli(&cli)?;
    match &cli.command {
        Command::RequestCert(args) => commands::request_cert::run(&ctx, args),
        Command::Check => commands::check::run(&ctx),
        Command::Environment { name } => commands::environment::run(&ctx, name.as_deref()),
        Command::Status => commands::status::run(&ctx),
    }
}

/// Log file mode: logs name SSL paths and the CA, so keep them from other users.
#[cfg(unix)]
const LOG_FILE_MODE: u32 = 0o640;

/// Terse stderr for interactive runs; timestamped lines in `--log-file`.
fn init_logging(
    env_filter: tracing_subscriber::EnvFilter,
    log_file: Option<&std::path::Path>,
) -> anyhow::Result<Vec<tracing_appender::non_blocking::WorkerGuard>> {
    use anyhow::Context as _;
    use tracing_subscriber::prelude::*;

    let (nb_stderr, stderr_guard) = tracing_appender::non_blocking(std::io::stderr());
    let stderr_layer = tracing_subscriber::fmt::layer()
        .without_time()
        .with_target(false)
        .with_writer(nb_stderr);

    let Some(path) = log_file else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
        return Ok(vec![stderr_guard]);
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating log directory {}", parent.display()))?;
    }
    let mut options = std::fs::OpenOptions::new();
    options.create(true).append(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(LOG_FILE_MODE);
    }
    let file = options
        .open(path)
        .with_context(|| format!("opening log file {}", path.display()))?;
    let (nb_file, file_guard) = tracing_appender::non_blocking(file);
    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(nb_file);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    Ok(vec![stderr_guard, file_guard])
}
