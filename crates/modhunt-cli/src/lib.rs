//! Command-line runtime for the `modhunt` crash finder.
//!
//! The module owns argument parsing, configuration bootstrapping, telemetry,
//! signal-driven cancellation, and rendering. It is exercised both from the
//! binary entrypoint and from tests where configuration loading and IO
//! streams are substituted.

use std::ffi::OsString;
use std::io::{self, Write};
use std::process::ExitCode;

use clap::Parser;
use modhunt_config::Config;
use modhunt_core::{
    ArchiveStore, CancellationToken, HostProcess, HuntReport, HuntReporter, HuntSettings,
    JarManifestReader, Orchestrator, StructuredHuntReporter, ToggleState,
};
use serde::Serialize;
use tracing::info;

mod cli;
mod config;
mod errors;
mod output;
mod signals;
mod telemetry;

use cli::{Cli, CliCommand, OutputFormat};
pub(crate) use config::{ConfigLoader, OrthoConfigLoader};
use config::split_config_arguments;
pub(crate) use errors::AppError;
use output::{ConsoleReporter, exit_code, render_report, write_json};

/// Tracing target for CLI events.
const CLI_TARGET: &str = "modhunt::cli";

/// Bundles the IO streams provided to the CLI runtime.
struct IoStreams<'a, W: Write, E: Write> {
    stdout: &'a mut W,
    stderr: &'a mut E,
}

/// Runs the CLI using the provided arguments and IO handles.
#[must_use]
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    let mut io = IoStreams { stdout, stderr };
    run_with_loader(args, &mut io, &OrthoConfigLoader)
}

fn run_with_loader<I, W, E, L>(args: I, io: &mut IoStreams<'_, W, E>, loader: &L) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    let arguments: Vec<OsString> = args.into_iter().collect();
    let split = split_config_arguments(&arguments);

    let cli = match Cli::try_parse_from(&split.command_arguments) {
        Ok(cli) => cli,
        Err(error) if !error.use_stderr() => {
            return match write!(io.stdout, "{error}") {
                Ok(()) => ExitCode::SUCCESS,
                Err(_) => ExitCode::FAILURE,
            };
        }
        Err(error) => return report_failure(io, &AppError::CliUsage(error)),
    };

    let result = loader.load(&split.config_arguments).and_then(|config| {
        telemetry::initialise(&config, cli.output)?;
        dispatch(&cli, &config, io)
    });
    match result {
        Ok(code) => code,
        Err(error) => report_failure(io, &error),
    }
}

fn report_failure<W: Write, E: Write>(io: &mut IoStreams<'_, W, E>, error: &AppError) -> ExitCode {
    if writeln!(io.stderr, "modhunt: {error}").is_err() {
        tracing::error!(target: CLI_TARGET, %error, "command failed");
    }
    ExitCode::FAILURE
}

fn dispatch<W: Write, E: Write>(
    cli: &Cli,
    config: &Config,
    io: &mut IoStreams<'_, W, E>,
) -> Result<ExitCode, AppError> {
    match cli.command() {
        CliCommand::Hunt => hunt(config, cli.output, io),
        CliCommand::Restore => restore(config, cli.output, io),
        CliCommand::List => list(config, cli.output, io),
    }
}

fn open_store(config: &Config) -> Result<ArchiveStore, AppError> {
    let store = ArchiveStore::open(config.mods_dir(), config.archive_extension())?;
    Ok(store)
}

fn hunt<W: Write, E: Write>(
    config: &Config,
    format: OutputFormat,
    io: &mut IoStreams<'_, W, E>,
) -> Result<ExitCode, AppError> {
    let store = open_store(config)?;
    let cancel = CancellationToken::new();
    let _signals = signals::install(&cancel).map_err(AppError::Signals)?;

    let host = HostProcess::new(config.server_root(), config.server_script())
        .with_settle_delay(config.settle_delay());
    let settings = HuntSettings {
        log_path: config.log_file().into_std_path_buf(),
        timeout: config.timeout(),
        crash_signature: config.crash_signature().to_owned(),
    };
    info!(
        target: CLI_TARGET,
        executable = %host.executable().display(),
        mods = %store.directory().display(),
        archives = store.len(),
        timeout_secs = config.timeout_secs(),
        "starting hunt"
    );

    let report = match format {
        OutputFormat::Human => run_hunt(
            store,
            &host,
            ConsoleReporter::new(&mut *io.stdout),
            settings,
            cancel,
        )?,
        OutputFormat::Json => run_hunt(
            store,
            &host,
            StructuredHuntReporter::new(),
            settings,
            cancel,
        )?,
    };
    render_report(io.stdout, format, &report)?;
    Ok(exit_code(&report))
}

fn run_hunt<R: HuntReporter>(
    store: ArchiveStore,
    host: &HostProcess,
    reporter: R,
    settings: HuntSettings,
    cancel: CancellationToken,
) -> Result<HuntReport, AppError> {
    let mut orchestrator =
        Orchestrator::new(store, host, JarManifestReader::new(), reporter, settings)
            .with_cancellation(cancel);
    Ok(orchestrator.run()?)
}

#[derive(Debug, Serialize)]
struct RestoreSummary {
    enabled: usize,
    total: usize,
}

fn restore<W: Write, E: Write>(
    config: &Config,
    format: OutputFormat,
    io: &mut IoStreams<'_, W, E>,
) -> Result<ExitCode, AppError> {
    let mut store = open_store(config)?;
    let enabled = store.enable_all();
    let summary = RestoreSummary {
        enabled,
        total: store.len(),
    };
    match format {
        OutputFormat::Json => write_json(io.stdout, &summary)?,
        OutputFormat::Human => writeln!(
            io.stdout,
            "Enabled {} archives; {} of {} now enabled.",
            summary.enabled,
            store.enabled().len(),
            summary.total
        )?,
    }
    Ok(ExitCode::SUCCESS)
}

#[derive(Debug, Serialize)]
struct ListedArchive {
    file_name: String,
    state: ToggleState,
    plugin_id: Option<String>,
}

fn list<W: Write, E: Write>(
    config: &Config,
    format: OutputFormat,
    io: &mut IoStreams<'_, W, E>,
) -> Result<ExitCode, AppError> {
    let store = open_store(config)?;
    let reader = JarManifestReader::new();
    let listed: Vec<ListedArchive> = store
        .archives()
        .iter()
        .map(|archive| ListedArchive {
            file_name: archive.file_name(),
            state: archive.state(),
            plugin_id: archive.plugin_id(&reader).map(str::to_owned),
        })
        .collect();

    match format {
        OutputFormat::Json => write_json(io.stdout, &listed)?,
        OutputFormat::Human => write_listing(io.stdout, &listed)?,
    }
    Ok(ExitCode::SUCCESS)
}

fn write_listing<W: Write>(out: &mut W, listed: &[ListedArchive]) -> io::Result<()> {
    if listed.is_empty() {
        return writeln!(out, "No archives found.");
    }
    for entry in listed {
        writeln!(
            out,
            "{:<8} {} ({})",
            entry.state.as_str(),
            entry.file_name,
            entry.plugin_id.as_deref().unwrap_or("unknown id")
        )?;
    }
    Ok(())
}
