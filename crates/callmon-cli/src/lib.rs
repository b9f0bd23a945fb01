//! Command-line runtime for the call monitor client.
//!
//! The runtime splits leading configuration flags from the subcommand, loads
//! layered configuration, installs logging and then either watches a live
//! monitor connection or replays a captured stream. Streams and the
//! configuration loader are injectable so tests can drive the whole runtime.

use std::ffi::OsString;
use std::fmt::Display;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;
use std::process::ExitCode;
use std::sync::mpsc;

use callmon::{
    CallMonitor, LineReader, MonitorError, PhoneEvent, Subscription, TransportEvent, decode,
};
use callmon_config::Config;
use clap::Parser;
use tracing::{debug, info};

mod cli;
mod config;
mod errors;
mod output;
pub mod telemetry;

use cli::{Cli, CliCommand};
pub use cli::{OutputFormat, ResolvedOutputFormat};
use config::{ConfigLoader, OrthoConfigLoader, split_config_arguments};
pub use errors::AppError;
use output::EventWriter;

const CLI_TARGET: &str = concat!(env!("CARGO_CRATE_NAME"), "::run");

/// CLI flags recognised by the configuration loader.
///
/// MAINTENANCE: keep in sync with the fields of `callmon_config::Config`.
const CONFIG_CLI_FLAGS: &[&str] = &[
    "--config-path",
    "--host",
    "--port",
    "--line-delimiter",
    "--connect-timeout-secs",
    "--idle-timeout-secs",
    "--log-filter",
    "--log-format",
];

/// Bundles the IO streams provided to the CLI runtime.
pub(crate) struct IoStreams<'a, W: Write, E: Write> {
    pub(crate) stdout: &'a mut W,
    pub(crate) stderr: &'a mut E,
    stdout_is_terminal: bool,
}

impl<'a, W: Write, E: Write> IoStreams<'a, W, E> {
    pub(crate) const fn new(
        stdout: &'a mut W,
        stderr: &'a mut E,
        stdout_is_terminal: bool,
    ) -> Self {
        Self {
            stdout,
            stderr,
            stdout_is_terminal,
        }
    }
}

/// Runs the CLI using the provided arguments and IO handles.
#[must_use]
pub fn run<I, W, E>(
    args: I,
    stdout: &mut W,
    stderr: &mut E,
    stdout_is_terminal: bool,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    let mut io = IoStreams::new(stdout, stderr, stdout_is_terminal);
    run_with_loader(args, &mut io, &OrthoConfigLoader)
}

/// Runs the CLI with a custom configuration loader.
pub(crate) fn run_with_loader<I, W, E, L>(
    args: I,
    io: &mut IoStreams<'_, W, E>,
    loader: &L,
) -> ExitCode
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
        // Help and version requests are not failures.
        Err(error) if !error.use_stderr() => {
            report(io.stdout, &error);
            return ExitCode::SUCCESS;
        }
        Err(error) => return fail(io.stderr, &AppError::CliUsage(error)),
    };

    let result = loader
        .load(&split.config_arguments)
        .and_then(|config| {
            telemetry::initialise(&config)?;
            Ok(config)
        })
        .and_then(|config| execute(&cli.command, &config, io));

    match result {
        Ok(exit_code) => exit_code,
        Err(error) => fail(io.stderr, &error),
    }
}

fn execute<W, E>(
    command: &CliCommand,
    config: &Config,
    io: &mut IoStreams<'_, W, E>,
) -> Result<ExitCode, AppError>
where
    W: Write,
    E: Write,
{
    let format = command.output().resolve(io.stdout_is_terminal);
    let mut writer = EventWriter::new(&mut *io.stdout, format);
    match command {
        CliCommand::Watch { .. } => watch(config, &mut writer),
        CliCommand::Replay { path, .. } => replay(config, path.as_deref(), &mut writer),
    }
}

enum Notice {
    Phone(PhoneEvent),
    Transport(TransportEvent),
}

fn watch<W: Write>(
    config: &Config,
    writer: &mut EventWriter<'_, W>,
) -> Result<ExitCode, AppError> {
    let mut monitor = CallMonitor::from_config(config)?;

    // Handlers run on the reader thread; rendering stays on this one.
    let (sender, notices) = mpsc::channel();
    let phone_sender = sender.clone();
    monitor.on_phone(Subscription::Any, move |event| {
        forward(&phone_sender, Notice::Phone(event.clone()));
    });
    monitor.on_transport(Subscription::Any, move |event| {
        forward(&sender, Notice::Transport(event.clone()));
    });

    info!(target: CLI_TARGET, endpoint = %monitor.endpoint(), "watching call monitor");
    if let Err(error) = monitor.connect() {
        for notice in notices.try_iter() {
            render(writer, &notice)?;
        }
        return Err(error.into());
    }

    let mut had_error = false;
    for notice in &notices {
        render(writer, &notice)?;
        if let Notice::Transport(TransportEvent::Close { had_error: failed }) = notice {
            had_error = failed;
            break;
        }
    }
    monitor.wait()?;

    if had_error {
        return Err(AppError::StreamFailed);
    }
    Ok(ExitCode::SUCCESS)
}

fn forward(sender: &mpsc::Sender<Notice>, notice: Notice) {
    if sender.send(notice).is_err() {
        debug!(target: CLI_TARGET, "event receiver closed");
    }
}

fn render<W: Write>(writer: &mut EventWriter<'_, W>, notice: &Notice) -> Result<(), AppError> {
    match notice {
        Notice::Phone(event) => writer.phone(event),
        Notice::Transport(event) => writer.transport(event),
    }
}

fn replay<W: Write>(
    config: &Config,
    path: Option<&Path>,
    writer: &mut EventWriter<'_, W>,
) -> Result<ExitCode, AppError> {
    match path.filter(|candidate| *candidate != Path::new("-")) {
        Some(capture) => {
            let file = File::open(capture).map_err(|source| AppError::OpenCapture {
                path: capture.to_path_buf(),
                source,
            })?;
            replay_from(config, file, writer)
        }
        None => replay_from(config, io::stdin().lock(), writer),
    }
}

fn replay_from<R: Read, W: Write>(
    config: &Config,
    source: R,
    writer: &mut EventWriter<'_, W>,
) -> Result<ExitCode, AppError> {
    let lines = LineReader::with_delimiter(source, config.line_delimiter().as_bytes())
        .map_err(MonitorError::from)?;

    let mut decoded = 0_usize;
    for item in lines {
        let line = item.map_err(AppError::ReadCapture)?;
        if let Some(event) = decode(&line) {
            writer.phone(&event)?;
            decoded += 1;
        }
    }
    debug!(target: CLI_TARGET, decoded, "capture replayed");
    Ok(ExitCode::SUCCESS)
}

fn fail<E: Write>(stderr: &mut E, error: &AppError) -> ExitCode {
    report(stderr, error);
    ExitCode::FAILURE
}

fn report<S: Write>(stream: &mut S, message: &dyn Display) {
    if let Err(error) = writeln!(stream, "{message}") {
        debug!(target: CLI_TARGET, error = %error, "failed to write message");
    }
}

#[cfg(test)]
mod tests;
