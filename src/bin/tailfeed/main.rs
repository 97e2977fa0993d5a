// SPDX-License-Identifier: Apache-2.0

use std::error::Error;
use std::process::ExitCode;
use std::time::Duration;

use bytes::Bytes;
use clap::Parser;
use tokio::io::AsyncWriteExt;
use tokio::select;
use tokio::signal::unix::{SignalKind, signal};
use tokio::task::JoinSet;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tower::BoxError;
use tracing::metadata::LevelFilter;
use tracing::{debug, error, info, warn};
use tracing_log::LogTracer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Registry};

use tailfeed::bounded_channel;
use tailfeed::init::args::FileSourceArgs;
use tailfeed::init::wait;
use tailfeed::monitor::MonitorChannel;
use tailfeed::sinks::QueueSink;
use tailfeed::sources::file::FileSource;

const SENDING_QUEUE_SIZE: usize = 1_000;

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, clap::Subcommand)]
enum Commands {
    /// Run the file source
    Start(Box<SourceRun>),

    /// Return version
    Version,
}

#[derive(Debug, clap::Args)]
struct SourceRun {
    #[command(flatten)]
    source: FileSourceArgs,
}

#[derive(Debug, Parser)]
#[command(name = "tailfeed")]
#[command(bin_name = "tailfeed")]
#[command(version, about, long_about = None)]
#[command(subcommand_required = true)]
struct Arguments {
    #[command(subcommand)]
    command: Option<Commands>,
}

fn main() -> ExitCode {
    let opt = Arguments::parse();

    match opt.command {
        Some(Commands::Version) => {
            println!("{}", get_version())
        }
        Some(Commands::Start(run)) => {
            let _guard = match setup_logging() {
                Ok(guard) => guard,
                Err(e) => {
                    eprintln!("ERROR: failed to setup logging: {}", e);
                    return ExitCode::from(1);
                }
            };

            match run_source(run) {
                Ok(_) => {}
                Err(e) => {
                    error!(error = e, "Failed to run source.");
                    return ExitCode::from(1);
                }
            }
        }
        _ => {
            // it shouldn't be possible to get here since we mark a subcommand
            // as required
            error!("Must specify a command");
            return ExitCode::from(2);
        }
    }

    ExitCode::SUCCESS
}

#[tokio::main]
async fn run_source(run: Box<SourceRun>) -> Result<(), Box<dyn Error + Send + Sync>> {
    let config = run.source.build_config()?;

    let mut task_set: JoinSet<Result<(), BoxError>> = JoinSet::new();
    let cancel_token = CancellationToken::new();

    // The downstream queue, drained to stdout by a trivial consumer standing
    // in for an external pipeline.
    let (line_tx, mut line_rx) = bounded_channel::bounded::<Bytes>(SENDING_QUEUE_SIZE);
    task_set.spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(line) = line_rx.next().await {
            stdout.write_all(&line).await?;
        }
        stdout.flush().await?;
        Ok(())
    });

    let (mut monitor, control) = MonitorChannel::new().into_parts();
    let source = FileSource::new(config, QueueSink::new(line_tx));
    source.start(&mut task_set, &cancel_token, control);

    let mut sig_usr1 = sig(SignalKind::user_defined1());
    loop {
        select! {
            _ = signal_wait() => {
                info!("Shutdown signal received.");
                cancel_token.cancel();
                break;
            },
            _ = sig_usr1.recv() => {
                info!("Signal SIGUSR1 received, clearing source stats");
                monitor.clear_stats();
            },
            stats = monitor.next_stats() => {
                match stats {
                    Some(stats) => debug!(
                        name = %stats.name,
                        received = stats.messages_received,
                        sent = stats.messages_sent,
                        running = stats.running,
                        "Source stats"
                    ),
                    None => {
                        debug!("Stats channel closed");
                        cancel_token.cancel();
                        break;
                    }
                }
            },
            e = wait::wait_for_any_task(&mut task_set) => {
                match e {
                    Ok(()) => warn!("Unexpected early exit of task."),
                    Err(e) => return Err(e),
                }
                cancel_token.cancel();
                break;
            },
        }
    }

    // The source blocks on the terminal handoff: always accept it.
    match timeout(SHUTDOWN_TIMEOUT, monitor.final_stats()).await {
        Ok(Some(stats)) => info!(
            name = %stats.name,
            received = stats.messages_received,
            sent = stats.messages_sent,
            running = stats.running,
            "Final source stats"
        ),
        Ok(None) => debug!("Source ended without final stats"),
        Err(_) => warn!("Timed out waiting for final stats"),
    }

    wait::wait_for_tasks_with_timeout(&mut task_set, SHUTDOWN_TIMEOUT).await?;

    Ok(())
}

type LoggerGuard = tracing_appender::non_blocking::WorkerGuard;

fn setup_logging() -> Result<LoggerGuard, BoxError> {
    LogTracer::init().expect("Unable to setup log tracer!");

    // Logs go to stderr so the line stream on stdout stays clean.
    let (non_blocking_writer, guard) = tracing_appender::non_blocking(std::io::stderr());

    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env()?;

    use std::io::IsTerminal;

    // Skip color codes when not in a terminal
    let use_ansi = std::io::stderr().is_terminal();

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_writer)
        .with_target(false)
        .with_level(true)
        .with_ansi(use_ansi)
        .compact();

    let subscriber = Registry::default().with(filter).with(fmt_layer);
    tracing::subscriber::set_global_default(subscriber).unwrap();

    Ok(guard)
}

fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

async fn signal_wait() {
    let mut sig_term = sig(SignalKind::terminate());
    let mut sig_int = sig(SignalKind::interrupt());

    select! {
        _ = sig_term.recv() => {},
        _ = sig_int.recv() => {},
    }
}

fn sig(kind: SignalKind) -> tokio::signal::unix::Signal {
    signal(kind).unwrap()
}
