//! fsedump
//!
//! Clones the Darwin `/dev/fsevents` device and prints every filesystem
//! event it reports, or decodes a previously captured byte stream.

mod cli;
mod config;
mod device;
mod present;
mod resolver;

use clap::Parser;
use cli::{Cli, Command};
use color_eyre::eyre::{Result, WrapErr, bail};
use config::Config;
use fsedump_protocol::{CaptureSource, ChunkSource, Decoder, StreamDriver, StreamStats};
use present::Presenter;
use resolver::SystemResolver;
use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config.as_ref())?
        .with_log_level(cli.log_level.clone())
        .with_pid_width(cli.pid_width)
        .with_no_carry_over(cli.no_carry_over);

    init_logging(&config.log_level)?;

    match cli.command {
        Command::Watch {
            device,
            queue_depth,
            capture,
        } => {
            let config = config.with_device(device).with_queue_depth(queue_depth);
            cmd_watch(config, capture).await
        }
        Command::Replay { file } => cmd_replay(config, file).await,
        Command::Events => {
            print!("{}", present::event_table());
            Ok(())
        }
    }
}

fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;

    // stdout carries the events
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter)
        .init();

    Ok(())
}

async fn cmd_watch(config: Config, capture: Option<PathBuf>) -> Result<()> {
    if !device::is_root() {
        tracing::warn!(
            device = %config.device.path.display(),
            "Not running as root, opening the device will likely fail"
        );
    }

    let device = device::open_cloned(&config.device.path, config.device.queue_depth)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        device = %config.device.path.display(),
        queue_depth = config.device.queue_depth,
        pid_width = %config.decoder.pid_width,
        "Watching filesystem events"
    );

    let shutdown = install_shutdown_handler()?;

    let stats = match capture {
        Some(path) => {
            let file = File::create(&path)
                .wrap_err_with(|| format!("could not create capture {}", path.display()))?;
            tracing::info!(capture = %path.display(), "Capturing raw stream");
            drive(CaptureSource::new(device, file), &config, shutdown).await?
        }
        None => drive(device, &config, shutdown).await?,
    };

    report(&stats);
    Ok(())
}

async fn cmd_replay(config: Config, file: PathBuf) -> Result<()> {
    let capture = File::open(&file)
        .wrap_err_with(|| format!("could not open capture {}", file.display()))?;

    tracing::debug!(
        file = %file.display(),
        pid_width = %config.decoder.pid_width,
        carry_over = config.stream.carry_over,
        "Replaying capture"
    );

    let shutdown = install_shutdown_handler()?;
    let stats = drive(capture, &config, shutdown).await?;

    report(&stats);
    if stats.discarded_bytes > 0 && stats.records == 0 {
        bail!(
            "no records decoded from {} (wrong --pid-width?)",
            file.display()
        );
    }
    Ok(())
}

/// Run the blocking read loop on a worker thread, printing to stdout.
async fn drive<S>(source: S, config: &Config, shutdown: Arc<AtomicBool>) -> Result<StreamStats>
where
    S: ChunkSource + Send + 'static,
{
    let decoder = Decoder::new(config.decoder);
    let stream_config = config.stream;

    tokio::task::spawn_blocking(move || -> Result<StreamStats> {
        let mut presenter = Presenter::new(std::io::stdout().lock(), SystemResolver);
        let mut driver = StreamDriver::new(source, decoder, stream_config);
        let stats = driver.run(&shutdown, &mut presenter)?;
        presenter.finish().wrap_err("could not write events")?;
        Ok(stats)
    })
    .await?
}

/// Set the returned flag on SIGINT/SIGTERM. A second signal exits at once,
/// since the read loop only sees the flag after its current read returns.
fn install_shutdown_handler() -> Result<Arc<AtomicBool>> {
    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&shutdown);

    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = sigterm.recv() => tracing::info!("Received SIGTERM"),
                    _ = sigint.recv() => tracing::info!("Received SIGINT"),
                }
                if flag.swap(true, Ordering::Relaxed) {
                    std::process::exit(130);
                }
            }
        });
    }

    #[cfg(not(unix))]
    {
        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Received Ctrl+C");
                if flag.swap(true, Ordering::Relaxed) {
                    std::process::exit(130);
                }
            }
        });
    }

    Ok(shutdown)
}

fn report(stats: &StreamStats) {
    tracing::info!(
        reads = stats.reads,
        bytes = stats.bytes,
        records = stats.records,
        dropped = stats.dropped,
        discarded_bytes = stats.discarded_bytes,
        "Stream finished"
    );
}
