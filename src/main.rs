//! nls-stt: stream a raw audio file to the NLS transcription gateway.
//!
//! Usage:
//!   nls-stt --file audio.pcm                     # credentials from NLS_APP_KEY / NLS_TOKEN
//!   nls-stt --file audio.pcm --app-key K --token T
//!   nls-stt --file audio.pcm --no-ping --verbose
//!   nls-stt --file audio.pcm --log-file nls.log

mod audio;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use nls_protocol::{ResultChangedPayload, SentenceEndPayload, StartParams};
use nls_transcriber::{StartOptions, Transcriber, TranscriberConfig, TranscriptionEvent};
use nls_transport::DEFAULT_URL;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "nls-stt", about = "Streaming speech transcription over the NLS gateway")]
struct Cli {
    /// Raw audio file to stream
    #[arg(long)]
    file: PathBuf,

    /// Gateway WebSocket URL
    #[arg(long, env = "NLS_URL", default_value = DEFAULT_URL)]
    url: String,

    /// Application key
    #[arg(long, env = "NLS_APP_KEY")]
    app_key: String,

    /// Access token
    #[arg(long, env = "NLS_TOKEN", hide_env_values = true)]
    token: String,

    /// Bytes per audio frame
    #[arg(long, default_value = "2048")]
    chunk_size: usize,

    /// Delay between audio frames, in milliseconds
    #[arg(long, default_value = "100")]
    chunk_interval_ms: u64,

    /// Sample rate of the audio file
    #[arg(long, default_value = "16000")]
    sample_rate: u32,

    /// Disable the liveness probe
    #[arg(long)]
    no_ping: bool,

    /// Liveness probe period, in milliseconds
    #[arg(long, default_value = "6000")]
    ping_interval_ms: u64,

    /// Enable verbose logging
    #[arg(long)]
    verbose: bool,

    /// Write logs to a file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn init_tracing(cli: &Cli) -> anyhow::Result<()> {
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    if let Some(log_path) = &cli.log_file {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)
            .with_context(|| format!("failed to open log file {}", log_path.display()))?;

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .init();

        eprintln!("Logging to {}", log_path.display());
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
    Ok(())
}

/// Log every session event until the session ends; final sentences also go
/// to stdout.
async fn report_events(mut events: broadcast::Receiver<TranscriptionEvent>) {
    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                warn!("Event reporter lagged, {missed} events dropped");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };

        match &event {
            TranscriptionEvent::Started(response) => info!("Started: {response}"),
            TranscriptionEvent::Begin(response) => debug!("Sentence begin: {response}"),
            TranscriptionEvent::Changed(response) => {
                match response.payload_as::<ResultChangedPayload>() {
                    Ok(payload) => debug!("[{}] {}", payload.index, payload.result),
                    Err(e) => warn!("Unreadable interim result: {e}"),
                }
            }
            TranscriptionEvent::End(response) => match response.payload_as::<SentenceEndPayload>() {
                Ok(payload) => {
                    info!(
                        "Sentence {} ({}ms-{}ms, confidence {:.2})",
                        payload.index, payload.begin_time, payload.time, payload.confidence
                    );
                    println!("{}", payload.result);
                }
                Err(e) => warn!("Unreadable sentence result: {e}"),
            },
            TranscriptionEvent::Completed(response) => info!("Completed: {response}"),
            TranscriptionEvent::Failed(response) => error!("Failed: {response}"),
            TranscriptionEvent::Closed => warn!("Connection closed by the gateway"),
        }

        if matches!(
            event,
            TranscriptionEvent::Completed(_) | TranscriptionEvent::Failed(_) | TranscriptionEvent::Closed
        ) {
            break;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli)?;

    let audio = audio::load(&cli.file).await?;
    info!("Loaded {} bytes from {}", audio.len(), cli.file.display());

    let config = TranscriberConfig::new(cli.app_key.clone(), cli.token.clone()).with_url(&cli.url);
    let transcriber = Transcriber::new(config)?;
    let mut reporter = tokio::spawn(report_events(transcriber.subscribe()));

    {
        let transcriber = transcriber.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, shutting down");
                transcriber.shutdown();
            }
        });
    }

    let params = StartParams::default().with_sample_rate(cli.sample_rate);
    let options = if cli.no_ping {
        StartOptions::new(params).without_liveness()
    } else {
        StartOptions::new(params).with_liveness_interval(Duration::from_millis(cli.ping_interval_ms))
    };

    transcriber
        .start(options)
        .await
        .context("failed to start transcription")?;

    let pacing = Duration::from_millis(cli.chunk_interval_ms);
    let mut frames = 0usize;
    for chunk in audio::chunks(audio, cli.chunk_size) {
        if !transcriber.send_audio(chunk) {
            warn!("Session ended after {frames} frames, stopped sending");
            break;
        }
        frames += 1;
        tokio::time::sleep(pacing).await;
    }
    debug!("Sent {frames} audio frames");

    let outcome = transcriber.close(serde_json::json!({})).await;
    transcriber.shutdown();
    if tokio::time::timeout(Duration::from_secs(1), &mut reporter).await.is_err() {
        reporter.abort();
    }

    let completed = outcome.context("transcription did not complete")?;
    info!("Transcription task finished: {completed}");
    Ok(())
}
