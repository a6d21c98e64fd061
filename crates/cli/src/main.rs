//! `cadenza` -- terminal front-end for the composer service.
//!
//! Uploads MIDI files to start a training job, follows its status until a
//! terminal state, and downloads the generated composition.
//!
//! # Environment variables
//!
//! | Variable                       | Required | Default                 | Description                    |
//! |--------------------------------|----------|-------------------------|--------------------------------|
//! | `CADENZA_API_URL`              | no       | `http://localhost:8000` | Composer service base URL      |
//! | `CADENZA_POLL_INTERVAL_SECS`   | no       | `5`                     | Seconds between status polls   |
//! | `CADENZA_REQUEST_TIMEOUT_SECS` | no       | `30`                    | Per-request HTTP timeout       |

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tokio::sync::broadcast;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cadenza_client::api::{ComposerApi, UploadFile};
use cadenza_client::config::ClientConfig;
use cadenza_client::events::SessionEvent;
use cadenza_client::session::JobSession;
use cadenza_core::artifact::{Artifact, ARTIFACT_FILENAME};
use cadenza_core::session::SessionPhase;
use cadenza_core::status::JobStatus;
use cadenza_encoder::TransferEncoder;

#[derive(Parser)]
#[command(
    name = "cadenza",
    about = "Upload MIDI files, train a composer model, and download the generated piece"
)]
struct Cli {
    /// Composer service base URL (overrides CADENZA_API_URL).
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Seconds between status polls (overrides CADENZA_POLL_INTERVAL_SECS).
    #[arg(long, global = true)]
    poll_interval: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Upload MIDI files, train, and download the composition when done.
    Train {
        /// MIDI files to train on.
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Where to write the generated composition.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Look up the current status of a job.
    Status { job_id: String },
    /// Ask the service to stop a running job.
    Stop { job_id: String },
    /// Download the composition for an already-complete job.
    Generate {
        job_id: String,
        /// Where to write the generated composition.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Encode a file with the background transfer encoder and print it.
    Encode { file: PathBuf },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cadenza=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let mut config = ClientConfig::from_env();
    if let Some(url) = cli.api_url {
        config.api_url = url;
    }
    if let Some(secs) = cli.poll_interval {
        config.poll_interval_secs = secs;
    }
    tracing::debug!(api_url = %config.api_url, poll_interval_secs = config.poll_interval_secs, "Resolved configuration");

    match cli.command {
        Command::Train { files, output } => train(&config, files, output).await,
        Command::Status { job_id } => status(&config, &job_id).await,
        Command::Stop { job_id } => stop(&config, &job_id).await,
        Command::Generate { job_id, output } => generate(&config, &job_id, output).await,
        Command::Encode { file } => encode(&file).await,
    }
}

fn api_client(config: &ClientConfig) -> anyhow::Result<ComposerApi> {
    ComposerApi::new(config.api_url.clone(), config.request_timeout())
        .context("failed to build HTTP client")
}

async fn train(
    config: &ClientConfig,
    files: Vec<PathBuf>,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let mut uploads = Vec::with_capacity(files.len());
    for path in &files {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.mid".to_string());
        uploads.push(UploadFile { name, bytes });
    }

    let mut session = JobSession::new(api_client(config)?, config.poll_config());
    let mut events = session.subscribe();

    session.select_files(uploads).await;
    println!("Uploading {} file(s)...", files.len());

    let state = session.submit().await;
    match (state.phase, state.job.as_ref()) {
        (SessionPhase::Polling, Some(job)) => {
            println!("Job {} accepted: {}", job.id, job.message);
        }
        _ => bail!(state.notice.unwrap_or("submission failed")),
    }

    follow(&mut session, &mut events, output).await
}

/// Print status updates until the job reaches a terminal state, then
/// download the composition.  Ctrl-C sends the stop signal.
async fn follow(
    session: &mut JobSession,
    events: &mut broadcast::Receiver<SessionEvent>,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!("Interrupted — asking the service to stop the job");
                session.stop().await;
                bail!("job stopped at your request");
            }
            event = events.recv() => match event {
                Ok(SessionEvent::StatusChanged { status, message, .. }) => {
                    println!("[{status}] {message}");
                    match status {
                        JobStatus::Complete => break,
                        JobStatus::Failed => bail!("training failed: {message}"),
                        _ => {}
                    }
                }
                Ok(SessionEvent::PollGaveUp { error, .. }) => {
                    bail!("lost contact with the job: {error}");
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => bail!("session ended unexpectedly"),
            }
        }
    }

    println!("Generating composition...");
    match session.generate().await {
        Some(artifact) => write_artifact(&artifact, output).await,
        None => {
            let state = session.snapshot().await;
            bail!(state.notice.unwrap_or("generation failed"));
        }
    }
}

async fn status(config: &ClientConfig, job_id: &str) -> anyhow::Result<()> {
    let api = api_client(config)?;
    let report = api
        .job_status(job_id)
        .await
        .with_context(|| format!("failed to fetch status for job {job_id}"))?;
    println!("[{}] {}", report.status, report.message);
    Ok(())
}

async fn stop(config: &ClientConfig, job_id: &str) -> anyhow::Result<()> {
    let api = api_client(config)?;
    api.stop_job(job_id)
        .await
        .with_context(|| format!("failed to send stop signal for job {job_id}"))?;
    println!("Stop signal sent for job {job_id}");
    Ok(())
}

async fn generate(
    config: &ClientConfig,
    job_id: &str,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let api = api_client(config)?;

    // Generation is only valid for a complete job; check before fetching.
    let report = api
        .job_status(job_id)
        .await
        .with_context(|| format!("failed to fetch status for job {job_id}"))?;
    if report.status != JobStatus::Complete {
        bail!(
            "job {job_id} is not ready to generate (status: {}, {})",
            report.status,
            report.message,
        );
    }

    let artifact = api
        .generate(job_id)
        .await
        .with_context(|| format!("failed to generate composition for job {job_id}"))?;
    write_artifact(&artifact, output).await
}

async fn write_artifact(artifact: &Artifact, output: Option<PathBuf>) -> anyhow::Result<()> {
    let path = output.unwrap_or_else(|| PathBuf::from(ARTIFACT_FILENAME));
    tokio::fs::write(&path, &artifact.bytes)
        .await
        .with_context(|| format!("failed to write {}", path.display()))?;
    println!("Wrote {} ({} bytes)", path.display(), artifact.bytes.len());
    Ok(())
}

async fn encode(file: &Path) -> anyhow::Result<()> {
    let bytes = tokio::fs::read(file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;

    let encoder = TransferEncoder::spawn().context("failed to start transfer encoder")?;
    let encoded = encoder
        .encode(bytes)
        .await
        .context("transfer encoding failed")?;

    println!("{encoded}");
    Ok(())
}
