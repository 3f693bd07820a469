use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use sha2::{Digest, Sha256};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use autocanvas_core::drive::DriveClient;
use autocanvas_core::{
    load_config, validate_config, BatchWatcher, Config, DriveSink, DriveSource,
    LocalDirectorySource, LocalSink, PipelineRunner, SanitizedConfig, Sink, SinkKind, Source,
    SourceKind,
};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Watches a folder of photos and turns every batch into a 3x3 PDF canvas.
#[derive(Parser)]
#[clap(name = "autocanvas", version, about)]
struct Cli {
    /// Path to the TOML config file (default: autocanvas.toml if present)
    #[clap(long, global = true, env = "AUTOCANVAS_CONFIG")]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[clap(long, global = true)]
    log_json: bool,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch the source and process every full batch until interrupted
    Watch,
    /// Process one batch now and exit
    Once {
        /// Explicit image paths to process (up to the batch size)
        #[clap(long, num_args = 1..)]
        paths: Option<Vec<PathBuf>>,
    },
    /// Load and validate the configuration, then print a sanitized summary
    Check,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.log_json);

    if let Err(e) = run(cli).await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_logging(json: bool) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(tracing_subscriber::fmt::layer))
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    info!("autocanvas {}", VERSION);

    let config = load_config(cli.config.as_deref()).context("Failed to load configuration")?;

    if let Commands::Check = cli.command {
        return check(&config);
    }

    validate_config(&config).context("Configuration validation failed")?;
    info!("Configuration fingerprint: {}", fingerprint(&config));

    let watcher = Arc::new(build_watcher(&config).await?);

    match cli.command {
        Commands::Watch => {
            let stopper = Arc::clone(&watcher);
            tokio::spawn(async move {
                shutdown_signal().await;
                stopper.stop();
            });
            watcher
                .run_until_stopped()
                .await
                .context("Batch watcher failed")?;
        }
        Commands::Once { paths } => match watcher.run_once(paths).await {
            Ok(Some(report)) => {
                println!("Generated PDF: {}", report.artifact.display());
                if let Some(id) = &report.published {
                    info!("Published as {}", id);
                }
                if let Some(e) = &report.publish_error {
                    warn!("Publishing failed: {}", e);
                }
            }
            Ok(None) => println!("No images to process."),
            Err(e) => bail!("Batch failed: {}", e),
        },
        Commands::Check => {}
    }

    Ok(())
}

/// Validates the configuration and prints it with secrets redacted.
fn check(config: &Config) -> Result<()> {
    let sanitized = SanitizedConfig::from(config);
    let json =
        serde_json::to_string_pretty(&sanitized).context("Failed to serialize configuration")?;
    println!("{}", json);

    validate_config(config).context("Configuration validation failed")?;
    println!("Configuration OK (fingerprint {})", fingerprint(config));
    Ok(())
}

/// Short hash of the sanitized configuration, for correlating logs.
fn fingerprint(config: &Config) -> String {
    let json = serde_json::to_string(&SanitizedConfig::from(config)).unwrap_or_default();
    let hash = format!("{:x}", Sha256::digest(json.as_bytes()));
    hash[..16].to_string()
}

async fn build_watcher(config: &Config) -> Result<BatchWatcher> {
    for dir in [&config.sink.output_dir, &config.pipeline.work_dir] {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create directory {:?}", dir))?;
    }

    let drive = if config.uses_drive() {
        let client =
            DriveClient::new(config.drive.clone()).context("Failed to create Drive client")?;
        Some(Arc::new(client))
    } else {
        None
    };

    let source: Arc<dyn Source> = match (config.source.kind, &drive) {
        (SourceKind::Local, _) => {
            tokio::fs::create_dir_all(&config.source.input_dir)
                .await
                .with_context(|| {
                    format!("Failed to create input directory {:?}", config.source.input_dir)
                })?;
            info!("Watching local directory {:?}", config.source.input_dir);
            Arc::new(LocalDirectorySource::new(&config.source.input_dir))
        }
        (SourceKind::Drive, Some(client)) => {
            let folder = config
                .source
                .drive_folder_id
                .clone()
                .context("source.drive_folder_id is not set")?;
            info!("Watching Drive folder {}", folder);
            Arc::new(DriveSource::new(
                Arc::clone(client),
                folder,
                &config.source.staging_dir,
            ))
        }
        (SourceKind::Drive, None) => bail!("Drive source selected but no Drive client"),
    };

    let sink: Arc<dyn Sink> = match (config.sink.kind, &drive) {
        (SinkKind::Local, _) => Arc::new(LocalSink::new()),
        (SinkKind::Drive, Some(client)) => {
            let folder = config
                .sink
                .drive_folder_id
                .clone()
                .context("sink.drive_folder_id is not set")?;
            info!("Uploading artifacts to Drive folder {}", folder);
            Arc::new(DriveSink::new(Arc::clone(client), folder))
        }
        (SinkKind::Drive, None) => bail!("Drive sink selected but no Drive client"),
    };

    let pipeline = PipelineRunner::from_config(config.pipeline.clone(), &config.sink.output_dir)
        .context("Failed to create pipeline")?;
    info!("Pipeline stages: {}", pipeline.stage_names().join(" -> "));

    Ok(BatchWatcher::new(
        config.watch.clone(),
        source,
        Arc::new(pipeline),
        sink,
    ))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
