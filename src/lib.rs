pub mod config;
pub mod load_config;
pub mod pipeline;
pub mod relocate;
pub mod resolve;
pub mod storage;
pub mod validate;

use anyhow::Result;
use clap::Parser;
use std::path::{Path, PathBuf};
use tokio::sync::watch;
use tracing::{error, info};

use config::Config;
use pipeline::{run_pipeline, PipelineOptions, PipelineReport};
use relocate::Relocator;
use storage::{ObjectStorage, S3Store};
use validate::SchemaValidator;

/// CLI for bucket-publish: validate metadata and publish file pairs to a bucket.
#[derive(Parser)]
#[clap(
    name = "bucket-publish",
    version,
    about = "Match content files with metadata, validate against a JSON Schema and upload pairs to an object-storage bucket"
)]
pub struct Cli {
    /// Path to the JSON config file
    #[clap(long)]
    pub config: PathBuf,

    /// Optional CSV mapping file with JSON and METADATA columns; bypasses
    /// directory-scan matching
    #[clap(long)]
    pub mapping_file: Option<PathBuf>,
}

/// Startup and pipeline execution against an already-constructed store.
///
/// Order matters: schema load and bucket verification are fatal and happen
/// before any input file is read. Split out from [`run`] so tests can drive
/// it with a mock store.
pub async fn execute<S: ObjectStorage>(
    config: &Config,
    store: &S,
    mapping_file: Option<&Path>,
    options: &PipelineOptions,
    shutdown: watch::Receiver<bool>,
) -> Result<PipelineReport> {
    let validator = SchemaValidator::load(&config.json_schema)?;

    if let Err(e) = store.verify_bucket().await {
        error!(bucket = %config.bucket_name, error = %e, "Bucket not available, aborting");
        anyhow::bail!("Bucket {} not available: {e}", config.bucket_name);
    }

    let pairs = match mapping_file {
        Some(path) => resolve::read_mapping(path)?,
        None => resolve::resolve_pairs(&config.input)?,
    };

    let relocator = Relocator::new(&config.success_folder, &config.failure_folder);

    Ok(run_pipeline(pairs, &validator, store, &relocator, options, shutdown).await)
}

/// Exports the configured storage profile for the storage client to pick
/// up. Mutates the process environment, so this must run before the async
/// runtime starts any thread; `main` calls it ahead of building the runtime.
pub fn apply_storage_profile(config: &Config) {
    if let Some(profile) = &config.storage_profile {
        info!(profile = %profile, "Using configured storage profile");
        std::env::set_var("AWS_PROFILE", profile);
    }
}

/// Extracted async CLI logic entrypoint for integration tests and main().
/// Expects the config to be loaded (and the storage profile applied) before
/// the runtime exists.
pub async fn run(config: Config, mapping_file: Option<PathBuf>) -> Result<PipelineReport> {
    info!("trace_initialised");

    let store = S3Store::from_env(&config.bucket_name)?;

    // Ctrl-C stops new pairs from starting; in-flight uploads finish and
    // relocate before the report is returned.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Stop signal received, finishing in-flight uploads");
            let _ = shutdown_tx.send(true);
        }
    });

    execute(
        &config,
        &store,
        mapping_file.as_deref(),
        &PipelineOptions::default(),
        shutdown_rx,
    )
    .await
}
