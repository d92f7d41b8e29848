//! Orchestration: drives each resolved pair through the schema gate, the
//! uploads and the relocations, and aggregates a run report.
//!
//! Per pair: `Discovered -> MetadataChecked -> Validated -> Uploaded(metadata)
//! -> Uploaded(content) -> Relocated -> Done`, with early exits to `Skipped`
//! when a file is missing or the metadata fails the schema gate. The two
//! files of a pair are uploaded and relocated on their own outcomes; they are
//! never coupled, and no pair's failure halts the batch.

use futures::stream::{self, StreamExt};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::relocate::Relocator;
use crate::resolve::FilePair;
use crate::storage::{project_object_metadata, upload_file, ObjectStorage, UploadOutcome};
use crate::validate::{load_document, SchemaValidator};

/// Tuning knobs for a run.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// How many pairs are processed concurrently.
    pub max_concurrency: usize,
    /// Upper bound on a single upload attempt.
    pub upload_timeout: Duration,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            upload_timeout: Duration::from_secs(60),
        }
    }
}

/// Terminal state of one pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairStatus {
    /// Both files uploaded and relocated.
    Done,
    /// Exactly one of the two uploads failed.
    PartialFailure,
    /// Both uploads failed.
    Failed,
    /// Metadata or content file missing; nothing was uploaded or moved.
    SkippedMissing,
    /// Metadata failed the schema gate; nothing was uploaded or moved.
    SkippedInvalid,
    /// Run was cancelled before this pair started.
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct PairOutcome {
    pub content_path: PathBuf,
    pub status: PairStatus,
    pub uploads: Vec<UploadOutcome>,
}

/// Aggregate counts over a run, derivable from the recorded outcomes.
#[derive(Debug, Default)]
pub struct PipelineReport {
    pub resolved: usize,
    pub validated: usize,
    pub upload_succeeded: usize,
    pub upload_failed: usize,
    pub skipped_missing: usize,
    pub skipped_invalid: usize,
    pub relocate_failed: usize,
    pub cancelled: usize,
    pub outcomes: Vec<PairOutcome>,
}

impl PipelineReport {
    fn record(&mut self, outcome: PairOutcome, relocate_failures: usize) {
        match outcome.status {
            PairStatus::SkippedMissing => self.skipped_missing += 1,
            PairStatus::SkippedInvalid => self.skipped_invalid += 1,
            PairStatus::Cancelled => self.cancelled += 1,
            PairStatus::Done | PairStatus::PartialFailure | PairStatus::Failed => {
                self.validated += 1;
            }
        }
        for upload in &outcome.uploads {
            if upload.succeeded {
                self.upload_succeeded += 1;
            } else {
                self.upload_failed += 1;
            }
        }
        self.relocate_failed += relocate_failures;
        self.outcomes.push(outcome);
    }
}

/// Result of one pair's processing, before aggregation.
struct PairRun {
    outcome: PairOutcome,
    relocate_failures: usize,
}

/// Runs the full pipeline over the resolved pairs.
///
/// Pairs are independent units of work; they are processed through a bounded
/// concurrent stream. `shutdown` flipping to `true` stops new pairs from
/// starting, while in-flight pairs finish their uploads and relocations.
pub async fn run_pipeline(
    pairs: Vec<FilePair>,
    validator: &SchemaValidator,
    store: &dyn ObjectStorage,
    relocator: &Relocator,
    options: &PipelineOptions,
    shutdown: watch::Receiver<bool>,
) -> PipelineReport {
    info!(pairs = pairs.len(), "Starting publish pipeline");

    let mut report = PipelineReport {
        resolved: pairs.len(),
        ..Default::default()
    };

    let runs: Vec<PairRun> = stream::iter(pairs)
        .map(|pair| {
            let shutdown = shutdown.clone();
            async move {
                if *shutdown.borrow() {
                    info!(content = %pair.content_path.display(), "Cancelled before start");
                    return PairRun {
                        outcome: PairOutcome {
                            content_path: pair.content_path,
                            status: PairStatus::Cancelled,
                            uploads: Vec::new(),
                        },
                        relocate_failures: 0,
                    };
                }
                process_pair(pair, validator, store, relocator, options).await
            }
        })
        .buffer_unordered(options.max_concurrency.max(1))
        .collect()
        .await;

    for run in runs {
        report.record(run.outcome, run.relocate_failures);
    }

    info!(
        resolved = report.resolved,
        validated = report.validated,
        upload_succeeded = report.upload_succeeded,
        upload_failed = report.upload_failed,
        skipped_missing = report.skipped_missing,
        skipped_invalid = report.skipped_invalid,
        relocate_failed = report.relocate_failed,
        cancelled = report.cancelled,
        "Pipeline complete"
    );

    report
}

/// Drives one pair through the state machine. Every exit path leaves both
/// files either untouched (skips) or relocated (upload attempts).
async fn process_pair(
    pair: FilePair,
    validator: &SchemaValidator,
    store: &dyn ObjectStorage,
    relocator: &Relocator,
    options: &PipelineOptions,
) -> PairRun {
    let content_path = pair.content_path;

    // Step 1: both files must exist. Missing metadata (unmatched or vanished)
    // skips the pair and leaves the content file in place.
    let metadata_path = match pair.metadata_path {
        Some(path) => path,
        None => {
            warn!(content = %content_path.display(), "No metadata file matched, skipping pair");
            return skipped(content_path, PairStatus::SkippedMissing);
        }
    };
    if !metadata_path.exists() {
        warn!(
            content = %content_path.display(),
            metadata = %metadata_path.display(),
            "Metadata file does not exist, skipping pair"
        );
        return skipped(content_path, PairStatus::SkippedMissing);
    }
    if !content_path.exists() {
        warn!(content = %content_path.display(), "Content file does not exist, skipping pair");
        return skipped(content_path, PairStatus::SkippedMissing);
    }

    // Step 2: schema gate. A document that cannot be read or parsed fails
    // the gate the same way a schema violation does.
    let document = match load_document(&metadata_path) {
        Ok(doc) => doc,
        Err(e) => {
            warn!(metadata = %metadata_path.display(), error = %e, "Skipping pair");
            return skipped(content_path, PairStatus::SkippedInvalid);
        }
    };
    if let Err(e) = validator.check(&document) {
        warn!(metadata = %metadata_path.display(), error = %e, "Schema gate rejected metadata, skipping pair");
        return skipped(content_path, PairStatus::SkippedInvalid);
    }
    info!(metadata = %metadata_path.display(), "Metadata validated successfully");

    let mut relocate_failures = 0;
    let mut uploads = Vec::with_capacity(2);

    // Steps 3 and 4: upload each file and relocate it on its own outcome.
    let metadata_outcome = upload_file(
        store,
        &metadata_path,
        BTreeMap::new(),
        options.upload_timeout,
    )
    .await;
    relocate_failures += relocate_logged(relocator, &metadata_outcome);
    uploads.push(metadata_outcome);

    let content_outcome = upload_file(
        store,
        &content_path,
        project_object_metadata(&document),
        options.upload_timeout,
    )
    .await;
    relocate_failures += relocate_logged(relocator, &content_outcome);
    uploads.push(content_outcome);

    let failures = uploads.iter().filter(|u| !u.succeeded).count();
    let status = match failures {
        0 => PairStatus::Done,
        1 => PairStatus::PartialFailure,
        _ => PairStatus::Failed,
    };

    PairRun {
        outcome: PairOutcome {
            content_path,
            status,
            uploads,
        },
        relocate_failures,
    }
}

fn skipped(content_path: PathBuf, status: PairStatus) -> PairRun {
    PairRun {
        outcome: PairOutcome {
            content_path,
            status,
            uploads: Vec::new(),
        },
        relocate_failures: 0,
    }
}

/// Relocation failure is surfaced but never fatal: the upload outcome is
/// already decided.
fn relocate_logged(relocator: &Relocator, outcome: &UploadOutcome) -> usize {
    match relocator.relocate(&outcome.file_path, outcome.succeeded) {
        Ok(_) => 0,
        Err(e) => {
            warn!(file = %outcome.file_path.display(), error = %e, "Failed to relocate file");
            1
        }
    }
}
