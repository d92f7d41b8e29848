//! Pair discovery: matches content files with their metadata files.
//!
//! Two strategies are supported. Directory-scan matching lists a content root
//! and a metadata root (or one combined root split by a filename token) and
//! pairs each content file with the first metadata path containing its
//! filename stem. An explicit CSV mapping bypasses matching entirely and
//! emits one pair per row.
//!
//! The scan is O(content x metadata); fine for the modest batches this tool
//! is pointed at, a known limit for anything larger.

use crate::config::InputLayout;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// A content file and, when one was found, its matching metadata file.
///
/// An absent metadata path is a legal, expected state here; the pipeline
/// decides later what to do about it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePair {
    pub content_path: PathBuf,
    pub metadata_path: Option<PathBuf>,
}

/// Recursively lists all files under `root`, sorted for deterministic order
/// across filesystems. A missing root yields an empty listing.
fn list_recursive(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    if !root.exists() {
        warn!(root = %root.display(), "Input root does not exist, treating as empty");
        return Ok(files);
    }

    fn visit(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
        for entry in fs::read_dir(dir)
            .with_context(|| format!("Failed to list directory {}", dir.display()))?
        {
            let path = entry?.path();
            if path.is_dir() {
                visit(&path, out)?;
            } else if path.is_file() {
                out.push(path);
            }
        }
        Ok(())
    }

    visit(root, &mut files)?;
    files.sort();
    Ok(files)
}

/// The token a content file is matched by: its filename stem.
fn content_token(path: &Path) -> Option<String> {
    path.file_stem().map(|s| s.to_string_lossy().into_owned())
}

/// Pairs each content file with the first metadata path whose string form
/// contains the content token. Listings are already sorted, so "first match"
/// is stable across runs.
fn match_pairs(content_files: Vec<PathBuf>, metadata_files: &[PathBuf]) -> Vec<FilePair> {
    let mut pairs = Vec::with_capacity(content_files.len());
    for content_path in content_files {
        let metadata_path = match content_token(&content_path) {
            Some(token) => metadata_files
                .iter()
                .find(|meta| meta.to_string_lossy().contains(&token))
                .cloned(),
            None => None,
        };
        match &metadata_path {
            Some(meta) => debug!(
                content = %content_path.display(),
                metadata = %meta.display(),
                "Matched pair"
            ),
            None => debug!(content = %content_path.display(), "No metadata match for content file"),
        }
        pairs.push(FilePair {
            content_path,
            metadata_path,
        });
    }
    pairs
}

/// Resolves candidate pairs by scanning the configured input layout.
///
/// An empty content listing produces an empty sequence, not an error.
pub fn resolve_pairs(layout: &InputLayout) -> Result<Vec<FilePair>> {
    let (content_files, metadata_files) = match layout {
        InputLayout::Split {
            json_folder,
            meta_folder,
        } => {
            let content = list_recursive(json_folder)?;
            let metadata = list_recursive(meta_folder)?;
            (content, metadata)
        }
        InputLayout::Combined {
            input_folder,
            metadata_token,
        } => {
            let all = list_recursive(input_folder)?;
            let (metadata, content): (Vec<_>, Vec<_>) = all.into_iter().partition(|p| {
                p.file_name()
                    .map(|n| n.to_string_lossy().contains(metadata_token.as_str()))
                    .unwrap_or(false)
            });
            (content, metadata)
        }
    };

    info!(
        content_files = content_files.len(),
        metadata_files = metadata_files.len(),
        "Resolved input listings"
    );

    Ok(match_pairs(content_files, &metadata_files))
}

/// Reads an explicit two-column mapping file (columns `JSON` and `METADATA`)
/// and emits one pair per row, verbatim. The mapping is trusted: no matching
/// logic is applied. An empty METADATA cell yields a pair without metadata.
pub fn read_mapping<P: AsRef<Path>>(path: P) -> Result<Vec<FilePair>> {
    let path_ref = path.as_ref();
    info!(mapping_file = ?path_ref, "Reading explicit mapping file");

    let mut reader = csv::Reader::from_path(path_ref)
        .with_context(|| format!("Failed to open mapping file {}", path_ref.display()))?;

    let headers = reader
        .headers()
        .with_context(|| format!("Failed to read mapping header in {}", path_ref.display()))?
        .clone();
    let column_index = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
    };
    let json_idx = column_index("JSON")
        .with_context(|| format!("Mapping file {} has no JSON column", path_ref.display()))?;
    let meta_idx = column_index("METADATA")
        .with_context(|| format!("Mapping file {} has no METADATA column", path_ref.display()))?;

    let mut pairs = Vec::new();
    for record in reader.records() {
        let record = record.context("Failed to read mapping row")?;
        let content = record.get(json_idx).unwrap_or("").trim();
        if content.is_empty() {
            continue;
        }
        let metadata = record.get(meta_idx).unwrap_or("").trim();
        pairs.push(FilePair {
            content_path: PathBuf::from(content),
            metadata_path: if metadata.is_empty() {
                None
            } else {
                Some(PathBuf::from(metadata))
            },
        });
    }

    info!(pairs = pairs.len(), "Mapping file read");
    Ok(pairs)
}
