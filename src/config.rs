use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info};

/// Runtime configuration for a publish run.
#[derive(Debug, Serialize, Deserialize)]
pub struct Config {
    pub bucket_name: String,
    pub json_schema: PathBuf,
    pub input: InputLayout,
    pub success_folder: PathBuf,
    pub failure_folder: PathBuf,
    pub storage_profile: Option<String>,
}

impl Config {
    pub fn trace_loaded(&self) {
        info!(
            bucket_name = %self.bucket_name,
            json_schema = %self.json_schema.display(),
            success_folder = %self.success_folder.display(),
            failure_folder = %self.failure_folder.display(),
            "Loaded Config"
        );
        debug!(?self, "Config loaded (full debug)");
        self.input.trace_loaded();
    }
}

/// Where content and metadata files are discovered.
///
/// Either two separate roots (one for content JSON, one for metadata), or a
/// single combined root where metadata files are recognised by a filename
/// token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum InputLayout {
    Split {
        json_folder: PathBuf,
        meta_folder: PathBuf,
    },
    Combined {
        input_folder: PathBuf,
        metadata_token: String,
    },
}

impl InputLayout {
    pub fn trace_loaded(&self) {
        match self {
            InputLayout::Split {
                json_folder,
                meta_folder,
            } => {
                info!(
                    json_folder = %json_folder.display(),
                    meta_folder = %meta_folder.display(),
                    "Loaded split input layout"
                );
            }
            InputLayout::Combined {
                input_folder,
                metadata_token,
            } => {
                info!(
                    input_folder = %input_folder.display(),
                    metadata_token = %metadata_token,
                    "Loaded combined input layout"
                );
            }
        }
    }
}
