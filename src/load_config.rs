use crate::config::{Config, InputLayout};
use anyhow::Result;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

const DEFAULT_METADATA_TOKEN: &str = "metadata_act";

/// Raw on-disk shape of the JSON config file. Folder keys are all optional
/// here so that the split/combined choice can be validated explicitly below.
#[derive(Deserialize)]
struct StaticConfig {
    bucket_name: String,
    json_schema: PathBuf,
    #[serde(default)]
    input_folder: Option<PathBuf>,
    #[serde(default)]
    json_folder: Option<PathBuf>,
    #[serde(default)]
    meta_folder: Option<PathBuf>,
    #[serde(default)]
    metadata_token: Option<String>,
    success_folder: PathBuf,
    failure_folder: PathBuf,
    #[serde(default)]
    storage_profile: Option<String>,
}

/// Loads the JSON config file and resolves it into a runtime [`Config`].
///
/// Any missing or contradictory key is a fatal startup error: without a
/// complete config no pair can be processed.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => {
            info!(config_path = ?path_ref, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    let static_conf: StaticConfig = match serde_json::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config JSON successfully");
            conf
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config JSON");
            return Err(anyhow::anyhow!("Failed to parse config JSON: {e}"));
        }
    };

    let input = match (
        static_conf.input_folder,
        static_conf.json_folder,
        static_conf.meta_folder,
    ) {
        (Some(input_folder), None, None) => InputLayout::Combined {
            input_folder,
            metadata_token: static_conf
                .metadata_token
                .unwrap_or_else(|| DEFAULT_METADATA_TOKEN.to_string()),
        },
        (None, Some(json_folder), Some(meta_folder)) => InputLayout::Split {
            json_folder,
            meta_folder,
        },
        (None, Some(_), None) | (None, None, Some(_)) => {
            error!("Config declares only one of json_folder/meta_folder");
            anyhow::bail!("json_folder and meta_folder must be set together");
        }
        (Some(_), _, _) => {
            error!("Config declares both input_folder and json_folder/meta_folder");
            anyhow::bail!("input_folder is mutually exclusive with json_folder/meta_folder");
        }
        (None, None, None) => {
            error!("Config declares no input location");
            anyhow::bail!("config needs input_folder or json_folder/meta_folder");
        }
    };

    let config = Config {
        bucket_name: static_conf.bucket_name,
        json_schema: static_conf.json_schema,
        input,
        success_folder: static_conf.success_folder,
        failure_folder: static_conf.failure_folder,
        storage_profile: static_conf.storage_profile,
    };

    config.trace_loaded();

    Ok(config)
}
