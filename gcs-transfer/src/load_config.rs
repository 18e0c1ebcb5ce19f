/// `load_config` module: builds the core [`TransferConfig`] from CLI/environment values and an optional YAML file.
///
/// # Responsibilities
/// - Parse the optional YAML file (`project_id`, `buckets`) into a typed struct
/// - Merge it with values coming from flags or the environment; explicit values win
/// - Split and clean the comma separated bucket list
/// - Fail with a clear diagnostic before any remote call when something required is missing
///
/// # Errors
/// All errors use `anyhow::Error` and are surfaced at the CLI boundary.
use anyhow::{anyhow, bail, Result};
use gcs_transfer_core::config::{parse_bucket_list, AwsCredentials, TransferConfig};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Optional YAML file contents. Secrets never live here.
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub project_id: Option<String>,
    #[serde(default)]
    pub buckets: Vec<String>,
}

/// Raw inputs as collected by the CLI (flags or environment).
#[derive(Debug, Default)]
pub struct ConfigInputs {
    pub project_id: Option<String>,
    pub aws_access_id: String,
    pub aws_secret_key: String,
    /// Comma separated list, e.g. `alpha,beta`.
    pub buckets: Option<String>,
    pub config_file: Option<PathBuf>,
}

pub fn load_file_config<P: AsRef<Path>>(path: P) -> Result<FileConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let content = match fs::read_to_string(path_ref) {
        Ok(content) => content,
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow!("Failed to read config file {:?}: {}", path_ref, e));
        }
    };

    // An empty file is a valid, empty config.
    if content.trim().is_empty() {
        return Ok(FileConfig::default());
    }

    match serde_yaml::from_str(&content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            Ok(conf)
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            Err(anyhow!("Failed to parse config YAML: {e}"))
        }
    }
}

pub fn load_config(inputs: ConfigInputs) -> Result<TransferConfig> {
    let file = match &inputs.config_file {
        Some(path) => load_file_config(path)?,
        None => FileConfig::default(),
    };

    let project_id = inputs
        .project_id
        .filter(|p| !p.trim().is_empty())
        .or(file.project_id)
        .map(|p| p.trim().to_string())
        .ok_or_else(|| {
            anyhow!("GOOGLE_PROJECT_ID must be set (or project_id in the config file)")
        })?;

    let buckets = match inputs.buckets.as_deref() {
        Some(raw) if !raw.trim().is_empty() => parse_bucket_list(raw),
        _ => parse_bucket_list(&file.buckets.join(",")),
    };
    if buckets.is_empty() {
        bail!("S3_BUCKETS must list at least one bucket (comma separated)");
    }

    if inputs.aws_access_id.trim().is_empty() || inputs.aws_secret_key.trim().is_empty() {
        bail!("AWS_ACCESS_ID and AWS_SECRET_KEY must not be empty");
    }

    let config = TransferConfig {
        project_id,
        aws: AwsCredentials {
            access_key_id: inputs.aws_access_id,
            secret_access_key: inputs.aws_secret_key,
        },
        buckets,
    };
    config.trace_loaded();
    Ok(config)
}
