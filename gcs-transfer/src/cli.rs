///
/// This module implements the CLI interface for gcs-transfer: command parsing,
/// argument validation and the async entrypoint.
///
/// All reconciliation logic lives in the [`gcs-transfer-core`] crate. This module
/// only wires configuration, credentials and HTTP clients together.
///
/// ## Features
/// - [`Cli`] / [`Commands`] define the user-facing options. Every required input
///   can come from a flag or from its environment variable.
/// - [`run`] is the async entrypoint used by `main()` and integration tests.
/// - [`exit_status`] maps a finished run to the process exit status.
///
/// [`gcs-transfer-core`]: ../../gcs-transfer-core/
use crate::auth::access_token;
use crate::gcp::{GcsClient, StorageTransferClient, STORAGE_BASE_URL, TRANSFER_BASE_URL};
use crate::load_config::{load_config, ConfigInputs};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gcs_transfer_core::synchronise::{synchronise, BucketStatus, TransferReport};
use std::path::PathBuf;

/// CLI for gcs-transfer: provision daily S3 to GCS transfer jobs.
#[derive(Parser)]
#[clap(
    name = "gcs-transfer",
    version,
    about = "Create or update one daily Storage Transfer job per S3 bucket"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Ensure destination buckets, ACLs and transfer jobs for every listed S3 bucket
    Sync {
        /// Google Cloud project that owns the destination buckets and jobs
        #[clap(long, env = "GOOGLE_PROJECT_ID", required_unless_present = "config")]
        project_id: Option<String>,

        /// AWS access key id used by the transfer service to read the source buckets
        #[clap(long, env = "AWS_ACCESS_ID")]
        aws_access_id: String,

        /// AWS secret access key
        #[clap(long, env = "AWS_SECRET_KEY", hide_env_values = true)]
        aws_secret_key: String,

        /// Comma separated list of S3 buckets
        #[clap(long, env = "S3_BUCKETS", required_unless_present = "config")]
        buckets: Option<String>,

        /// Optional YAML file with `project_id` and `buckets`
        #[clap(long)]
        config: Option<PathBuf>,

        /// Print the final report as JSON instead of one line per bucket
        #[clap(long)]
        json: bool,

        #[clap(long, env = "GCS_TRANSFER_STORAGE_URL", default_value = STORAGE_BASE_URL, hide = true)]
        storage_url: String,

        #[clap(long, env = "GCS_TRANSFER_TRANSFER_URL", default_value = TRANSFER_BASE_URL, hide = true)]
        transfer_url: String,
    },
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<TransferReport> {
    // Emit a top-level 'trace_initialised' event at the very start
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Sync {
            project_id,
            aws_access_id,
            aws_secret_key,
            buckets,
            config,
            json,
            storage_url,
            transfer_url,
        } => {
            let config = load_config(ConfigInputs {
                project_id,
                aws_access_id,
                aws_secret_key,
                buckets,
                config_file: config,
            })?;
            tracing::info!(command = "sync", "Starting transfer job reconciliation");

            let token = access_token().await?;
            let storage = GcsClient::with_base_url(token.clone(), &storage_url)
                .context("Failed to construct Cloud Storage client")?;
            let scheduler = StorageTransferClient::with_base_url(token, &transfer_url)
                .context("Failed to construct Storage Transfer client")?;

            let report = synchronise(&config, &storage, &scheduler).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_summary(&report);
            }
            Ok(report)
        }
    }
}

pub fn print_summary(report: &TransferReport) {
    for bucket in &report.buckets {
        match &bucket.status {
            BucketStatus::Succeeded { description, .. } => {
                println!("{}: ok: {}", bucket.bucket, description);
            }
            BucketStatus::SucceededWithWarning {
                description,
                warnings,
                ..
            } => {
                println!("{}: ok with warnings: {}", bucket.bucket, description);
                for warning in warnings {
                    println!("  warning: {warning}");
                }
            }
            BucketStatus::Failed { reason } => {
                println!("{}: FAILED: {}", bucket.bucket, reason);
            }
        }
    }
}

/// 0 when every bucket succeeded (warnings allowed), 1 when any bucket failed.
pub fn exit_status(report: &TransferReport) -> u8 {
    if report.has_failures() {
        1
    } else {
        0
    }
}
