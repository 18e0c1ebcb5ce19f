//! High-level pipeline: for every configured source bucket, grant access and
//! reconcile its transfer job.
//!
//! Buckets are processed one at a time, in configuration order. A failure in
//! one bucket never stops the others: every bucket ends up in the
//! [`TransferReport`] as succeeded, succeeded with warnings, or failed.
//!
//! # Per-bucket flow
//! 1. [`AccessGrantor::ensure_bucket_access`]. A bucket creation failure marks
//!    the bucket failed and skips step 2. ACL problems become warnings.
//! 2. [`reconcile_job`]. Any [`JobError`](crate::error::JobError) marks the bucket failed.
//!
//! # Navigation
//! - Main entrypoint: [`synchronise`]
//! - Supporting types: [`TransferReport`], [`BucketReport`], [`BucketStatus`].

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::access::{AccessGrantor, GrantStatus};
use crate::config::TransferConfig;
use crate::contract::{ObjectStorage, TransferScheduler};
use crate::job::{reconcile_job, JobOutcome};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BucketStatus {
    Succeeded {
        description: String,
        job_names: Vec<String>,
    },
    SucceededWithWarning {
        description: String,
        job_names: Vec<String>,
        warnings: Vec<String>,
    },
    Failed {
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BucketReport {
    pub bucket: String,
    #[serde(flatten)]
    pub status: BucketStatus,
}

impl BucketReport {
    pub fn is_failed(&self) -> bool {
        matches!(self.status, BucketStatus::Failed { .. })
    }

    pub fn description(&self) -> Option<&str> {
        match &self.status {
            BucketStatus::Succeeded { description, .. }
            | BucketStatus::SucceededWithWarning { description, .. } => Some(description),
            BucketStatus::Failed { .. } => None,
        }
    }
}

/// Outcome of a whole run, one entry per configured bucket, in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferReport {
    pub project_id: String,
    pub buckets: Vec<BucketReport>,
}

impl TransferReport {
    pub fn has_failures(&self) -> bool {
        self.buckets.iter().any(BucketReport::is_failed)
    }

    pub fn succeeded(&self) -> impl Iterator<Item = &BucketReport> {
        self.buckets.iter().filter(|b| !b.is_failed())
    }

    pub fn failed(&self) -> impl Iterator<Item = &BucketReport> {
        self.buckets.iter().filter(|b| b.is_failed())
    }
}

/// Run reconciliation for every bucket in `config`, scheduling from today's UTC date.
pub async fn synchronise<S, T>(
    config: &TransferConfig,
    storage: &S,
    scheduler: &T,
) -> TransferReport
where
    S: ObjectStorage + ?Sized,
    T: TransferScheduler + ?Sized,
{
    synchronise_on(config, storage, scheduler, Utc::now().date_naive()).await
}

/// As [`synchronise`], with an explicit "today" for the job schedule.
pub async fn synchronise_on<S, T>(
    config: &TransferConfig,
    storage: &S,
    scheduler: &T,
    today: NaiveDate,
) -> TransferReport
where
    S: ObjectStorage + ?Sized,
    T: TransferScheduler + ?Sized,
{
    info!(
        project_id = %config.project_id,
        buckets = config.buckets.len(),
        "[SYNC] Starting transfer job reconciliation"
    );
    let grantor = AccessGrantor::new(storage, scheduler);
    let mut buckets = Vec::with_capacity(config.buckets.len());

    for source in config.sources() {
        let bucket = source.bucket_name;
        info!(bucket = %bucket, "[SYNC] Processing bucket");

        let mut warnings = Vec::new();
        match grantor.ensure_bucket_access(&config.project_id, &bucket).await {
            Ok(outcome) => {
                if let GrantStatus::Failed(reason) = outcome.grant {
                    warnings.push(reason);
                }
            }
            Err(e) => {
                error!(bucket = %bucket, error = %e, "[SYNC][ERROR] Access step failed, skipping job");
                buckets.push(BucketReport {
                    bucket,
                    status: BucketStatus::Failed {
                        reason: e.to_string(),
                    },
                });
                continue;
            }
        }

        let status = match reconcile_job(
            scheduler,
            &config.project_id,
            &bucket,
            &source.credentials,
            today,
        )
        .await
        {
            Ok(outcome) => {
                if let JobOutcome::Patched { job_names, .. } = &outcome {
                    if job_names.len() > 1 {
                        warnings.push(format!(
                            "{} jobs share the description '{}' and were all patched",
                            job_names.len(),
                            outcome.description()
                        ));
                    }
                }
                info!(bucket = %bucket, description = %outcome.description(), "[SYNC] Finished reconciling transfer");
                let description = outcome.description().to_string();
                let job_names = outcome.job_names();
                if warnings.is_empty() {
                    BucketStatus::Succeeded {
                        description,
                        job_names,
                    }
                } else {
                    warn!(bucket = %bucket, warnings = ?warnings, "[SYNC] Bucket reconciled with warnings");
                    BucketStatus::SucceededWithWarning {
                        description,
                        job_names,
                        warnings,
                    }
                }
            }
            Err(e) => {
                error!(bucket = %bucket, error = %e, "[SYNC][ERROR] Job reconciliation failed");
                BucketStatus::Failed {
                    reason: e.to_string(),
                }
            }
        };
        buckets.push(BucketReport { bucket, status });
    }

    let report = TransferReport {
        project_id: config.project_id.clone(),
        buckets,
    };
    info!(
        succeeded = report.succeeded().count(),
        failed = report.failed().count(),
        "[SYNC] Reconciliation complete"
    );
    report
}
