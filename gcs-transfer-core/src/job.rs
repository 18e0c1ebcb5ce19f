//! Job reconciler: one daily transfer job per source bucket.
//!
//! Jobs are matched by description, which is derived from the bucket name
//! alone. A match is patched in place (transfer spec and status only); no
//! match means a new job is created with the full definition.

use chrono::{Days, Datelike, NaiveDate};
use tracing::{error, info, warn};

use crate::config::AwsCredentials;
use crate::contract::{
    AwsS3DataSource, Date, GcsDataSink, JobStatus, Schedule, TimeOfDay, TransferJob,
    TransferOptions, TransferScheduler, TransferSpec, PATCH_FIELD_MASK,
};
use crate::error::{JobError, PatchFailure};

/// Hour of day (UTC) the daily transfer starts. 10:00 UTC is early morning US Central.
pub const START_HOUR_UTC: u32 = 10;

/// Identifying key of the transfer job for `bucket`.
pub fn job_description(bucket: &str) -> String {
    format!("AWS S3: {bucket} to GCS Daily Transfer")
}

/// Build the desired job for `bucket`, scheduled to start the day before `today`.
pub fn build_transfer_job(
    project_id: &str,
    bucket: &str,
    credentials: &AwsCredentials,
    today: NaiveDate,
) -> TransferJob {
    let start = today.checked_sub_days(Days::new(1)).unwrap_or(today);
    TransferJob {
        description: job_description(bucket),
        project_id: project_id.to_string(),
        transfer_spec: TransferSpec {
            aws_s3_data_source: AwsS3DataSource {
                bucket_name: bucket.to_string(),
                aws_access_key: credentials.to_access_key(),
            },
            gcs_data_sink: GcsDataSink {
                bucket_name: bucket.to_string(),
            },
            transfer_options: TransferOptions::default(),
        },
        schedule: Schedule {
            schedule_start_date: Date {
                year: start.year(),
                month: start.month(),
                day: start.day(),
            },
            start_time_of_day: TimeOfDay {
                hours: START_HOUR_UTC,
            },
        },
        status: JobStatus::Enabled,
    }
}

/// Result of a successful reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Created {
        description: String,
        job_name: String,
    },
    /// Every matching job was patched. More than one name means the
    /// description was ambiguous.
    Patched {
        description: String,
        job_names: Vec<String>,
    },
}

impl JobOutcome {
    pub fn description(&self) -> &str {
        match self {
            JobOutcome::Created { description, .. } | JobOutcome::Patched { description, .. } => {
                description
            }
        }
    }

    pub fn job_names(&self) -> Vec<String> {
        match self {
            JobOutcome::Created { job_name, .. } => vec![job_name.clone()],
            JobOutcome::Patched { job_names, .. } => job_names.clone(),
        }
    }
}

pub async fn reconcile_job<T>(
    scheduler: &T,
    project_id: &str,
    bucket: &str,
    credentials: &AwsCredentials,
    today: NaiveDate,
) -> Result<JobOutcome, JobError>
where
    T: TransferScheduler + ?Sized,
{
    let job = build_transfer_job(project_id, bucket, credentials, today);
    let description = job.description.clone();

    let existing = scheduler
        .list_jobs(project_id)
        .await
        .map_err(|source| JobError::List { source })?;
    let matches: Vec<String> = existing
        .into_iter()
        .filter(|j| j.description == description)
        .map(|j| j.name)
        .collect();

    if matches.is_empty() {
        info!(bucket, description = %description, "[JOB] Creating transfer job");
        return match scheduler.create_job(&job).await {
            Ok(created) => {
                info!(job_name = %created.name, description = %description, "[JOB] Transfer job created");
                Ok(JobOutcome::Created {
                    description,
                    job_name: created.name,
                })
            }
            Err(source) => {
                error!(bucket, error = %source, "[JOB] Transfer job creation failed");
                Err(JobError::Create {
                    description,
                    source,
                })
            }
        };
    }

    if matches.len() > 1 {
        warn!(
            bucket,
            description = %description,
            count = matches.len(),
            "[JOB] Multiple jobs share this description; patching all of them"
        );
    }

    let patch = job.to_patch();
    let mut patched = Vec::new();
    let mut failures = Vec::new();
    for name in matches {
        info!(job_name = %name, description = %description, "[JOB] Existing job found, patching");
        match scheduler
            .patch_job(&name, project_id, &patch, PATCH_FIELD_MASK)
            .await
        {
            Ok(()) => patched.push(name),
            Err(e) => {
                error!(job_name = %name, error = %e, "[JOB] Error patching job");
                failures.push(PatchFailure {
                    job_name: name,
                    error: e,
                });
            }
        }
    }

    if !failures.is_empty() {
        if !patched.is_empty() {
            info!(patched = ?patched, "[JOB] Some matching jobs were patched");
        }
        return Err(JobError::Patch {
            description,
            failures,
        });
    }

    Ok(JobOutcome::Patched {
        description,
        job_names: patched,
    })
}
