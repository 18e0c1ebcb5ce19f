use thiserror::Error;

use crate::contract::ApiError;

/// Fatal failure of the access step. Job reconciliation is skipped for the bucket.
#[derive(Debug, Error)]
pub enum AccessError {
    #[error("failed to create destination bucket {bucket}: {source}")]
    CreateBucket {
        bucket: String,
        #[source]
        source: ApiError,
    },
}

/// One job that could not be patched.
#[derive(Debug)]
pub struct PatchFailure {
    pub job_name: String,
    pub error: ApiError,
}

#[derive(Debug, Error)]
pub enum JobError {
    #[error("failed to list transfer jobs: {source}")]
    List {
        #[source]
        source: ApiError,
    },

    #[error("failed to create transfer job '{description}': {source}")]
    Create {
        description: String,
        #[source]
        source: ApiError,
    },

    #[error("failed to patch {} transfer job(s) for '{description}': {}", .failures.len(), summarise(.failures))]
    Patch {
        description: String,
        failures: Vec<PatchFailure>,
    },
}

fn summarise(failures: &[PatchFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{} ({})", f.job_name, f.error))
        .collect::<Vec<_>>()
        .join(", ")
}
