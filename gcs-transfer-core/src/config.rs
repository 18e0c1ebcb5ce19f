use std::fmt;

use tracing::{debug, info};

use crate::contract::AwsAccessKey;

/// Credentials for the source object store, shared by every bucket in a run.
#[derive(Clone, PartialEq)]
pub struct AwsCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl AwsCredentials {
    pub fn to_access_key(&self) -> AwsAccessKey {
        AwsAccessKey {
            access_key_id: self.access_key_id.clone(),
            secret_access_key: self.secret_access_key.clone(),
        }
    }
}

impl fmt::Debug for AwsCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .finish()
    }
}

/// One source bucket together with the credentials used to read it.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceBucketConfig {
    pub bucket_name: String,
    pub credentials: AwsCredentials,
}

/// Everything a reconciliation run needs. Read once at start.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferConfig {
    pub project_id: String,
    pub aws: AwsCredentials,
    /// Source buckets in processing order.
    pub buckets: Vec<String>,
}

impl TransferConfig {
    pub fn sources(&self) -> impl Iterator<Item = SourceBucketConfig> + '_ {
        self.buckets.iter().map(|bucket| SourceBucketConfig {
            bucket_name: bucket.clone(),
            credentials: self.aws.clone(),
        })
    }

    pub fn trace_loaded(&self) {
        info!(
            project_id = %self.project_id,
            buckets_count = self.buckets.len(),
            "Loaded TransferConfig"
        );
        debug!(?self, "TransferConfig loaded (full debug)");
    }
}

/// Split a comma separated bucket list.
///
/// Entries are trimmed, empty entries dropped and duplicates removed keeping
/// the first occurrence, so the processing order follows the input.
pub fn parse_bucket_list(raw: &str) -> Vec<String> {
    let mut buckets: Vec<String> = Vec::new();
    for name in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if !buckets.iter().any(|b| b == name) {
            buckets.push(name.to_string());
        }
    }
    buckets
}
