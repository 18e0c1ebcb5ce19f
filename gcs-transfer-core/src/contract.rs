//! # contract: remote collaborator interfaces
//!
//! This module defines the two traits the reconciliation core talks to, plus
//! the plain data types that travel across them:
//!
//! - [`ObjectStorage`]: the destination storage system (buckets and bucket ACLs).
//! - [`TransferScheduler`]: the transfer-scheduling service (service account and jobs).
//!
//! ## Interface & Extensibility
//! - Implement the traits to create new clients (HTTP API, local fake).
//! - All methods are async and return [`ApiError`] so callers can tell a
//!   missing resource (`NotFound`) or an "already exists" (`Conflict`) apart
//!   from other failures.
//!
//! ## Mocking & Testing
//! - Both traits are annotated for `mockall`; the generated `MockObjectStorage`
//!   and `MockTransferScheduler` are exported with the `test-export-mocks` feature.
//!
//! ## Wire Types
//! - Job types serialize with the transfer service's camelCase field names, so
//!   a client can send them as request bodies unchanged.

use std::fmt;

use async_trait::async_trait;
use mockall::automock;
use serde::{Deserialize, Serialize};

/// Field mask sent with every job patch. The schedule is never repatched.
pub const PATCH_FIELD_MASK: &str = "transferSpec,status";

/// Error returned by every remote call.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("resource not found")]
    NotFound,

    /// The resource already exists (HTTP 409).
    #[error("resource already exists: {0}")]
    Conflict(String),

    #[error("remote returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("invalid request URL: {0}")]
    InvalidUrl(String),
}

/// A bucket as reported by the storage system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bucket {
    pub name: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub storage_class: Option<String>,
}

/// Everything needed to create a destination bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBucket {
    pub name: String,
    /// Predefined ACL applied to the bucket itself.
    pub acl: String,
    /// Predefined ACL applied to objects written without an explicit ACL.
    pub default_object_acl: String,
    pub location: String,
    pub storage_class: String,
}

/// Role carried by a bucket access-control entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccessRole {
    Reader,
    Writer,
    Owner,
}

/// One access-control entry on a bucket, e.g. `user-x@example.com` with `WRITER`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessControl {
    pub entity: String,
    pub role: AccessRole,
}

impl AccessControl {
    /// Entity string the storage ACL API uses for a user or service account.
    pub fn user_entity(email: &str) -> String {
        format!("user-{email}")
    }
}

/// Service account the transfer service acts as inside a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceAccount {
    pub account_email: String,
}

/// Lifecycle status of a transfer job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Enabled,
    Disabled,
    Deleted,
    #[default]
    #[serde(other)]
    StatusUnspecified,
}

/// Access key pair for the source object store.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AwsAccessKey {
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl fmt::Debug for AwsAccessKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsAccessKey")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AwsS3DataSource {
    pub bucket_name: String,
    pub aws_access_key: AwsAccessKey,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GcsDataSink {
    pub bucket_name: String,
}

/// Behaviour flags for a transfer. All three are destructive when set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferOptions {
    pub overwrite_objects_already_existing_in_sink: bool,
    pub delete_objects_unique_in_sink: bool,
    pub delete_objects_from_source_after_transfer: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferSpec {
    pub aws_s3_data_source: AwsS3DataSource,
    pub gcs_data_sink: GcsDataSink,
    pub transfer_options: TransferOptions,
}

/// Calendar date in the transfer service's `{year, month, day}` shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Date {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeOfDay {
    pub hours: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    pub schedule_start_date: Date,
    pub start_time_of_day: TimeOfDay,
}

/// A complete job definition, as sent on create.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferJob {
    /// Identifying key used to find this job again on later runs.
    pub description: String,
    pub project_id: String,
    pub transfer_spec: TransferSpec,
    pub schedule: Schedule,
    pub status: JobStatus,
}

impl TransferJob {
    /// The subset of this job that a patch is allowed to carry.
    pub fn to_patch(&self) -> JobPatch {
        JobPatch {
            description: self.description.clone(),
            transfer_spec: self.transfer_spec.clone(),
            status: self.status,
        }
    }
}

/// Fields sent on patch. There is deliberately no schedule here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPatch {
    pub description: String,
    pub transfer_spec: TransferSpec,
    pub status: JobStatus,
}

/// A job already known to the transfer service.
///
/// Listed jobs omit credentials, so the transfer spec is kept as opaque JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExistingJob {
    /// Opaque remote id, e.g. `transferJobs/123`.
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: JobStatus,
    #[serde(default)]
    pub transfer_spec: Option<serde_json::Value>,
}

/// Returned by the transfer service after a job is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedJob {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Destination storage system: bucket lookup/creation and bucket ACLs.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Look up a bucket by name. `Ok(None)` when it does not exist.
    async fn get_bucket(&self, name: &str) -> Result<Option<Bucket>, ApiError>;

    /// Create a bucket owned by `project_id`.
    async fn create_bucket(&self, project_id: &str, bucket: &NewBucket)
        -> Result<Bucket, ApiError>;

    /// Fetch the ACL entry for `entity` on `bucket`. `Ok(None)` when absent.
    async fn get_access_control(
        &self,
        bucket: &str,
        entity: &str,
    ) -> Result<Option<AccessControl>, ApiError>;

    /// Add an ACL entry to `bucket`.
    async fn insert_access_control(
        &self,
        bucket: &str,
        entry: &AccessControl,
    ) -> Result<AccessControl, ApiError>;
}

/// Transfer-scheduling service.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait TransferScheduler: Send + Sync {
    /// Resolve the service account the transfer service uses in `project_id`.
    async fn get_service_account(&self, project_id: &str) -> Result<ServiceAccount, ApiError>;

    /// List every job belonging to `project_id`.
    async fn list_jobs(&self, project_id: &str) -> Result<Vec<ExistingJob>, ApiError>;

    async fn create_job(&self, job: &TransferJob) -> Result<CreatedJob, ApiError>;

    /// Patch the job called `name`, touching only the fields in `field_mask`.
    async fn patch_job(
        &self,
        name: &str,
        project_id: &str,
        patch: &JobPatch,
        field_mask: &str,
    ) -> Result<(), ApiError>;
}
