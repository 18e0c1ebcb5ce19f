#![doc = "HTTP clients for Cloud Storage and Storage Transfer: bridges the core traits to the Google REST APIs."]
//
//! # Google API clients
//!
//! [`GcsClient`] implements [`ObjectStorage`] against the Cloud Storage JSON API
//! and [`StorageTransferClient`] implements [`TransferScheduler`] against the
//! Storage Transfer API. Both send a bearer token obtained by [`crate::auth`].
//!
//! - HTTP 404 becomes [`ApiError::NotFound`], 409 [`ApiError::Conflict`] and
//!   401 [`ApiError::Auth`]; every other non-2xx status is [`ApiError::Status`].
//! - Base URLs can be overridden to point the clients at a local fake.

use std::net::IpAddr;

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use gcs_transfer_core::contract::{
    AccessControl, ApiError, Bucket, CreatedJob, ExistingJob, JobPatch, NewBucket,
    ObjectStorage, ServiceAccount, TransferJob, TransferScheduler,
};

use crate::auth::AccessToken;

pub const STORAGE_BASE_URL: &str = "https://storage.googleapis.com/storage/v1";
pub const TRANSFER_BASE_URL: &str = "https://storagetransfer.googleapis.com/v1";

/// Join `segments` onto `base`, percent-encoding each one.
fn endpoint<'s>(base: &Url, segments: impl IntoIterator<Item = &'s str>) -> Result<Url, ApiError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| ApiError::InvalidUrl(format!("{base} cannot be a base URL")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

fn parse_base(base_url: &str) -> Result<Url, ApiError> {
    Url::parse(base_url).map_err(|e| ApiError::InvalidUrl(format!("{base_url}: {e}")))
}

/// HTTP client for `base`. Loopback targets (local fakes) bypass any configured proxy.
fn http_client(base: &Url) -> Result<reqwest::Client, ApiError> {
    let loopback = base.host_str().is_some_and(|host| {
        host == "localhost"
            || host
                .trim_matches(|c| c == '[' || c == ']')
                .parse::<IpAddr>()
                .is_ok_and(|ip| ip.is_loopback())
    });
    let builder = reqwest::Client::builder();
    let builder = if loopback { builder.no_proxy() } else { builder };
    Ok(builder.build()?)
}

#[derive(Deserialize)]
struct GoogleErrorBody {
    error: GoogleError,
}

#[derive(Deserialize)]
struct GoogleError {
    message: String,
}

/// Pull the human readable message out of a Google error body, falling back to the raw body.
pub(crate) fn error_message(body: &str) -> String {
    serde_json::from_str::<GoogleErrorBody>(body)
        .map(|b| b.error.message)
        .unwrap_or_else(|_| body.trim().to_string())
}

async fn check(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = error_message(&body);
    Err(match status {
        StatusCode::NOT_FOUND => ApiError::NotFound,
        StatusCode::CONFLICT => ApiError::Conflict(message),
        StatusCode::UNAUTHORIZED => ApiError::Auth(message),
        other => ApiError::Status {
            status: other.as_u16(),
            message,
        },
    })
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
}

/// Send and decode; a 404 becomes `Ok(None)`.
async fn fetch_optional<T: DeserializeOwned>(
    request: RequestBuilder,
) -> Result<Option<T>, ApiError> {
    match check(request.send().await?).await {
        Ok(response) => decode(response).await.map(Some),
        Err(ApiError::NotFound) => Ok(None),
        Err(e) => Err(e),
    }
}

async fn fetch<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ApiError> {
    decode(check(request.send().await?).await?).await
}

pub struct GcsClient {
    http: reqwest::Client,
    token: AccessToken,
    base_url: Url,
}

impl GcsClient {
    pub fn with_base_url(token: AccessToken, base_url: &str) -> Result<Self, ApiError> {
        let base_url = parse_base(base_url)?;
        Ok(GcsClient {
            http: http_client(&base_url)?,
            token,
            base_url,
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InsertBucketBody<'a> {
    name: &'a str,
    location: &'a str,
    storage_class: &'a str,
}

#[async_trait]
impl ObjectStorage for GcsClient {
    async fn get_bucket(&self, name: &str) -> Result<Option<Bucket>, ApiError> {
        tracing::debug!(bucket = name, "Fetching bucket");
        let url = endpoint(&self.base_url, ["b", name])?;
        fetch_optional(self.http.get(url).bearer_auth(self.token.as_str())).await
    }

    async fn create_bucket(
        &self,
        project_id: &str,
        bucket: &NewBucket,
    ) -> Result<Bucket, ApiError> {
        tracing::info!(
            project_id,
            bucket = %bucket.name,
            location = %bucket.location,
            storage_class = %bucket.storage_class,
            "Inserting bucket"
        );
        let url = endpoint(&self.base_url, ["b"])?;
        let request = self
            .http
            .post(url)
            .bearer_auth(self.token.as_str())
            .query(&[
                ("project", project_id),
                ("predefinedAcl", bucket.acl.as_str()),
                ("predefinedDefaultObjectAcl", bucket.default_object_acl.as_str()),
            ])
            .json(&InsertBucketBody {
                name: &bucket.name,
                location: &bucket.location,
                storage_class: &bucket.storage_class,
            });
        fetch(request).await
    }

    async fn get_access_control(
        &self,
        bucket: &str,
        entity: &str,
    ) -> Result<Option<AccessControl>, ApiError> {
        tracing::debug!(bucket, entity, "Fetching bucket ACL entry");
        let url = endpoint(&self.base_url, ["b", bucket, "acl", entity])?;
        fetch_optional(self.http.get(url).bearer_auth(self.token.as_str())).await
    }

    async fn insert_access_control(
        &self,
        bucket: &str,
        entry: &AccessControl,
    ) -> Result<AccessControl, ApiError> {
        tracing::info!(
            bucket,
            entity = %entry.entity,
            role = ?entry.role,
            "Inserting bucket ACL entry"
        );
        let url = endpoint(&self.base_url, ["b", bucket, "acl"])?;
        fetch(self.http.post(url).bearer_auth(self.token.as_str()).json(entry)).await
    }
}

pub struct StorageTransferClient {
    http: reqwest::Client,
    token: AccessToken,
    base_url: Url,
}

impl StorageTransferClient {
    pub fn with_base_url(token: AccessToken, base_url: &str) -> Result<Self, ApiError> {
        let base_url = parse_base(base_url)?;
        Ok(StorageTransferClient {
            http: http_client(&base_url)?,
            token,
            base_url,
        })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListJobsResponse {
    #[serde(default)]
    transfer_jobs: Vec<ExistingJob>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PatchJobBody<'a> {
    project_id: &'a str,
    transfer_job: &'a JobPatch,
    update_transfer_job_field_mask: &'a str,
}

#[async_trait]
impl TransferScheduler for StorageTransferClient {
    async fn get_service_account(&self, project_id: &str) -> Result<ServiceAccount, ApiError> {
        tracing::debug!(project_id, "Fetching transfer service account");
        let url = endpoint(&self.base_url, ["googleServiceAccounts", project_id])?;
        fetch(self.http.get(url).bearer_auth(self.token.as_str())).await
    }

    async fn list_jobs(&self, project_id: &str) -> Result<Vec<ExistingJob>, ApiError> {
        let filter = serde_json::json!({ "projectId": project_id }).to_string();
        let url = endpoint(&self.base_url, ["transferJobs"])?;
        let mut jobs = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut request = self
                .http
                .get(url.clone())
                .bearer_auth(self.token.as_str())
                .query(&[("filter", filter.as_str())]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }
            let page: ListJobsResponse = fetch(request).await?;
            jobs.extend(page.transfer_jobs);
            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) if page_token.as_deref() == Some(token.as_str()) => {
                    tracing::warn!(
                        project_id,
                        page_token = %token,
                        "Transfer job listing repeated its page token, stopping"
                    );
                    break;
                }
                Some(token) => page_token = Some(token),
                None => break,
            }
        }
        tracing::info!(project_id, count = jobs.len(), "Listed transfer jobs");
        Ok(jobs)
    }

    async fn create_job(&self, job: &TransferJob) -> Result<CreatedJob, ApiError> {
        tracing::info!(description = %job.description, "Creating transfer job");
        let url = endpoint(&self.base_url, ["transferJobs"])?;
        fetch(self.http.post(url).bearer_auth(self.token.as_str()).json(job)).await
    }

    async fn patch_job(
        &self,
        name: &str,
        project_id: &str,
        patch: &JobPatch,
        field_mask: &str,
    ) -> Result<(), ApiError> {
        tracing::info!(job_name = name, field_mask, "Patching transfer job");
        let url = endpoint(&self.base_url, name.split('/'))?;
        let body = PatchJobBody {
            project_id,
            transfer_job: patch,
            update_transfer_job_field_mask: field_mask,
        };
        check(
            self.http
                .patch(url)
                .bearer_auth(self.token.as_str())
                .json(&body)
                .send()
                .await?,
        )
        .await?;
        Ok(())
    }
}
