//! Access grantor: makes sure the destination bucket exists and that the
//! transfer service's service account may write to it.
//!
//! Bucket creation failure is fatal for the bucket ([`AccessError`]). Problems
//! granting the ACL are not: they come back as [`GrantStatus::Failed`] and the
//! caller carries on with job reconciliation.

use std::collections::HashMap;
use std::sync::Mutex;

use tracing::{debug, info, warn};

use crate::contract::{
    AccessControl, AccessRole, ApiError, NewBucket, ObjectStorage, TransferScheduler,
};
use crate::error::AccessError;

pub const PREDEFINED_ACL: &str = "projectPrivate";
pub const BUCKET_LOCATION: &str = "US";
pub const BUCKET_STORAGE_CLASS: &str = "NEARLINE";

/// The fixed policy every destination bucket is created with.
pub fn destination_bucket(name: &str) -> NewBucket {
    NewBucket {
        name: name.to_string(),
        acl: PREDEFINED_ACL.to_string(),
        default_object_acl: PREDEFINED_ACL.to_string(),
        location: BUCKET_LOCATION.to_string(),
        storage_class: BUCKET_STORAGE_CLASS.to_string(),
    }
}

/// What happened to the service account's ACL entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrantStatus {
    AlreadyPresent,
    Inserted,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessOutcome {
    pub bucket_created: bool,
    pub grant: GrantStatus,
}

pub struct AccessGrantor<'a, S: ?Sized, T: ?Sized> {
    storage: &'a S,
    scheduler: &'a T,
    /// Service account email per project, filled on first successful lookup.
    service_accounts: Mutex<HashMap<String, String>>,
}

impl<'a, S, T> AccessGrantor<'a, S, T>
where
    S: ObjectStorage + ?Sized,
    T: TransferScheduler + ?Sized,
{
    pub fn new(storage: &'a S, scheduler: &'a T) -> Self {
        Self {
            storage,
            scheduler,
            service_accounts: Mutex::new(HashMap::new()),
        }
    }

    pub async fn ensure_bucket_access(
        &self,
        project_id: &str,
        bucket: &str,
    ) -> Result<AccessOutcome, AccessError> {
        let bucket_created = self.ensure_bucket(project_id, bucket).await?;

        let email = match self.service_account_email(project_id).await {
            Ok(email) => email,
            Err(e) => {
                warn!(bucket, error = %e, "[ACCESS] Could not resolve transfer service account");
                return Ok(AccessOutcome {
                    bucket_created,
                    grant: GrantStatus::Failed(format!(
                        "failed to resolve transfer service account: {e}"
                    )),
                });
            }
        };

        let grant = self.ensure_writer(bucket, &email).await;
        Ok(AccessOutcome {
            bucket_created,
            grant,
        })
    }

    /// Returns whether the bucket had to be created.
    async fn ensure_bucket(&self, project_id: &str, bucket: &str) -> Result<bool, AccessError> {
        match self.storage.get_bucket(bucket).await {
            Ok(Some(_)) => {
                debug!(bucket, "[ACCESS] Destination bucket exists");
                return Ok(false);
            }
            Ok(None) => {}
            Err(e) => {
                warn!(bucket, error = %e, "[ACCESS] Bucket lookup failed, attempting creation");
            }
        }

        info!(bucket, "[ACCESS] Creating destination bucket");
        match self
            .storage
            .create_bucket(project_id, &destination_bucket(bucket))
            .await
        {
            Ok(_) => {
                info!(bucket, "[ACCESS] Destination bucket created");
                Ok(true)
            }
            Err(ApiError::Conflict(msg)) => {
                info!(bucket, detail = %msg, "[ACCESS] Destination bucket already exists");
                Ok(false)
            }
            Err(source) => Err(AccessError::CreateBucket {
                bucket: bucket.to_string(),
                source,
            }),
        }
    }

    async fn service_account_email(&self, project_id: &str) -> Result<String, ApiError> {
        if let Some(email) = self.cached_email(project_id) {
            return Ok(email);
        }
        let account = self.scheduler.get_service_account(project_id).await?;
        info!(project_id, email = %account.account_email, "[ACCESS] Resolved transfer service account");
        if let Ok(mut cache) = self.service_accounts.lock() {
            cache.insert(project_id.to_string(), account.account_email.clone());
        }
        Ok(account.account_email)
    }

    fn cached_email(&self, project_id: &str) -> Option<String> {
        self.service_accounts
            .lock()
            .ok()
            .and_then(|cache| cache.get(project_id).cloned())
    }

    async fn ensure_writer(&self, bucket: &str, email: &str) -> GrantStatus {
        let entity = AccessControl::user_entity(email);
        match self.storage.get_access_control(bucket, &entity).await {
            Ok(Some(_)) => {
                debug!(bucket, entity = %entity, "[ACCESS] ACL entry already present");
                return GrantStatus::AlreadyPresent;
            }
            Ok(None) => {}
            Err(e) => {
                warn!(bucket, entity = %entity, error = %e, "[ACCESS] ACL lookup failed, attempting insert");
            }
        }

        info!(bucket, entity = %entity, "[ACCESS] Granting WRITER to transfer service account");
        let entry = AccessControl {
            entity: entity.clone(),
            role: AccessRole::Writer,
        };
        match self.storage.insert_access_control(bucket, &entry).await {
            Ok(_) => GrantStatus::Inserted,
            Err(e) => {
                warn!(bucket, entity = %entity, error = %e, "[ACCESS] Failed to set bucket ACL");
                GrantStatus::Failed(format!("failed to grant WRITER to {entity}: {e}"))
            }
        }
    }
}
