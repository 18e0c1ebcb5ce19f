//! Bearer token acquisition for the Google APIs.
//!
//! `GOOGLE_OAUTH_ACCESS_TOKEN` wins when set. Otherwise the application-default
//! credentials of the local `gcloud` installation are used
//! (`gcloud auth application-default login` must have been run once).

use std::env;
use std::fmt;

use anyhow::{bail, Context, Result};
use tokio::process::Command;

pub const TOKEN_ENV: &str = "GOOGLE_OAUTH_ACCESS_TOKEN";

#[derive(Clone)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        AccessToken(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

pub async fn access_token() -> Result<AccessToken> {
    if let Ok(token) = env::var(TOKEN_ENV) {
        let token = token.trim();
        if !token.is_empty() {
            tracing::info!(source = TOKEN_ENV, "Using access token from environment");
            return Ok(AccessToken::new(token));
        }
    }

    tracing::info!(source = "gcloud", "Requesting application-default access token");
    let output = Command::new("gcloud")
        .args(["auth", "application-default", "print-access-token"])
        .output()
        .await
        .with_context(|| {
            format!("Failed to run gcloud; install the Google Cloud SDK or set {TOKEN_ENV}")
        })?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        tracing::error!(status = ?output.status, stderr = %stderr.trim(), "gcloud could not print an access token");
        bail!(
            "gcloud auth application-default print-access-token failed: {}",
            stderr.trim()
        );
    }
    let token = String::from_utf8(output.stdout).context("gcloud printed a non UTF-8 token")?;
    let token = token.trim();
    if token.is_empty() {
        bail!("gcloud printed an empty access token");
    }
    Ok(AccessToken::new(token))
}
