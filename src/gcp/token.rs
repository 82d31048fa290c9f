//! OAuth2 access token acquisition.
//!
//! Uses `GOOGLE_OAUTH_ACCESS_TOKEN` when set, otherwise asks the gcloud CLI.

use anyhow::{Context, Result};
use secrecy::SecretString;
use tracing::debug;

use crate::error::GkupError;

pub const ACCESS_TOKEN_ENV: &str = "GOOGLE_OAUTH_ACCESS_TOKEN";

/// Obtain a bearer token for the Google Cloud APIs.
pub async fn access_token() -> Result<SecretString> {
    if let Some(token) = non_empty(std::env::var(ACCESS_TOKEN_ENV).ok()) {
        debug!("Using access token from {}", ACCESS_TOKEN_ENV);
        return Ok(SecretString::from(token));
    }

    gcloud_access_token().await
}

/// Get an access token using `gcloud auth print-access-token`.
async fn gcloud_access_token() -> Result<SecretString> {
    debug!("Running: gcloud auth print-access-token");

    let output = tokio::process::Command::new("gcloud")
        .args(["auth", "print-access-token"])
        .output()
        .await
        .context("Failed to execute 'gcloud auth print-access-token'. Is the gcloud CLI installed?")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(GkupError::Credentials(
            module_path!().to_string(),
            format!("gcloud auth print-access-token failed: {}", stderr.trim()),
        )
        .into());
    }

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let token = non_empty(Some(stdout)).ok_or_else(|| {
        GkupError::Credentials(
            module_path!().to_string(),
            "gcloud returned an empty access token".to_string(),
        )
    })?;

    Ok(SecretString::from(token))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
