//! Custom error types for gkup.

use serde::Deserialize;
use thiserror::Error;

use crate::version::VersionParseError;

/// Errors that can occur during GKE upgrade and scaling operations.
#[derive(Error, Debug)]
pub enum GkupError {
    #[error("[{component}] HTTP {status}: {message}")]
    Api {
        component: String,
        status: u16,
        message: String,
    },

    #[error("[{0}] GCP credentials error: {1}")]
    Credentials(String, String),

    #[error("Cluster not found: {0}")]
    ClusterNotFound(String),

    #[error("Node pool not found: {0}")]
    NodePoolNotFound(String),

    #[error("Node pool {0} has no backing instance group")]
    MissingInstanceGroup(String),

    #[error("Server config returned no valid master versions")]
    NoServerVersions,

    #[error("Node {0} doesn't have an external IP")]
    NoExternalAddress(String),

    #[error(transparent)]
    VersionParse(#[from] VersionParseError),

    #[error("Kubernetes API error: {0}")]
    KubernetesApi(String),

    #[error("Kubeconfig error: {0}")]
    Kubeconfig(String),
}

/// Google API error envelope: `{"error": {"code": 404, "message": "..."}}`.
#[derive(Debug, Deserialize)]
struct GoogleErrorEnvelope {
    error: GoogleErrorBody,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorBody {
    #[serde(default)]
    message: String,
}

impl GkupError {
    /// Create an API error from a non-success HTTP response.
    /// 401 and 403 are reported as credentials errors.
    pub fn gcp(component: &str, status: u16, body: &str) -> Self {
        let message = Self::extract_error_details(body);
        let component = component.to_string();

        if status == 401 || status == 403 {
            return GkupError::Credentials(component, message);
        }

        GkupError::Api {
            component,
            status,
            message,
        }
    }

    /// Extract a single-line message from a Google API error body.
    fn extract_error_details(body: &str) -> String {
        if let Ok(envelope) = serde_json::from_str::<GoogleErrorEnvelope>(body)
            && !envelope.error.message.is_empty()
        {
            return envelope.error.message;
        }

        let first_line = body.lines().next().unwrap_or("").trim();
        if first_line.is_empty() {
            "GCP API request failed".to_string()
        } else {
            first_line.to_string()
        }
    }
}
