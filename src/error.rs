// Error type shared by the clients and the backup pipeline.
// Every stage returns `Result<_, BackupError>` so the pipeline can stop at
// the first failure with `?`.

use std::path::PathBuf;
use thiserror::Error;

/// Things that can go wrong while backing up an image.
#[derive(Debug, Error)]
pub enum BackupError {
    /// Transport failure talking to either remote (DNS, connection reset, timeout).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The image service did not answer 200 for the caption.
    #[error("image not found (status {status})")]
    NotFound { status: u16 },

    /// Caption that cannot be sent as a URL path segment (`.` or `..`).
    #[error("caption {0:?} cannot be used in an image URL")]
    InvalidCaption(String),

    /// Non-success HTTP status or a failure reported by the storage API.
    #[error("remote error{}: {message}", .status.map(|s| format!(" (status {s})")).unwrap_or_default())]
    Remote { status: Option<u16>, message: String },

    /// The upload operation never reached a terminal status.
    #[error("operation {operation_id} did not finish after {attempts} status checks")]
    Timeout { operation_id: String, attempts: u32 },

    /// Writing the local JSON file failed.
    #[error("failed to write {}: {source}", .path.display())]
    LocalIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize upload records: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Bad base URL or a token that cannot be sent as a header.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl BackupError {
    /// Build a `Remote` error from a failed HTTP response, keeping the body
    /// as the message so the log shows what the API complained about.
    pub(crate) fn from_response(res: reqwest::blocking::Response) -> Self {
        let status = res.status();
        let body = res.text().unwrap_or_default();
        BackupError::Remote {
            status: Some(status.as_u16()),
            message: if body.is_empty() {
                status.to_string()
            } else {
                body
            },
        }
    }
}

impl From<url::ParseError> for BackupError {
    fn from(err: url::ParseError) -> Self {
        BackupError::InvalidConfig(err.to_string())
    }
}
