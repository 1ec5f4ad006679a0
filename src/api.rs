// Storage API client: a small blocking HTTP client for the Yandex.Disk REST
// API. It only knows the three things the backup needs: make sure a folder
// exists, ask the disk to fetch a URL into a path, and wait for that
// operation to finish.

use crate::error::BackupError;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::StatusCode;
use serde::Deserialize;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Query-parameter marker that precedes the operation id in an upload `href`.
const OPERATION_MARKER: &str = "operation_id=";

/// How often and how many times the status of an upload is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        PollPolicy {
            interval: Duration::from_secs(1),
            max_attempts: 30,
        }
    }
}

/// Receives upload progress while an operation is being polled.
/// Progress is expressed in percent, so a full run adds up to 100.
pub trait ProgressReporter: Send + Sync {
    fn start(&self, label: &str);
    fn advance(&self, delta: u64);
    fn finish(&self);
}

/// Reporter that drops every update.
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn start(&self, _label: &str) {}
    fn advance(&self, _delta: u64) {}
    fn finish(&self) {}
}

/// State of a server-side operation as reported by `/operations/<id>`.
#[derive(Debug, Clone, PartialEq)]
pub enum OperationStatus {
    Pending,
    InProgress { progress: u8 },
    Success,
    Failed { message: String },
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case")]
enum WireStatus {
    Pending,
    InProgress,
    Success,
    Failed,
    #[default]
    #[serde(other)]
    Unknown,
}

/// Body of the operation status endpoint.
#[derive(Deserialize, Debug)]
struct OperationResponse {
    #[serde(default)]
    status: WireStatus,
    #[serde(default)]
    progress: Option<f64>,
    #[serde(default)]
    message: Option<String>,
}

impl From<OperationResponse> for OperationStatus {
    fn from(res: OperationResponse) -> Self {
        match res.status {
            WireStatus::Success => OperationStatus::Success,
            WireStatus::Failed => OperationStatus::Failed {
                message: res
                    .message
                    .unwrap_or_else(|| "operation failed".to_string()),
            },
            WireStatus::InProgress => OperationStatus::InProgress {
                progress: res.progress.unwrap_or(0.0).clamp(0.0, 100.0) as u8,
            },
            // Unknown statuses are treated as "still running".
            WireStatus::Pending | WireStatus::Unknown => OperationStatus::Pending,
        }
    }
}

/// Link object returned when an upload is accepted.
#[derive(Deserialize, Debug)]
struct Link {
    #[serde(default)]
    href: String,
}

/// Pull the operation id out of an upload `href`, e.g.
/// `https://.../operations?operation_id=abc` gives `abc`.
pub fn extract_operation_id(href: &str) -> Option<&str> {
    let (_, rest) = href.rsplit_once(OPERATION_MARKER)?;
    let id = rest.split('&').next().unwrap_or(rest);
    (!id.is_empty()).then_some(id)
}

/// Blocking client for the disk API. Every request carries the
/// `Authorization: OAuth <token>` header.
pub struct DiskClient {
    client: Client,
    base_url: String,
    poll: PollPolicy,
    progress: Arc<dyn ProgressReporter>,
}

impl DiskClient {
    /// Create a client for the API rooted at `base_url` (for example
    /// `https://cloud-api.yandex.net/v1/disk`) that authenticates with `token`.
    pub fn new(base_url: &str, token: &str) -> Result<Self, BackupError> {
        let mut auth = HeaderValue::from_str(&format!("OAuth {token}")).map_err(|_| {
            BackupError::InvalidConfig("token contains characters not allowed in a header".into())
        })?;
        auth.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|err| BackupError::InvalidConfig(format!("failed to build HTTP client: {err}")))?;
        Ok(DiskClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            poll: PollPolicy::default(),
            progress: Arc::new(NoProgress),
        })
    }

    pub fn with_poll_policy(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Make sure `path` exists as a folder. Probes first and only creates
    /// the folder when the probe does not find it; a 409 on create means
    /// someone else made it in between, which is fine too.
    pub fn ensure_folder(&self, path: &str) -> Result<(), BackupError> {
        let url = self.url("/resources");
        let probe = self.client.get(&url).query(&[("path", path)]).send()?;
        if probe.status() == StatusCode::OK {
            info!(folder = path, "Folder already exists");
            return Ok(());
        }
        debug!(folder = path, status = %probe.status(), "Folder not found, creating it");

        let res = self.client.put(&url).query(&[("path", path)]).send()?;
        match res.status() {
            StatusCode::CREATED | StatusCode::CONFLICT => {
                info!(folder = path, status = %res.status(), "Folder created or already present");
                Ok(())
            }
            _ => {
                let err = BackupError::from_response(res);
                error!(folder = path, error = %err, "Failed to create folder");
                Err(err)
            }
        }
    }

    /// Ask the disk to download `source_url` into `destination_path` and
    /// wait for the transfer to finish.
    ///
    /// When the response carries no operation id the upload is taken as
    /// already complete.
    pub fn upload_from_url(
        &self,
        source_url: &str,
        destination_path: &str,
    ) -> Result<(), BackupError> {
        info!(path = destination_path, "Starting upload by URL");
        let res = self
            .client
            .post(self.url("/resources/upload"))
            .query(&[
                ("url", source_url),
                ("path", destination_path),
                ("disable_redirects", "true"),
            ])
            .send()?;
        if !res.status().is_success() {
            let err = BackupError::from_response(res);
            error!(path = destination_path, error = %err, "Upload request rejected");
            return Err(err);
        }

        let link: Link = res.json().map_err(|err| BackupError::Remote {
            status: None,
            message: format!("unexpected upload response: {err}"),
        })?;
        let Some(operation_id) = extract_operation_id(&link.href) else {
            warn!(
                path = destination_path,
                href = %link.href,
                "No operation id in upload response, assuming the upload is complete"
            );
            return Ok(());
        };

        self.progress.start(destination_path);
        let result = self.poll_operation(operation_id);
        self.progress.finish();
        result
    }

    /// Poll `/operations/<id>` until it reports success or failure, or the
    /// poll policy runs out of attempts.
    pub fn poll_operation(&self, operation_id: &str) -> Result<(), BackupError> {
        let url = self.url(&format!("/operations/{operation_id}"));
        let mut last_progress: u8 = 0;

        for attempt in 1..=self.poll.max_attempts {
            let res = self.client.get(&url).send()?;
            if !res.status().is_success() {
                let err = BackupError::from_response(res);
                error!(operation_id, error = %err, "Failed to check operation status");
                return Err(err);
            }
            let status: OperationStatus = res
                .json::<OperationResponse>()
                .map_err(|err| BackupError::Remote {
                    status: None,
                    message: format!("unexpected operation status response: {err}"),
                })?
                .into();
            debug!(operation_id, attempt, ?status, "Checked operation status");

            match status {
                OperationStatus::Success => {
                    self.progress.advance(u64::from(100 - last_progress));
                    info!(operation_id, "Upload finished");
                    return Ok(());
                }
                OperationStatus::Failed { message } => {
                    error!(operation_id, %message, "Upload failed on the remote side");
                    return Err(BackupError::Remote {
                        status: None,
                        message,
                    });
                }
                OperationStatus::InProgress { progress } => {
                    if progress > last_progress {
                        self.progress.advance(u64::from(progress - last_progress));
                        last_progress = progress;
                    }
                }
                OperationStatus::Pending => {}
            }

            if attempt < self.poll.max_attempts {
                thread::sleep(self.poll.interval);
            }
        }

        warn!(operation_id, attempts = self.poll.max_attempts, "Timed out waiting for upload");
        Err(BackupError::Timeout {
            operation_id: operation_id.to_string(),
            attempts: self.poll.max_attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(body: &str) -> OperationStatus {
        serde_json::from_str::<OperationResponse>(body)
            .unwrap()
            .into()
    }

    #[test]
    fn operation_id_follows_marker() {
        assert_eq!(
            extract_operation_id("https://disk/v1/disk/operations?operation_id=abc123"),
            Some("abc123")
        );
        assert_eq!(
            extract_operation_id("https://disk/ops?operation_id=abc&foo=bar"),
            Some("abc")
        );
    }

    #[test]
    fn missing_or_empty_operation_id() {
        assert_eq!(extract_operation_id(""), None);
        assert_eq!(
            extract_operation_id("https://disk/v1/disk/operations/abc123"),
            None
        );
        assert_eq!(extract_operation_id("https://disk/ops?operation_id="), None);
    }

    #[test]
    fn decodes_known_statuses() {
        assert_eq!(decode(r#"{"status":"success"}"#), OperationStatus::Success);
        assert_eq!(decode(r#"{"status":"pending"}"#), OperationStatus::Pending);
        assert_eq!(
            decode(r#"{"status":"in-progress","progress":42}"#),
            OperationStatus::InProgress { progress: 42 }
        );
        assert_eq!(
            decode(r#"{"status":"failed","message":"source unreachable"}"#),
            OperationStatus::Failed {
                message: "source unreachable".into()
            }
        );
    }

    #[test]
    fn unknown_status_counts_as_pending() {
        assert_eq!(decode(r#"{"status":"queued"}"#), OperationStatus::Pending);
        assert_eq!(decode(r#"{}"#), OperationStatus::Pending);
    }

    #[test]
    fn progress_is_clamped() {
        assert_eq!(
            decode(r#"{"status":"in-progress","progress":250}"#),
            OperationStatus::InProgress { progress: 100 }
        );
        assert_eq!(
            decode(r#"{"status":"in-progress"}"#),
            OperationStatus::InProgress { progress: 0 }
        );
    }

    #[test]
    fn token_must_be_a_valid_header() {
        let err = DiskClient::new("http://localhost", "bad\ntoken")
            .err()
            .expect("newline in token should be rejected");
        assert!(matches!(err, BackupError::InvalidConfig(_)));
    }
}
