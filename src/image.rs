// Image source client: turns a caption into a "cat says <caption>" image
// URL on cataas.com. The image itself is never downloaded here; the disk
// fetches it server-side later.

use crate::error::BackupError;
use reqwest::blocking::Client;
use reqwest::header::CONTENT_LENGTH;
use reqwest::StatusCode;
use tracing::{debug, error, info};
use url::Url;

/// Blocking client for the image service.
pub struct ImageClient {
    client: Client,
    base_url: Url,
}

impl ImageClient {
    /// Create a client for the service at `base_url`, e.g. `https://cataas.com`.
    pub fn new(base_url: &str) -> Result<Self, BackupError> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(BackupError::InvalidConfig(format!(
                "{base_url} cannot be used as a base URL"
            )));
        }
        let client = Client::builder()
            .build()
            .map_err(|err| BackupError::InvalidConfig(format!("failed to build HTTP client: {err}")))?;
        Ok(ImageClient { client, base_url })
    }

    /// The image URL for `caption`. The caption is percent-encoded as one
    /// path segment, so a `/` in it stays part of the text.
    ///
    /// `.` and `..` are rejected: URL parsers resolve them (and their
    /// `%2E` forms) as dot segments, so they can never reach the service.
    pub fn image_url(&self, caption: &str) -> Result<String, BackupError> {
        if matches!(caption, "." | "..") {
            return Err(BackupError::InvalidCaption(caption.to_string()));
        }
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(["cat", "says", caption]);
        }
        Ok(url.into())
    }

    /// Check with a `HEAD` request that the service has an image for
    /// `caption` and return its URL.
    pub fn resolve(&self, caption: &str) -> Result<String, BackupError> {
        let url = self.image_url(caption).inspect_err(|err| {
            error!(caption, error = %err, "Caption cannot be turned into an image URL");
        })?;
        let res = self.client.head(&url).send().map_err(|err| {
            error!(caption, error = %err, "Failed to reach the image service");
            BackupError::Network(err)
        })?;

        if res.status() != StatusCode::OK {
            error!(caption, status = %res.status(), "Image service has no image for caption");
            return Err(BackupError::NotFound {
                status: res.status().as_u16(),
            });
        }
        info!(caption, %url, "Got image URL");
        Ok(url)
    }

    /// Size of the remote file from its `Content-Length`, or 0 when it
    /// cannot be determined.
    pub fn probe_size(&self, url: &str) -> u64 {
        let res = match self.client.head(url).send() {
            Ok(res) if res.status().is_success() => res,
            Ok(res) => {
                debug!(%url, status = %res.status(), "Size probe rejected");
                return 0;
            }
            Err(err) => {
                debug!(%url, error = %err, "Size probe failed");
                return 0;
            }
        };
        // Read the header directly: for HEAD the body is empty, so the
        // response's own content length would always be 0.
        res.headers()
            .get(CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse().ok())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caption_is_a_single_encoded_segment() {
        let client = ImageClient::new("https://cataas.com").unwrap();
        assert_eq!(
            client.image_url("hello world").unwrap(),
            "https://cataas.com/cat/says/hello%20world"
        );
        assert_eq!(
            client.image_url("a/b?c").unwrap(),
            "https://cataas.com/cat/says/a%2Fb%3Fc"
        );
    }

    #[test]
    fn dot_captions_are_rejected() {
        let client = ImageClient::new("https://cataas.com").unwrap();
        for caption in [".", ".."] {
            assert!(matches!(
                client.image_url(caption),
                Err(BackupError::InvalidCaption(c)) if c == caption
            ));
        }
        assert_eq!(
            client.image_url("...").unwrap(),
            "https://cataas.com/cat/says/..."
        );
        assert_eq!(
            client.image_url("%2E%2E").unwrap(),
            "https://cataas.com/cat/says/%252E%252E"
        );
    }

    #[test]
    fn base_url_trailing_slash_is_ignored() {
        let client = ImageClient::new("http://127.0.0.1:8080/").unwrap();
        assert_eq!(client.image_url("hi").unwrap(), "http://127.0.0.1:8080/cat/says/hi");
    }

    #[test]
    fn rejects_unusable_base_url() {
        assert!(matches!(
            ImageClient::new("not a url"),
            Err(BackupError::InvalidConfig(_))
        ));
        assert!(matches!(
            ImageClient::new("mailto:cat@example.org"),
            Err(BackupError::InvalidConfig(_))
        ));
    }
}
