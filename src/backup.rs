// Backup pipeline: resolve the image, prepare the folder, upload, then
// write a JSON summary of everything uploaded during this run.

use crate::api::{DiskClient, NoProgress, ProgressReporter};
use crate::config::BackupSettings;
use crate::error::BackupError;
use crate::image::ImageClient;
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Characters replaced by `_` when turning a caption into a file name.
const FORBIDDEN_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*', ' '];

/// Longest caption prefix kept in a file name, counted before the extension.
const MAX_NAME_CHARS: usize = 100;

const FILE_EXTENSION: &str = ".jpg";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One uploaded file, as written to `backup_info_<folder>.json`.
///
/// Field order here is the field order in the file.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UploadRecord {
    pub filename: String,
    /// Size reported by the image host; 0 when it was not known.
    pub size_bytes: u64,
    /// Caption the image was generated for.
    pub text: String,
    pub download_url: String,
    #[serde(rename = "yandex_path")]
    pub destination_path: String,
    #[serde(rename = "backup_time")]
    pub timestamp: String,
    #[serde(rename = "group_name")]
    pub folder: String,
}

/// Serialize records the way they are stored on disk: a pretty-printed
/// JSON array with non-ASCII text left as-is.
pub fn records_to_json(records: &[UploadRecord]) -> Result<String, BackupError> {
    Ok(serde_json::to_string_pretty(records)?)
}

/// Parse a `backup_info_*.json` document back into records.
pub fn records_from_json(json: &str) -> Result<Vec<UploadRecord>, BackupError> {
    Ok(serde_json::from_str(json)?)
}

/// Turn a caption into a file name: forbidden characters and spaces become
/// `_`, the result is cut to 100 characters and `.jpg` is appended.
pub fn sanitize_filename(caption: &str) -> String {
    let mut name: String = caption
        .chars()
        .map(|c| if FORBIDDEN_CHARS.contains(&c) { '_' } else { c })
        .take(MAX_NAME_CHARS)
        .collect();
    name.push_str(FILE_EXTENSION);
    name
}

/// Runs backups and keeps the records of every successful one.
pub struct BackupManager {
    settings: BackupSettings,
    progress: Arc<dyn ProgressReporter>,
    records: Vec<UploadRecord>,
}

impl BackupManager {
    pub fn new(settings: BackupSettings) -> Self {
        BackupManager {
            settings,
            progress: Arc::new(NoProgress),
            records: Vec::new(),
        }
    }

    /// Report upload progress to `progress` instead of dropping it.
    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    pub fn settings(&self) -> &BackupSettings {
        &self.settings
    }

    /// Records of the uploads that succeeded so far, oldest first.
    pub fn records(&self) -> &[UploadRecord] {
        &self.records
    }

    /// Where the JSON summary for the configured folder is written.
    pub fn json_path(&self) -> PathBuf {
        self.settings
            .output_dir
            .join(format!("backup_info_{}.json", self.settings.folder))
    }

    /// Back up the image for `caption` into the configured folder using
    /// the disk `token`. Returns the new record on success.
    ///
    /// Nothing is recorded unless the upload itself succeeded. Failing to
    /// write the JSON file afterwards is logged but not returned.
    pub fn run(&mut self, caption: &str, token: &str) -> Result<UploadRecord, BackupError> {
        info!("{}", "=".repeat(50));
        info!(caption, folder = %self.settings.folder, "Starting backup");

        match self.upload(caption, token) {
            Ok(record) => {
                self.records.push(record.clone());
                if let Err(err) = self.save_records() {
                    error!(error = ?err, "Failed to save backup info, the upload itself succeeded");
                }
                info!(path = %record.destination_path, "Backup completed");
                info!("{}", "=".repeat(50));
                Ok(record)
            }
            Err(err) => {
                error!(error = ?err, "Backup failed: {err}");
                Err(err)
            }
        }
    }

    fn upload(&self, caption: &str, token: &str) -> Result<UploadRecord, BackupError> {
        let folder = &self.settings.folder;

        info!("Step 1: resolving image URL");
        let images = ImageClient::new(&self.settings.image_base_url)?;
        let image_url = images.resolve(caption)?;

        info!("Step 2: preparing the disk folder");
        let disk = DiskClient::new(&self.settings.disk_base_url, token)?
            .with_poll_policy(self.settings.poll)
            .with_progress(Arc::clone(&self.progress));
        disk.ensure_folder(folder)?;

        info!("Step 3: uploading to the disk");
        let filename = sanitize_filename(caption);
        let destination_path = format!("{folder}/{filename}");
        disk.upload_from_url(&image_url, &destination_path)?;

        let size_bytes = images.probe_size(&image_url);
        if size_bytes == 0 {
            warn!(url = %image_url, "Could not determine image size, recording 0");
        }

        Ok(UploadRecord {
            filename,
            size_bytes,
            text: caption.to_string(),
            download_url: image_url,
            destination_path,
            timestamp: Local::now().format(TIMESTAMP_FORMAT).to_string(),
            folder: folder.clone(),
        })
    }

    /// Write every record to [`BackupManager::json_path`], replacing the
    /// previous file.
    pub fn save_records(&self) -> Result<PathBuf, BackupError> {
        let path = self.json_path();
        if self.records.is_empty() {
            warn!("No upload records to save");
            return Ok(path);
        }

        let json = records_to_json(&self.records)?;
        std::fs::write(&path, json).map_err(|source| BackupError::LocalIo {
            path: path.clone(),
            source,
        })?;
        info!(path = %path.display(), records = self.records.len(), "Backup info saved");
        Ok(path)
    }
}
