//! CLI parser
use crate::api::PollPolicy;
use crate::config::{BackupSettings, DEFAULT_FOLDER, DEFAULT_LOG_FILE, DISK_API_URL, IMAGE_API_URL};
use clap::Parser;
use std::num::NonZeroU32;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(about = "Back up a \"cat says\" picture to Yandex.Disk")]
/// CLI Options
pub struct CliOptions {
    #[clap(long, help = "Enable debug logging", env = "CAT_BACKUP_DEBUG")]
    pub debug: bool,

    #[clap(long, short, default_value = DEFAULT_FOLDER, env = "CAT_BACKUP_FOLDER")]
    /// Folder on the disk that receives the picture.
    pub folder: String,

    #[clap(long, short)]
    /// Caption for the picture. Prompted for when missing.
    pub caption: Option<String>,

    #[clap(long, env = "CAT_BACKUP_TOKEN", hide_env_values = true)]
    /// Yandex.Disk OAuth token. Prompted for when missing.
    pub token: Option<String>,

    #[clap(long, default_value = IMAGE_API_URL, env = "CAT_BACKUP_IMAGE_API")]
    pub image_api: String,

    #[clap(long, default_value = DISK_API_URL, env = "CAT_BACKUP_DISK_API")]
    pub disk_api: String,

    #[clap(long, short, default_value = ".")]
    /// Directory for `backup_info_<folder>.json`.
    pub output_dir: PathBuf,

    #[clap(long, default_value = DEFAULT_LOG_FILE)]
    pub log_file: PathBuf,

    #[clap(long, default_value = "30")]
    /// How many times the upload status is checked before giving up.
    pub poll_attempts: NonZeroU32,

    #[clap(long, default_value = "1000")]
    /// Pause between status checks, in milliseconds.
    pub poll_interval_ms: u64,
}

impl CliOptions {
    pub fn settings(&self) -> BackupSettings {
        BackupSettings {
            folder: self.folder.clone(),
            image_base_url: self.image_api.clone(),
            disk_base_url: self.disk_api.clone(),
            output_dir: self.output_dir.clone(),
            poll: PollPolicy {
                interval: Duration::from_millis(self.poll_interval_ms),
                max_attempts: self.poll_attempts.get(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_settings_defaults() {
        let cli = CliOptions::try_parse_from(["cat-backup"]).unwrap();
        let settings = cli.settings();
        let defaults = BackupSettings::default();
        assert_eq!(settings.folder, defaults.folder);
        assert_eq!(settings.image_base_url, defaults.image_base_url);
        assert_eq!(settings.disk_base_url, defaults.disk_base_url);
        assert_eq!(settings.poll, defaults.poll);
        assert_eq!(cli.log_file, PathBuf::from("backup.log"));
    }

    #[test]
    fn overrides_are_applied() {
        let cli = CliOptions::try_parse_from([
            "cat-backup",
            "--folder",
            "cats",
            "--caption",
            "hello",
            "--poll-attempts",
            "5",
            "--poll-interval-ms",
            "0",
        ])
        .unwrap();
        assert_eq!(cli.caption.as_deref(), Some("hello"));
        let settings = cli.settings();
        assert_eq!(settings.folder, "cats");
        assert_eq!(settings.poll.max_attempts, 5);
        assert_eq!(settings.poll.interval, Duration::ZERO);
    }

    #[test]
    fn zero_poll_attempts_is_rejected() {
        assert!(CliOptions::try_parse_from(["cat-backup", "--poll-attempts", "0"]).is_err());
    }
}
