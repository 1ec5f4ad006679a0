//! Config handling: defaults for the remotes and logging setup.

use crate::api::PollPolicy;
use anyhow::Context;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Folder on the disk that receives every upload unless overridden.
pub const DEFAULT_FOLDER: &str = "SPD-142";

/// The "cat says" image service.
pub const IMAGE_API_URL: &str = "https://cataas.com";

/// Base of the Yandex.Disk REST API.
pub const DISK_API_URL: &str = "https://cloud-api.yandex.net/v1/disk";

/// Default log file, appended to on every run.
pub const DEFAULT_LOG_FILE: &str = "backup.log";

const LOG_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Everything the backup pipeline needs apart from the caption and token.
#[derive(Debug, Clone)]
pub struct BackupSettings {
    /// Remote folder label, also used to name the JSON file.
    pub folder: String,
    pub image_base_url: String,
    pub disk_base_url: String,
    /// Where `backup_info_<folder>.json` is written.
    pub output_dir: PathBuf,
    pub poll: PollPolicy,
}

impl Default for BackupSettings {
    fn default() -> Self {
        BackupSettings {
            folder: DEFAULT_FOLDER.to_string(),
            image_base_url: IMAGE_API_URL.to_string(),
            disk_base_url: DISK_API_URL.to_string(),
            output_dir: PathBuf::from("."),
            poll: PollPolicy::default(),
        }
    }
}

/// Sets up logging to `console` (normally stderr) and `log_file`.
///
/// `RUST_LOG` wins over the debug flag when it is set.
pub fn setup_logging<W>(debug: bool, log_file: &Path, console: W) -> anyhow::Result<()>
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .with_context(|| format!("Failed to open log file {}", log_file.display()))?;

    let default_directives = if debug {
        "debug"
    } else {
        "info,reqwest=warn,hyper=warn"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives));

    let timer = ChronoLocal::new(LOG_TIME_FORMAT.to_string());
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(console)
        .with_timer(timer.clone());
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_timer(timer);

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to initialize logger")
}
