// UI layer: prompts, the upload progress bar and the final banner.
// Everything here talks to the terminal; the backup logic lives in
// `backup` and never prints.

use crate::api::ProgressReporter;
use anyhow::Result;
use dialoguer::{Input, Password};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::io::{self, Write};
use std::path::Path;
use tracing_subscriber::fmt::MakeWriter;

const WIDTH: usize = 60;

/// Print the program header.
pub fn print_header() {
    println!("{}", "=".repeat(WIDTH));
    println!("   CAT PICTURE BACKUP");
    println!("{}", "=".repeat(WIDTH));
}

/// Ask for the caption. Returns `None` when the user enters nothing.
pub fn prompt_caption() -> Result<Option<String>> {
    let caption: String = Input::new()
        .with_prompt("Text for the picture")
        .allow_empty(true)
        .interact_text()?;
    Ok(non_empty(caption))
}

/// Ask for the disk token without echoing it.
pub fn prompt_token() -> Result<Option<String>> {
    let token: String = Password::new()
        .with_prompt("Yandex.Disk token")
        .allow_empty_password(true)
        .interact()?;
    Ok(non_empty(token))
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Echo what is about to happen before the backup starts.
pub fn print_plan(caption: &str, folder: &str) {
    println!("\nStarting backup...");
    println!("Text: {caption}");
    println!("Folder: {folder}");
    println!("{}", "-".repeat(40));
}

/// Final banner. Details of a failure are in the log file only.
pub fn print_outcome(success: bool, folder: &str, json_path: &Path, log_file: &Path) {
    if success {
        println!("\n✅ Backup completed successfully!");
        println!("📁 Disk folder: {folder}");
        println!("📄 JSON file: {}", json_path.display());
        println!("📋 Log: {}", log_file.display());
    } else {
        println!("\n❌ Backup failed");
        println!("See {} for details", log_file.display());
    }
    println!("{}", "=".repeat(WIDTH));
}

/// Percent progress bar shown while the disk fetches the picture.
pub struct TerminalProgress {
    bar: ProgressBar,
}

impl TerminalProgress {
    pub fn new() -> Self {
        // Hidden until an upload actually starts polling.
        let bar = ProgressBar::with_draw_target(Some(100), ProgressDrawTarget::hidden());
        if let Ok(style) =
            ProgressStyle::with_template("{msg} {bar:40.cyan/blue} {pos:>3}%")
        {
            bar.set_style(style.progress_chars("##-"));
        }
        TerminalProgress { bar }
    }
}

impl TerminalProgress {
    /// Stderr writer for console logs that hides the bar while a line is
    /// printed, so log output does not tear it.
    pub fn console_writer(&self) -> BarAwareStderr {
        BarAwareStderr {
            bar: self.bar.clone(),
        }
    }
}

/// Writes to stderr with the progress bar suspended.
#[derive(Clone)]
pub struct BarAwareStderr {
    bar: ProgressBar,
}

impl Write for BarAwareStderr {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bar.suspend(|| io::stderr().write(buf))
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.bar.suspend(|| io::stderr().write_all(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()
    }
}

impl<'a> MakeWriter<'a> for BarAwareStderr {
    type Writer = BarAwareStderr;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

impl Default for TerminalProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for TerminalProgress {
    fn start(&self, label: &str) {
        self.bar.reset();
        self.bar.set_message(format!("Uploading {label}"));
        self.bar.set_draw_target(ProgressDrawTarget::stderr());
    }

    fn advance(&self, delta: u64) {
        self.bar.inc(delta);
    }

    fn finish(&self) {
        self.bar.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_input_is_treated_as_missing() {
        assert_eq!(non_empty("   ".to_string()), None);
        assert_eq!(non_empty(" meow \n".to_string()), Some("meow".to_string()));
    }

    #[test]
    fn console_writer_works_while_bar_is_running() {
        let progress = TerminalProgress::new();
        progress.start("SPD-142/cat.jpg");
        progress.advance(40);
        let mut writer = progress.console_writer().make_writer();
        writer.write_all(b"log line during upload\n").unwrap();
        writer.flush().unwrap();
        progress.finish();
        assert_eq!(progress.bar.position(), 40);
    }
}
