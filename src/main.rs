// Entrypoint for the CLI application.
// - Collects the caption and token (flags, env or prompts), then hands
//   them to a `BackupManager` for a single run.
// - Success or failure is reported as text only; the process exit code
//   does not change.

use cat_backup::backup::BackupManager;
use cat_backup::cli::CliOptions;
use cat_backup::config::setup_logging;
use cat_backup::ui;
use clap::Parser;
use std::sync::Arc;

fn main() -> anyhow::Result<()> {
    let cli = CliOptions::parse();
    ui::print_header();

    let caption = match cli.caption.clone() {
        Some(caption) if !caption.trim().is_empty() => Some(caption.trim().to_string()),
        Some(_) => None,
        None => ui::prompt_caption()?,
    };
    let Some(caption) = caption else {
        println!("Error: the text cannot be empty");
        return Ok(());
    };

    let token = match cli.token.clone() {
        Some(token) if !token.trim().is_empty() => Some(token.trim().to_string()),
        Some(_) => None,
        None => ui::prompt_token()?,
    };
    let Some(token) = token else {
        println!("Error: the token cannot be empty");
        return Ok(());
    };

    let progress = Arc::new(ui::TerminalProgress::new());
    setup_logging(cli.debug, &cli.log_file, progress.console_writer())?;

    let settings = cli.settings();
    ui::print_plan(&caption, &settings.folder);

    let mut manager = BackupManager::new(settings).with_progress(progress);
    let success = manager.run(&caption, &token).is_ok();

    ui::print_outcome(
        success,
        &manager.settings().folder,
        &manager.json_path(),
        &cli.log_file,
    );
    Ok(())
}
