//! Clear or remove a session's debug log file.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use debugd_client::cleanup;

#[derive(Parser, Debug)]
#[command(name = "debug-cleanup", version)]
#[command(about = "Clear or remove a session's debug log file")]
struct Cli {
    /// What to do with the log file
    #[arg(value_enum)]
    action: Action,

    /// Project directory containing the log subdirectory
    project_dir: PathBuf,

    /// Session whose log file is targeted
    session_id: String,

    /// Log subdirectory under the project directory
    #[arg(long, default_value = debugd_client::DEFAULT_LOG_SUBDIR)]
    log_subdir: String,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Action {
    /// Truncate the log file to empty
    Clear,
    /// Delete the log file
    Remove,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.action {
        Action::Clear => {
            let path = cleanup::clear(&cli.project_dir, &cli.log_subdir, &cli.session_id)?;
            println!("Cleared: {}", path.display());
        }
        Action::Remove => {
            let path = cleanup::remove(&cli.project_dir, &cli.log_subdir, &cli.session_id)?;
            println!("Removed: {}", path.display());
        }
    }

    Ok(())
}
