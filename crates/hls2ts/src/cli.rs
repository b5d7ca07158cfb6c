use std::path::PathBuf;

use clap::Parser;

/// Live HLS to DVB multicast transport stream bridge.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to the JSON configuration file.
    #[arg(short, long, default_value = "config.json")]
    pub config: PathBuf,

    /// Directory log files are written under, overriding `logging.file.path`.
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Raise the console log level to debug regardless of `logging.level`.
    #[arg(short, long)]
    pub verbose: bool,

    /// Validate the configuration and exit without starting any stream.
    #[arg(long)]
    pub check_config: bool,
}
