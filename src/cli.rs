use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::utils::version;

#[derive(Parser)]
#[command(author, version = version(), about, long_about = None)]
#[command(subcommand_value_name = "SUBCOMMAND")]
#[command(subcommand_help_heading = "Subcommands")]
pub struct Cli {
    /// Path to config file (default: `$XDG_CONFIG_HOME/tickglide/config.kdl`).
    ///
    /// This can also be set with the `TICKGLIDE_CONFIG` environment variable. If both are set,
    /// the command line argument takes precedence.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub subcommand: Sub,
}

#[derive(Subcommand)]
pub enum Sub {
    /// Replay a recorded input trace on a virtual clock and print every frame.
    Replay(ReplayArgs),
    /// Scroll a virtual list with synthetic wheel ticks on a real event loop.
    Demo(DemoArgs),
    /// Validate the config file.
    Validate,
}

#[derive(Args, Debug, Clone)]
pub struct ReplayArgs {
    /// JSON trace file, or `-` for stdin.
    pub trace: PathBuf,
    /// Format output as JSON.
    #[arg(short, long)]
    pub json: bool,
    /// Frame interval in milliseconds (default: from the trace, then from the config).
    #[arg(long)]
    pub frame_interval_ms: Option<f64>,
}

#[derive(Args, Debug, Clone)]
pub struct DemoArgs {
    /// Number of wheel ticks to send.
    #[arg(long, default_value_t = 8)]
    pub ticks: u32,
    /// Milliseconds between ticks.
    #[arg(long, default_value_t = 60)]
    pub spacing_ms: u64,
    /// Reverse the wheel after this many ticks.
    #[arg(long)]
    pub reverse_after: Option<u32>,
    /// Length of the virtual list; the offset is clamped to it.
    #[arg(long, default_value_t = 2000.)]
    pub extent: f64,
}
