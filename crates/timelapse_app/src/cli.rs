use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};
use timelapse_core::{Quality, SpeedMultiplier};
use timelapse_logging::{LevelFilter, LogDestination, LogOptions};

/// Turn a video into a timelapse using the processing service.
#[derive(Parser, Debug)]
#[command(name = "timelapse", version, arg_required_else_help = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// More log output (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Also write the log to ./timelapse.log.
    #[arg(long, global = true)]
    pub log_file: bool,
}

impl Cli {
    pub fn log_options(&self) -> LogOptions {
        let level = match self.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        };
        LogOptions {
            destination: if self.log_file {
                LogDestination::Both
            } else {
                LogDestination::Terminal
            },
            level,
            ..LogOptions::default()
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Upload a video and wait for the processed timelapse.
    Process(ProcessArgs),
    /// Check that the processing service is up.
    Health(HealthArgs),
}

#[derive(Args, Debug)]
pub struct ProcessArgs {
    /// Video file to process.
    pub video: PathBuf,

    /// Speed multiplier, 1 to 100 (presets: 2, 4, 8, 16). A trailing `x` is accepted.
    #[arg(long)]
    pub speed: Option<SpeedMultiplier>,

    /// Output quality: low, medium or high.
    #[arg(long)]
    pub quality: Option<Quality>,

    /// Keep the audio track instead of removing it.
    #[arg(long)]
    pub keep_audio: bool,

    /// Upload endpoint of the processing service.
    #[arg(long, env = "TIMELAPSE_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Directory for downloads and saved settings.
    #[arg(long, default_value = "output")]
    pub output: PathBuf,

    /// Download the processed video once it is ready.
    #[arg(long)]
    pub download: bool,

    /// Do not remember endpoint and options for the next run.
    #[arg(long)]
    pub no_save_settings: bool,
}

#[derive(Args, Debug)]
pub struct HealthArgs {
    /// Upload endpoint of the processing service; its origin is checked for health.
    #[arg(long, env = "TIMELAPSE_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Directory holding saved settings.
    #[arg(long, default_value = "output")]
    pub output: PathBuf,
}
