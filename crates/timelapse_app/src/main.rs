mod app;
mod cli;
mod effects;
mod render;
mod settings;

use std::process::ExitCode;

use clap::Parser;

fn main() -> anyhow::Result<ExitCode> {
    let cli = cli::Cli::parse();
    timelapse_logging::initialize(&cli.log_options());

    let succeeded = match cli.command {
        cli::Command::Process(args) => app::run_process(args)?,
        cli::Command::Health(args) => app::run_health(args)?,
    };
    Ok(if succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
