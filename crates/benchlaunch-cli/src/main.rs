use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use console::style;
use std::path::PathBuf;

mod commands;
mod logging;
mod settings;

use benchlaunch::LaunchError;
use commands::export::{handle_export, ExportArgs};
use commands::train::{handle_train, TrainArgs};
use logging::setup_logging;
use settings::Settings;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Settings file (defaults to ./benchlaunch.toml or $BENCHLAUNCH_CONFIG)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Show progress logs on the console
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Configure and launch the SSD-ResNet34 training driver
    #[command(about = "Configure and launch the training/evaluation driver")]
    Train(TrainArgs),

    /// Convert a frozen graph into a versioned SavedModel
    #[command(about = "Import a model graph and export a SavedModel")]
    Export(ExportArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let log_name = match &command {
        Command::Train(_) => "train",
        Command::Export(_) => "export",
    };
    setup_logging(Some(log_name), cli.verbose)?;

    let settings = match cli.config.as_deref() {
        Some(path) => Settings::load(Some(path))?,
        None => Settings::load_default()?,
    };

    let result = match command {
        Command::Train(args) => handle_train(args, &settings),
        Command::Export(args) => handle_export(args, &settings),
    };

    match exit_code(result)? {
        0 => Ok(()),
        code => std::process::exit(code),
    }
}

/// Map a handler result to the process exit code.
///
/// Usage errors are printed here and become exit code 1; any other error is
/// handed back to `main`.
fn exit_code(result: Result<i32>) -> Result<i32> {
    match result {
        Ok(code) => Ok(code),
        Err(err) => match err.downcast_ref::<LaunchError>() {
            Some(launch_err) if launch_err.is_usage_error() => {
                eprintln!("{}: {}", style("Error").red().bold(), launch_err);
                Ok(1)
            }
            _ => Err(err),
        },
    }
}
