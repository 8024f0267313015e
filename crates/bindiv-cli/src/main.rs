use std::error::Error;

use clap::{Parser, Subcommand};
use commands::{
    embed::{self, EmbedArgs},
    run::{self, RunArgs},
    schedule::{self, ScheduleArgs},
};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser, Debug)]
#[command(
    name = "bindiv",
    version,
    about = "Pairwise binary similarity studies across compiler variants"
)]
struct Cli {
    /// Only log warnings and errors (RUST_LOG still takes precedence).
    #[arg(long, global = true)]
    quiet: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Diff every scheduled pair, aggregate, embed and write the study exports.
    Run(RunArgs),
    /// Print the catalog and the ordered pair list without invoking the tool.
    Schedule(ScheduleArgs),
    /// Embed a persisted distance matrix.
    Embed(EmbedArgs),
}

fn init_logging(quiet: bool) {
    let default_directive = if quiet { "warn" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging(cli.quiet);
    match cli.command {
        Command::Run(args) => run::run(&args),
        Command::Schedule(args) => schedule::run(&args),
        Command::Embed(args) => embed::run(&args),
    }
}
