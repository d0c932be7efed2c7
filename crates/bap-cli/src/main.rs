mod commands;
mod progress;
mod summary;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "bap", about = "Best Available Pixel compositing for satellite scenes")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a composite from a scene file
    Run(commands::run::RunArgs),
    /// List the sensor catalog, or the priority list of a year
    Info(commands::info::InfoArgs),
    /// Show the collections and grid of a scene file
    Scene(commands::scene::SceneArgs),
    /// Show season windows for a range of years
    Season(commands::season::SeasonArgs),
    /// Print or save a default composite config
    Config(commands::config::ConfigArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match &cli.command {
        Commands::Run(args) => commands::run::run(args),
        Commands::Info(args) => commands::info::run(args),
        Commands::Scene(args) => commands::scene::run(args),
        Commands::Season(args) => commands::season::run(args),
        Commands::Config(args) => commands::config::run(args),
    }
}
