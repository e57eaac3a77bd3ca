use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;
mod config;
mod data;
mod engines;
mod resolve;
mod styles;
mod tls;
mod watch;

#[derive(Parser)]
struct Args {
    /// The command to execute
    #[command(subcommand)]
    command: WeftCommand,
}

#[derive(Parser)]
struct InitArgs {
    /// The path to initialize the project in
    path: PathBuf,

    /// Whether to create the directory if it doesn't exist
    #[arg(short, long, default_value = "false")]
    create: bool,
}

#[derive(Parser)]
struct BuildArgs {
    /// The path to the configuration file
    #[arg(short, long, default_value = "weft.yaml")]
    config_file: Option<PathBuf>,
}

#[derive(Parser)]
struct ServeArgs {
    /// The address to bind to (overrides server.host)
    #[arg(short, long)]
    bind: Option<String>,

    /// The port to bind to (overrides server.port)
    #[arg(short, long)]
    port: Option<u16>,

    /// Open the project in the default browser
    #[arg(short, long, default_value = "false")]
    open: bool,

    /// The path to the configuration file
    #[arg(short, long, default_value = "weft.yaml")]
    config_file: Option<PathBuf>,

    /// Whether to watch for changes and run the configured commands
    #[arg(short, long, default_value = "true")]
    watch: bool,
}

#[derive(Subcommand)]
enum WeftCommand {
    /// Initialize a new weft project
    Init(InitArgs),

    /// Build the project to the output directory
    Build(BuildArgs),

    /// Serve the project with the template dev middleware
    Serve(ServeArgs),
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let args = Args::parse();

    match args.command {
        WeftCommand::Init(args) => {
            commands::init::run(&args).await?;
        }
        WeftCommand::Build(args) => {
            commands::build::run(&args).await?;
        }
        WeftCommand::Serve(args) => {
            commands::serve::run(&args).await?;
        }
    }

    Ok(())
}
