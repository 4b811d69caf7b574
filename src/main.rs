use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod cmd;

#[derive(Parser)]
#[command(name = "handover")]
#[command(version, about = "Management transition dashboard")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Directory holding `.handover/` (defaults to the current directory)
    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Launch the dashboard server
    Serve {
        /// Port to serve on (overrides handover.toml and HANDOVER_PORT)
        #[arg(short, long)]
        port: Option<u16>,

        /// Database path (overrides handover.toml and HANDOVER_DB)
        #[arg(long)]
        db_path: Option<PathBuf>,

        /// Keep all data in memory for this run
        #[arg(long)]
        ephemeral: bool,

        /// Open the dashboard in a browser once the server is listening
        #[arg(long)]
        open: bool,

        /// Enable dev mode (permissive CORS, bind all interfaces)
        #[arg(long)]
        dev: bool,
    },
    /// Create the database and seed or repair the transition plan
    Init,
    /// Inspect or reset the transition plan
    Plan {
        #[command(subcommand)]
        command: PlanCommands,
    },
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum PlanCommands {
    /// Print the plan as text
    Show,
    /// Overwrite the plan with the default template
    Repair,
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Validate configuration and show any warnings
    Validate,
    /// Initialize a default handover.toml file
    Init,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "handover=debug" } else { "handover=info" };
    let filter = EnvFilter::try_from_env("HANDOVER_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let project_dir = match cli.project_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    match cli.command {
        Commands::Serve {
            port,
            db_path,
            ephemeral,
            open,
            dev,
        } => {
            let args = cmd::ServeArgs {
                port,
                db_path,
                ephemeral,
                open,
                dev,
            };
            cmd::cmd_serve(&project_dir, args).await?;
        }
        Commands::Init => cmd::cmd_init(&project_dir).await?,
        Commands::Plan { command } => cmd::cmd_plan(&project_dir, command).await?,
        Commands::Config { command } => cmd::cmd_config(&project_dir, command)?,
    }

    Ok(())
}
