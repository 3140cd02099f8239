use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use directories::ProjectDirs;
use lodestone_lib::{SyncConfig, SyncOrchestrator};
use std::path::PathBuf;
use std::process::ExitCode;

/// Keep a Minecraft mods folder on the latest compatible Modrinth releases
#[derive(Parser, Debug)]
#[command(name = "lodestone", version, about, long_about = None)]
struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Identify, update and index every archive in the mods directory
    Sync(SyncArgs),

    /// Write the default configuration if none exists
    Init(ConfigArgs),
}

#[derive(Args, Debug)]
struct ConfigArgs {
    /// Path to the configuration file
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct SyncArgs {
    #[command(flatten)]
    config: ConfigArgs,

    /// Override the configured mods directory
    #[arg(long)]
    mods_dir: Option<PathBuf>,

    /// Resolve everything but download, delete and write nothing
    #[arg(long)]
    dry_run: bool,
}

fn default_config_path() -> PathBuf {
    ProjectDirs::from("com", "lodestone", "lodestone")
        .map(|dirs| dirs.config_dir().join("config.json"))
        .unwrap_or_else(|| PathBuf::from("config.json"))
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();
}

fn init(args: ConfigArgs) -> Result<()> {
    let path = args.config.unwrap_or_else(default_config_path);
    SyncConfig::load_or_create(&path)
        .with_context(|| format!("Failed to initialise configuration at {:?}", path))?;
    println!("{}", path.display());
    Ok(())
}

async fn sync(args: SyncArgs) -> Result<()> {
    let path = args.config.config.unwrap_or_else(default_config_path);
    let mut config = SyncConfig::load_or_create(&path)
        .with_context(|| format!("Failed to load configuration from {:?}", path))?;
    if let Some(mods_dir) = args.mods_dir {
        config.mods_dir = mods_dir;
    }
    if args.dry_run {
        config.dry_run = true;
    }

    let orchestrator = SyncOrchestrator::from_config(config)?;
    let report = orchestrator.run().await?;
    println!("{}", report);
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Sync(args) => sync(args).await,
        Commands::Init(args) => init(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
