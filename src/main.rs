use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use mfc::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for mfc::AppCommand {
    fn from(cmd: Commands) -> mfc::AppCommand {
        match cmd {
            Commands::Prices => mfc::AppCommand::Prices,
            Commands::Simulate => mfc::AppCommand::Simulate,
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Display current basket prices from the feed
    Prices,
    /// Run a full fund lifecycle against simulated providers
    Simulate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => setup(),
        Some(cmd) => mfc::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}

fn setup() -> anyhow::Result<()> {
    use anyhow::Context;

    let path = mfc::config::AppConfig::default_config_path()?;

    if path.exists() {
        anyhow::bail!("Configuration file already exists at {}", path.display());
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let default_config = r#"---
fund:
  reference_asset: "USDQ"
  reference_decimals: 6
  share_token: "MFC"
  owner: "fund-admin"
  management_fee_bps: 200
  redemption_fee_bps: 100
  min_investment: 100000000
  max_slippage_bps: 50
  freshness_minutes: 5

basket:
  - identifier: "WBTC"
    allocation_bps: 1250
    decimals: 8
  - identifier: "WETH"
    allocation_bps: 1250
    decimals: 18
  - identifier: "LINK"
    allocation_bps: 1250
    decimals: 18
  - identifier: "DOT"
    allocation_bps: 1250
    decimals: 10

providers:
  feed:
    base_url: "https://rates.mfc.example"
"#;

    std::fs::write(&path, default_config)
        .with_context(|| format!("Failed to write config file to {}", path.display()))?;

    tracing::info!("Created default configuration at {}", path.display());
    Ok(())
}
