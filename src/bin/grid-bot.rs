// Recentering Grid Bot - CLI
// Single entry point: init a config, check it, run the paper-trading loop

use clap::{Parser, Subcommand};
use recentering_grid_bot::{Config, TradingError};
use rust_decimal::Decimal;
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing::{error, info, warn, Level};

#[path = "../cli/run_commands.rs"]
mod run_commands;

#[derive(Parser)]
#[command(name = "grid-bot")]
#[command(version)]
#[command(about = "Single-level recentering grid trading bot", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true, default_value = "config.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Validate the configuration and show the grid around a center price
    Check {
        /// Center price to preview rungs for
        #[arg(long)]
        center: Option<Decimal>,
    },

    /// Run the grid loop against live public prices with a paper exchange
    Run {
        /// Stop after this many cycles
        #[arg(long)]
        cycles: Option<usize>,

        /// Center for the first placement instead of the live price
        #[arg(long)]
        center: Option<Decimal>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Config is loaded before logging so its level and file apply; init needs neither
    let config = match &cli.command {
        Commands::Init { .. } => None,
        _ => match Config::from_file(&cli.config) {
            Ok(config) => Some(config),
            Err(e) => {
                setup_logging(cli.verbose, None);
                error!("❌ Configuration Error");
                error!("{}", e.user_message());
                std::process::exit(1);
            }
        },
    };

    setup_logging(cli.verbose, config.as_ref());
    info!("🚀 Grid Bot v{}", env!("CARGO_PKG_VERSION"));
    info!("📁 Config: {}", cli.config);

    let result = match (cli.command, config) {
        (Commands::Init { force }, _) => init_config(&cli.config, force),
        (Commands::Check { center }, Some(config)) => run_commands::check_config(&config, center),
        (Commands::Run { cycles, center }, Some(config)) => {
            run_commands::run_paper(config, cycles, center).await
        }
        (_, None) => Err(TradingError::Internal("configuration not loaded".to_string())),
    };

    if let Err(e) = result {
        error!("❌ {}", e.user_message());
        std::process::exit(1);
    }
}

fn setup_logging(verbose: bool, config: Option<&Config>) {
    let level = if verbose {
        Level::DEBUG
    } else {
        config
            .and_then(|c| c.logging.level.parse::<Level>().ok())
            .unwrap_or(Level::INFO)
    };

    let log_file = config.and_then(|c| c.logging.file.as_deref());
    if let Some(path) = log_file {
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => {
                tracing_subscriber::fmt()
                    .with_max_level(level)
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .init();
                return;
            }
            Err(e) => eprintln!("⚠️  Cannot open log file {}: {}, logging to stdout", path, e),
        }
    }

    tracing_subscriber::fmt().with_max_level(level).init();
}

fn init_config(path: &str, force: bool) -> Result<(), TradingError> {
    if std::path::Path::new(path).exists() && !force {
        warn!("⚠️  {} already exists, skipping (use --force to overwrite)", path);
        return Ok(());
    }

    Config::default().to_file(path)?;
    info!("📝 Created {}", path);
    info!("💡 Next steps:");
    info!("   1. Edit {} (pair, grid_spacing, min_order_size)", path);
    info!("   2. Run: grid-bot check --center 50000");
    info!("   3. Run: grid-bot run --cycles 10");
    Ok(())
}
