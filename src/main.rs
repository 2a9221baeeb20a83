//! # StockWatch CLI
//!
//! Watches product pages and keeps alerting Telegram chats for as long as
//! a tracked product is in stock.
//!
//! Usage:
//!   stockwatch run                          # Start the bot
//!   stockwatch probe https://shop/item      # Check one page once
//!   stockwatch list 123456                  # Show a chat's tracked links
//!   stockwatch remove 123456 https://...    # Delete a tracked link
//!   stockwatch init                         # Write default config
//!   stockwatch config show                  # Show configuration

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use stockwatch_bot::BotHandler;
use stockwatch_channels::TelegramChannel;
use stockwatch_core::StockWatchConfig;
use stockwatch_core::traits::{Channel, Prober, SubscriptionStore};
use stockwatch_core::types::SubscriberId;
use stockwatch_monitor::Supervisor;
use stockwatch_probe::HttpProber;
use stockwatch_store::SqliteStore;
use tracing_subscriber::EnvFilter;

const CRATES: &[&str] = &[
    "stockwatch",
    "stockwatch_core",
    "stockwatch_monitor",
    "stockwatch_probe",
    "stockwatch_store",
    "stockwatch_channels",
    "stockwatch_bot",
];

#[derive(Parser)]
#[command(
    name = "stockwatch",
    version,
    about = "📦 StockWatch — repeated in-stock alerts over Telegram",
    long_about = "Tracks product pages per chat and messages the chat on every check\nwhile a product is in stock, until the chat stops it."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the Telegram bot and restore saved watches
    Run,

    /// Fetch one product page and print what was extracted
    Probe {
        url: String,
    },

    /// List tracked links saved for a chat
    List {
        /// Telegram chat id
        chat: i64,
    },

    /// Delete a saved link (a running bot keeps polling it until restart)
    Remove {
        /// Telegram chat id
        chat: i64,
        url: String,
    },

    /// Write a default config file
    Init,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Show system info
    Info,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration (secrets masked)
    Show,
    /// Print the config file path
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let level = if cli.verbose { "debug" } else { "info" };
    let filter = CRATES
        .iter()
        .map(|name| format!("{name}={level}"))
        .collect::<Vec<_>>()
        .join(",");
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    // Load config
    let config = if let Some(path) = &cli.config {
        StockWatchConfig::load_from(std::path::Path::new(path))?
    } else {
        StockWatchConfig::load()?
    };

    match cli.command {
        Commands::Run => run(config).await?,

        Commands::Probe { url } => {
            let url = stockwatch_monitor::validate_resource(&url)?;
            let prober = HttpProber::new(config.probe.clone())?;
            match prober.probe(&url).await {
                Ok(result) => {
                    println!("📦 {}", result.display_name);
                    println!("   Price: {}", result.price);
                    println!("   Status: {}", result.availability());
                }
                Err(e) => println!("❌ Could not read {url}: {e}"),
            }
        }

        Commands::List { chat } => {
            let store = SqliteStore::open(&config.store.resolved_path())?;
            let rows = store.list_by_subscriber(SubscriberId(chat)).await?;
            if rows.is_empty() {
                println!("No tracked links for chat {chat}.");
            } else {
                println!("Tracked links for chat {chat}:");
                for (url, title) in rows {
                    println!("  • {title}\n    {url}");
                }
            }
        }

        Commands::Remove { chat, url } => {
            let store = SqliteStore::open(&config.store.resolved_path())?;
            store.delete(SubscriberId(chat), url.trim()).await?;
            println!("✅ Removed {url} for chat {chat}.");
        }

        Commands::Init => {
            let path = StockWatchConfig::default_path();
            if path.exists() {
                println!("Config already exists: {}", path.display());
                return Ok(());
            }
            StockWatchConfig::default().save()?;
            println!("✅ Config saved to: {}", path.display());

            println!("\n📋 Next steps:");
            println!("  1. Put your bot token in [telegram] bot_token,");
            println!("     or export {}", stockwatch_core::config::TOKEN_ENV);
            println!("  2. Start the bot: stockwatch run");
        }

        Commands::Config { action } => match action {
            ConfigAction::Show => {
                let content = toml::to_string_pretty(&config.masked())?;
                println!("{content}");
            }
            ConfigAction::Path => {
                let path = cli
                    .config
                    .map(std::path::PathBuf::from)
                    .unwrap_or_else(StockWatchConfig::default_path);
                println!("{}", path.display());
            }
        },

        Commands::Info => {
            println!("📦 StockWatch v{}", env!("CARGO_PKG_VERSION"));
            println!("   Platform: {} / {}", std::env::consts::OS, std::env::consts::ARCH);
            println!("   Config: {}", StockWatchConfig::default_path().display());
            let db_path = config.store.resolved_path();
            println!("   Database: {}", db_path.display());
            if db_path.exists() {
                println!("   Tracked links: {}", SqliteStore::open(&db_path)?.count()?);
            }
            println!("   Check interval: {}s", config.monitor.check_interval().as_secs());
            println!(
                "   Telegram: {}",
                if !config.telegram.enabled {
                    "disabled"
                } else if config.telegram.bot_token.is_empty() {
                    "no token"
                } else {
                    "configured"
                }
            );
        }
    }

    Ok(())
}

/// Wire the store, prober and Telegram channel into a supervisor, restore
/// saved watches in the background and serve commands until Ctrl+C.
async fn run(config: StockWatchConfig) -> Result<()> {
    if !config.telegram.enabled {
        anyhow::bail!("Telegram channel is disabled in config");
    }

    let store = Arc::new(SqliteStore::open(&config.store.resolved_path())?);
    let prober = Arc::new(HttpProber::new(config.probe.clone())?);

    let mut telegram = TelegramChannel::new(config.telegram.clone());
    telegram.connect().await?;
    let telegram = Arc::new(telegram);

    let supervisor = Arc::new(Supervisor::new(
        store,
        prober,
        telegram.clone(),
        config.monitor.clone(),
    ));

    let restore = {
        let supervisor = supervisor.clone();
        tokio::spawn(async move {
            if let Err(e) = supervisor.restore_after_settle().await {
                tracing::error!("Failed to restore saved watches: {e}");
            }
        })
    };

    println!("📦 StockWatch v{} running. Press Ctrl+C to stop.", env!("CARGO_PKG_VERSION"));

    let bot = Arc::new(BotHandler::new(supervisor.clone()));
    let channel: Arc<dyn Channel> = telegram;
    tokio::select! {
        result = bot.run(channel) => result?,
        _ = tokio::signal::ctrl_c() => tracing::info!("Shutdown requested"),
    }

    restore.abort();
    let stopped = supervisor.shutdown().await;
    println!("\n👋 Stopped {stopped} pollers.");
    Ok(())
}
