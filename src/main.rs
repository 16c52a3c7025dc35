use clap::{Parser, Subcommand};
use hostel_sync_core::DocumentStore;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;

use commands::{
    BusCommand, ChatCommand, ConfigCommand, ContactsCommand, LaundryCommand, MessCommand,
    RequestsCommand, StatusCommand, StudentsCommand,
};
use config::Config;

#[derive(Parser)]
#[command(name = "hostel")]
#[command(version)]
#[command(about = "Live hostel records: bus timings, mess menu, laundry, requests and chat", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Bus routes and timings
    Bus(BusCommand),

    /// Daily mess menu
    Mess(MessCommand),

    /// Laundry settings
    Laundry(LaundryCommand),

    /// Emergency contacts
    Contacts(ContactsCommand),

    /// Service requests
    Requests(RequestsCommand),

    /// Chat with the admin desk
    Chat(ChatCommand),

    /// Student roster
    Students(StudentsCommand),

    /// Show server status
    Status(StatusCommand),

    /// Manage configuration
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hostel=warn,hostel_sync_core=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config)?;

    match cli.command {
        Some(Commands::Bus(cmd)) => cmd.run(connect(&config)?).await?,
        Some(Commands::Mess(cmd)) => cmd.run(connect(&config)?).await?,
        Some(Commands::Laundry(cmd)) => cmd.run(connect(&config)?).await?,
        Some(Commands::Contacts(cmd)) => cmd.run(connect(&config)?).await?,
        Some(Commands::Requests(cmd)) => cmd.run(connect(&config)?, &config).await?,
        Some(Commands::Chat(cmd)) => cmd.run(connect(&config)?, &config).await?,
        Some(Commands::Students(cmd)) => cmd.run(&config).await?,
        Some(Commands::Status(cmd)) => cmd.run(&config).await?,
        Some(Commands::Config(cmd)) => cmd.run(&config)?,
        None => {
            println!("Use --help to see available commands");
        }
    }

    Ok(())
}

fn connect(config: &Config) -> Result<Arc<dyn DocumentStore>, config::ConfigError> {
    Ok(Arc::new(config.remote_store()?))
}
