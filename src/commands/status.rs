//! Server status command.

use clap::Args;
use serde::Deserialize;

use crate::config::Config;

/// Show server health and the identity of the configured API key
#[derive(Debug, Args)]
pub struct StatusCommand;

#[derive(Deserialize)]
struct Health {
    status: String,
    version: String,
}

#[derive(Deserialize)]
struct Me {
    user_id: String,
    role: String,
}

impl StatusCommand {
    pub async fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        println!("Server: {}", config.server_url.value);
        println!("  source: {}", config.server_url.source);
        println!();

        if !config.is_configured() {
            println!("Status: Not configured");
            println!();
            println!("To connect, add to your config file:");
            println!();
            println!("  server_url: \"http://localhost:8080\"");
            println!("  api_key: \"your-api-key\"");
            println!();
            println!("Or set environment variables:");
            println!();
            println!("  HOSTEL_SERVER_URL=http://localhost:8080");
            println!("  HOSTEL_API_KEY=your-api-key");
            return Ok(());
        }

        let remote = config.remote_store()?;
        match remote.get_json::<Health>("health").await {
            Ok(health) => println!("Status: {} (server {})", health.status, health.version),
            Err(e) => {
                println!("Status: unreachable");
                return Err(e.into());
            }
        }

        let me: Me = remote.get_json("me").await?;
        println!("Signed in as: {} ({})", me.user_id, me.role);
        if me.user_id != config.user_id.value {
            println!(
                "Warning: user_id in config is '{}' but the API key belongs to '{}'",
                config.user_id.value, me.user_id
            );
        }
        Ok(())
    }
}
