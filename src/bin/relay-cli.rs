//! relay-cli: inspect a running relay through its admin API.

use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "relay-cli")]
#[command(about = "Management CLI for the radio relay", long_about = None)]
struct Cli {
    /// Admin API base URL.
    #[arg(short, long, default_value = "http://localhost:4534")]
    url: String,

    /// Admin API key.
    #[arg(short, long, env = "RELAY_ADMIN_KEY", hide_env_values = true)]
    key: String,

    /// Print the raw JSON response.
    #[arg(long)]
    raw: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Clone, Copy)]
enum Commands {
    /// Version, state and live session count
    Status,
    /// Live relay sessions
    Sessions,
    /// Upstream settings currently applied
    Config,
}

impl Commands {
    fn path(self) -> &'static str {
        match self {
            Commands::Status => "status",
            Commands::Sessions => "sessions",
            Commands::Config => "config",
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let res = reqwest::Client::new()
        .get(format!("{}/admin/{}", cli.url.trim_end_matches('/'), cli.command.path()))
        .bearer_auth(&cli.key)
        .send()
        .await?;

    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: admin API returned {}", status);
        if let Ok(text) = res.text().await {
            if !text.is_empty() {
                eprintln!("{}", text);
            }
        }
        std::process::exit(1);
    }

    let body: Value = res.json().await?;
    if cli.raw {
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    match cli.command {
        Commands::Status => print_status(&body),
        Commands::Sessions => print_sessions(&body),
        Commands::Config => println!("{}", serde_json::to_string_pretty(&body)?),
    }
    Ok(())
}

fn print_status(body: &Value) {
    println!(
        "radio-relay {} ({})",
        body["version"].as_str().unwrap_or("?"),
        body["status"].as_str().unwrap_or("unknown")
    );
    println!("active sessions: {}", body["active_sessions"]);
    println!("stations:        {}", body["radios"]);
}

fn print_sessions(body: &Value) {
    let sessions = body.as_array().map(Vec::as_slice).unwrap_or_default();
    if sessions.is_empty() {
        println!("no live sessions");
        return;
    }

    println!("{:<8} {:<10} {:>12} {:>9}  URL", "ID", "PHASE", "BYTES", "SECS");
    for s in sessions {
        println!(
            "{:<8} {:<10} {:>12} {:>9.1}  {}",
            s["id"].as_u64().unwrap_or(0),
            s["phase"].as_str().unwrap_or("?"),
            s["bytes"].as_u64().unwrap_or(0),
            s["elapsed_secs"].as_f64().unwrap_or(0.0),
            s["url"].as_str().unwrap_or(""),
        );
    }
}
