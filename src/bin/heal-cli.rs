use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Method;
use serde_json::Value;

#[derive(Parser)]
#[command(name = "heal-cli")]
#[command(about = "Management CLI for the self-heal daemon", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8787")]
    url: String,

    #[arg(short, long, env = "SELF_HEAL_ADMIN_KEY", default_value = "CHANGE_ME_IN_PRODUCTION")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the public health report
    Health,
    /// Show daemon status
    Status,
    /// Dump the full persisted health state
    State,
    /// Clear the lock after manual intervention
    Unlock,
    /// Run one probe/escalation tick now
    Tick,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    let (method, path) = match cli.command {
        Commands::Health => (Method::GET, "/health"),
        Commands::Status => (Method::GET, "/admin/status"),
        Commands::State => (Method::GET, "/admin/state"),
        Commands::Unlock => (Method::POST, "/admin/unlock"),
        Commands::Tick => (Method::POST, "/admin/tick"),
    };

    let res = client.request(method, format!("{}{}", cli.url, path))
        .headers(headers)
        .send()
        .await?;
    print_response(res).await?;

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: self-heal API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        std::process::exit(1);
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
