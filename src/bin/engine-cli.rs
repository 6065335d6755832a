use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "engine-cli")]
#[command(about = "Operator CLI for the damage analysis engine", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8000")]
    url: String,

    /// Engine secret sent as X-Engine-Key.
    #[arg(short, long, env = "ENGINE_API_KEY", default_value = "")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show model, auth and rate-limit status
    Health,
    /// Analyze images already placed in an allowed root
    Analyze {
        /// Image paths as seen by the engine
        #[arg(required = true)]
        paths: Vec<String>,

        #[arg(long, default_value = "")]
        request_id: String,

        /// Identity to rate limit under (X-RateLimit-Key)
        #[arg(long)]
        rate_key: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Health => {
            let res = client.get(format!("{}/health", cli.url)).send().await?;
            print_response(res).await?;
        }
        Commands::Analyze {
            paths,
            request_id,
            rate_key,
        } => {
            let mut headers = HeaderMap::new();
            headers.insert("x-engine-key", HeaderValue::from_str(&cli.key)?);
            if let Some(rate_key) = rate_key {
                headers.insert("x-ratelimit-key", HeaderValue::from_str(&rate_key)?);
            }
            let res = client
                .post(format!("{}/analyze", cli.url))
                .headers(headers)
                .json(&json!({ "request_id": request_id, "paths": paths }))
                .send()
                .await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    if !status.is_success() {
        eprintln!("Error: engine returned status {}", status);
    }
    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", text),
    }
    Ok(())
}
