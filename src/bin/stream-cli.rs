use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "stream-cli")]
#[command(about = "Operator CLI for the Stream Sentinel service", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8000")]
    url: String,

    /// Correlation id sent with the request (generated by the service when absent)
    #[arg(short, long)]
    correlation_id: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Liveness probe
    Live,
    /// Readiness probe
    Ready,
    /// Detailed health report
    Health,
    /// Publish a test event to the stream
    Trigger,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    if let Some(id) = &cli.correlation_id {
        headers.insert("x-correlation-id", HeaderValue::from_str(id)?);
    }

    let request = match cli.command {
        Commands::Live => client.get(format!("{}/health/live", cli.url)),
        Commands::Ready => client.get(format!("{}/health/ready", cli.url)),
        Commands::Health => client.get(format!("{}/health", cli.url)),
        Commands::Trigger => client.post(format!("{}/trigger-test-event", cli.url)),
    };

    let res = request.headers(headers).send().await?;
    let healthy = print_response(res).await?;
    if !healthy {
        std::process::exit(1);
    }
    Ok(())
}

/// Print the JSON body; returns whether the status was a success.
async fn print_response(res: reqwest::Response) -> Result<bool, Box<dyn std::error::Error>> {
    let status = res.status();
    if let Some(id) = res.headers().get("x-correlation-id").and_then(|v| v.to_str().ok()) {
        eprintln!("x-correlation-id: {}", id);
    }

    let text = res.text().await?;
    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", text),
    }

    if !status.is_success() {
        eprintln!("Error: service returned status {}", status);
    }
    Ok(status.is_success())
}
