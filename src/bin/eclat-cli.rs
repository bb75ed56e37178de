use std::path::PathBuf;

use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;
use uuid::Uuid;

use eclat_api::payments::webhook::{sign_payload, SIGNATURE_HEADER};

#[derive(Parser)]
#[command(name = "eclat-cli")]
#[command(about = "Ops CLI for the eclat marketplace API", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    /// Admin API key (Bearer token).
    #[arg(short, long, default_value = "CHANGE_ME_IN_PRODUCTION")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check API system status
    Status,
    /// Platform analytics: profile counts, premium counts, engagement
    Analytics,
    /// Run the boost expiry sweep now
    ExpireBoosts,
    /// Change a profile's moderation status
    SetStatus {
        profile_id: Uuid,
        /// active, pending or banned
        status: String,
    },
    /// Sign a JSON event file and deliver it to the webhook endpoint
    TestWebhook {
        /// Path to the JSON event payload
        payload: PathBuf,
        /// Webhook signing secret
        #[arg(short, long)]
        secret: String,
    },
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

    match cli.command {
        Commands::Status => {
            let res = client
                .get(format!("{}/admin/status", cli.url))
                .headers(headers)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Analytics => {
            let res = client
                .get(format!("{}/admin/analytics", cli.url))
                .headers(headers)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::ExpireBoosts => {
            let res = client
                .post(format!("{}/admin/tasks/expire-boosts", cli.url))
                .headers(headers)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::SetStatus { profile_id, status } => {
            let res = client
                .patch(format!("{}/admin/profiles/{}/status", cli.url, profile_id))
                .headers(headers)
                .json(&serde_json::json!({ "status": status }))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::TestWebhook { payload, secret } => {
            let body = std::fs::read(&payload)?;
            let timestamp = chrono::Utc::now().timestamp();
            let signature = sign_payload(&body, &secret, timestamp);

            let res = client
                .post(format!("{}/webhooks/stripe", cli.url))
                .header(SIGNATURE_HEADER, signature)
                .header("content-type", "application/json")
                .body(body)
                .send()
                .await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
