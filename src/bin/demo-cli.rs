use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde_json::{json, Value};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "demo-cli")]
#[command(about = "Management CLI for the monitoring demo service", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    /// Admin token for the toggle endpoints. Falls back to $ADMIN_TOKEN.
    #[arg(short, long)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Call GET /api/v1/ping
    Ping,
    /// Run simulated work
    Work {
        /// Base duration in milliseconds
        #[arg(long, default_value_t = 100)]
        ms: u64,
        /// Upper bound of random extra duration in milliseconds
        #[arg(long, default_value_t = 0)]
        jitter: u64,
    },
    /// Configure error injection. Omitting --enabled disables it.
    ErrorRate {
        #[arg(long)]
        enabled: bool,
        #[arg(long, default_value_t = 0.0)]
        rate: f64,
        #[arg(long, default_value_t = 500)]
        status_code: u16,
    },
    /// Force the readiness probe to fail, or clear the override
    Readiness {
        #[arg(long)]
        force_failure: bool,
    },
    /// Query the readiness probe
    Ready,
    /// Dump the Prometheus exposition
    Metrics,
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let token = cli
        .token
        .or_else(|| std::env::var("ADMIN_TOKEN").ok())
        .unwrap_or_else(|| "changeme".to_string());
    let mut admin_headers = HeaderMap::new();
    admin_headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", token))?,
    );

    let res = match cli.command {
        Commands::Ping => client.get(format!("{}/api/v1/ping", base)).send().await?,
        Commands::Work { ms, jitter } => {
            client
                .get(format!("{}/api/v1/work", base))
                .query(&[("ms", ms), ("jitter", jitter)])
                .send()
                .await?
        }
        Commands::ErrorRate {
            enabled,
            rate,
            status_code,
        } => {
            client
                .post(format!("{}/api/v1/toggles/error-rate", base))
                .headers(admin_headers)
                .json(&json!({
                    "enabled": enabled,
                    "rate": rate,
                    "status_code": status_code,
                }))
                .send()
                .await?
        }
        Commands::Readiness { force_failure } => {
            client
                .post(format!("{}/api/v1/toggles/readiness", base))
                .headers(admin_headers)
                .json(&json!({ "force_failure": force_failure }))
                .send()
                .await?
        }
        Commands::Ready => client.get(format!("{}/readyz", base)).send().await?,
        Commands::Metrics => client.get(format!("{}/metrics", base)).send().await?,
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let status = res.status();
    let is_json = res
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"));
    let text = res.text().await?;

    if !status.is_success() {
        eprintln!("Error: service returned status {}", status);
        eprintln!("Response: {}", text.trim_end());
        return Ok(ExitCode::FAILURE);
    }

    if is_json {
        let json: Value = serde_json::from_str(&text)?;
        println!("{}", serde_json::to_string_pretty(&json)?);
    } else {
        println!("{}", text.trim_end());
    }
    Ok(ExitCode::SUCCESS)
}
