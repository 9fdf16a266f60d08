use clap::{Parser, Subcommand};
use reqwest::header::{HeaderName, HeaderValue};
use reqwest::Method;

use watchlog_edge::config::{RetryConfig, RetryOverride, TimeoutConfig};
use watchlog_edge::fetch::{
    build_client, check_response_status, fetch_with_retry, parse_json_response, RequestOptions,
};
use watchlog_edge::{ClassifiedError, UrlPolicy};

#[derive(Parser)]
#[command(name = "edge-cli")]
#[command(about = "Inspect the watchlog edge: URL policy checks and retrying fetches", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check whether the image proxy would fetch a URL
    Check {
        url: String,

        /// Storage service base URL (falls back to WATCHLOG_STORAGE_URL)
        #[arg(long, env = "WATCHLOG_STORAGE_URL")]
        storage_url: Option<String>,
    },
    /// Fetch a JSON document with retries and print it
    Fetch {
        url: String,

        #[arg(short = 'X', long, default_value = "GET")]
        method: String,

        /// Extra request header, as `name: value`
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,

        #[arg(long)]
        max_retries: Option<u32>,

        #[arg(long)]
        retry_delay_ms: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Check { url, storage_url } => {
            let policy = UrlPolicy::new(storage_url.as_deref());
            match policy.check(&url) {
                Ok(parsed) => println!("allowed: {}", parsed),
                Err(denial) => {
                    println!("rejected ({}): {}", denial.as_str(), denial);
                    std::process::exit(1);
                }
            }
        }
        Commands::Fetch {
            url,
            method,
            headers,
            max_retries,
            retry_delay_ms,
        } => {
            let retry = RetryConfig::default().with_overrides(RetryOverride {
                max_retries,
                retry_delay_ms,
                ..Default::default()
            });
            let options = build_options(&method, &headers)?;
            let client = build_client(&TimeoutConfig::default())?;

            if let Err(e) = fetch_json(&client, &url, &options, &retry).await {
                eprintln!("Error [{}]: {}", e.kind(), e);
                if let Some(code) = e.code() {
                    eprintln!("  code: {}", code);
                }
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

fn build_options(method: &str, headers: &[String]) -> Result<RequestOptions, ClassifiedError> {
    let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
        .map_err(|e| ClassifiedError::validation(format!("Invalid method: {}", e)))?;

    let mut options = RequestOptions::new(method);
    for raw in headers {
        let (name, value) = raw.split_once(':').ok_or_else(|| {
            ClassifiedError::validation(format!("Header '{}' is not 'name: value'", raw))
        })?;
        let name = HeaderName::from_bytes(name.trim().as_bytes())
            .map_err(|e| ClassifiedError::validation(format!("Invalid header name: {}", e)))?;
        let value = HeaderValue::from_str(value.trim())
            .map_err(|e| ClassifiedError::validation(format!("Invalid header value: {}", e)))?;
        options = options.header(name, value);
    }
    Ok(options)
}

async fn fetch_json(
    client: &reqwest::Client,
    url: &str,
    options: &RequestOptions,
    retry: &RetryConfig,
) -> Result<(), ClassifiedError> {
    let response = fetch_with_retry(client, url, options, retry).await?;
    check_response_status(&response)?;
    let body: serde_json::Value = parse_json_response(response).await?;

    let pretty = serde_json::to_string_pretty(&body)
        .map_err(|e| ClassifiedError::parse(format!("Failed to format JSON: {}", e)))?;
    println!("{}", pretty);
    Ok(())
}
