use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::StatusCode;
use serde_json::Value;

#[derive(Parser)]
#[command(name = "config-cli")]
#[command(about = "Management CLI for the realtime-config admin API", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8081")]
    url: String,

    /// API key for write commands
    #[arg(short, long, env = "REALTIME_CONFIG_API_KEY")]
    key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show cache, store and listener status
    Status,
    /// List every defined config value
    List,
    /// Read one config value
    Get { key: String },
    /// Write a config value (parsed as JSON, falling back to a plain string)
    Set { key: String, value: String },
    /// Show recent config changes
    Changes,
    /// Drop a key from the service's local cache
    Invalidate { key: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    if let Some(key) = &cli.key {
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", key))?,
        );
    }

    let res = match cli.command {
        Commands::Status => client.get(format!("{}/api/status", cli.url)).send().await?,
        Commands::List => client.get(format!("{}/api/configs", cli.url)).send().await?,
        Commands::Get { key } => {
            client
                .get(format!("{}/api/configs/{}", cli.url, key))
                .send()
                .await?
        }
        Commands::Set { key, value } => {
            let value: Value = serde_json::from_str(&value).unwrap_or(Value::String(value));
            client
                .put(format!("{}/api/configs/{}", cli.url, key))
                .headers(headers)
                .json(&value)
                .send()
                .await?
        }
        Commands::Changes => client.get(format!("{}/api/changes", cli.url)).send().await?,
        Commands::Invalidate { key } => {
            client
                .delete(format!("{}/api/cache/{}", cli.url, key))
                .headers(headers)
                .send()
                .await?
        }
    };
    print_response(res).await?;

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        let text = res.text().await.unwrap_or_default();
        return Err(api_error(status, &text).into());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

fn api_error(status: StatusCode, body: &str) -> String {
    if body.is_empty() {
        format!("admin API returned status {}", status)
    } else {
        format!("admin API returned status {}: {}", status, body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_message() {
        assert_eq!(
            api_error(StatusCode::UNAUTHORIZED, ""),
            "admin API returned status 401 Unauthorized"
        );
        assert_eq!(
            api_error(StatusCode::SERVICE_UNAVAILABLE, r#"{"error":"down"}"#),
            r#"admin API returned status 503 Service Unavailable: {"error":"down"}"#
        );
    }
}
