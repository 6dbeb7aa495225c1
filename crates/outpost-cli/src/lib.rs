//! # Outpost CLI
//!
//! Operator command-line interface for Outpost: publish a test event
//! against a running service, trigger a manual retry, and inspect the
//! configuration that `outpost-service` would resolve from its
//! environment. Tenant/destination administration, session inspection,
//! and log queries are out of scope here the same way they are on the
//! HTTP edge itself.

use clap::{Parser, Subcommand, ValueEnum};
use outpost_api::ServiceConfig;
use std::path::PathBuf;
use tracing::info;

/// Outpost CLI - publish test events and inspect configuration
#[derive(Parser)]
#[command(name = "outpost")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Operator CLI for the Outpost event-delivery service")]
pub struct Cli {
    /// Base URL of a running outpost-service instance
    #[arg(long, env = "OUTPOST_URL", default_value = "http://127.0.0.1:8080")]
    pub url: String,

    /// Logging level
    #[arg(short, long, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Publish an event to a running service
    Publish {
        /// Read the publish request body from a JSON file instead of flags
        #[arg(long)]
        file: Option<PathBuf>,

        /// Tenant the event belongs to
        #[arg(long)]
        tenant_id: Option<String>,

        /// Event topic, e.g. "orders.created"
        #[arg(long)]
        topic: Option<String>,

        /// Event payload as a JSON string
        #[arg(long)]
        data: Option<String>,

        /// Explicit event id; generated by the service when omitted
        #[arg(long)]
        id: Option<String>,

        /// Route directly to one destination instead of topic matching
        #[arg(long)]
        destination_id: Option<String>,

        /// Whether the event is eligible for automatic redelivery
        #[arg(long, default_value_t = true)]
        eligible_for_retry: bool,
    },

    /// Trigger a manual retry for a previously published event
    Retry {
        /// Event id to redeliver
        event_id: String,

        /// Destination to redeliver to
        destination_id: String,
    },

    /// Configuration inspection commands
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the configuration outpost-service would resolve from its
    /// current environment
    Show {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = ConfigFormat::Yaml)]
        format: ConfigFormat,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("configuration error: {0}")]
    Configuration(#[from] outpost_api::ConfigError),

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("the service reported an error: {status} {body}")]
    ServiceError {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("failed to render configuration: {0}")]
    Serialization(String),
}

pub async fn run_cli() -> Result<(), CliError> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Publish {
            file,
            tenant_id,
            topic,
            data,
            id,
            destination_id,
            eligible_for_retry,
        } => {
            execute_publish(
                &cli.url,
                file,
                tenant_id,
                topic,
                data,
                id,
                destination_id,
                eligible_for_retry,
            )
            .await
        }
        Commands::Retry {
            event_id,
            destination_id,
        } => execute_retry(&cli.url, event_id, destination_id).await,
        Commands::Config { action } => execute_config(action),
    }
}

fn build_publish_body(
    file: Option<PathBuf>,
    tenant_id: Option<String>,
    topic: Option<String>,
    data: Option<String>,
    id: Option<String>,
    destination_id: Option<String>,
    eligible_for_retry: bool,
) -> Result<serde_json::Value, CliError> {
    if let Some(path) = file {
        let contents = std::fs::read_to_string(path)?;
        return Ok(serde_json::from_str(&contents)?);
    }

    let tenant_id = tenant_id.ok_or_else(|| CliError::InvalidArgument {
        message: "--tenant-id is required unless --file is given".to_string(),
    })?;
    let topic = topic.ok_or_else(|| CliError::InvalidArgument {
        message: "--topic is required unless --file is given".to_string(),
    })?;
    let data: serde_json::Value = match data {
        Some(raw) => serde_json::from_str(&raw)?,
        None => serde_json::json!({}),
    };

    let mut body = serde_json::json!({
        "tenant_id": tenant_id,
        "topic": topic,
        "data": data,
        "eligible_for_retry": eligible_for_retry,
    });
    if let Some(id) = id {
        body["id"] = serde_json::Value::String(id);
    }
    if let Some(destination_id) = destination_id {
        body["destination_id"] = serde_json::Value::String(destination_id);
    }
    Ok(body)
}

async fn execute_publish(
    base_url: &str,
    file: Option<PathBuf>,
    tenant_id: Option<String>,
    topic: Option<String>,
    data: Option<String>,
    id: Option<String>,
    destination_id: Option<String>,
    eligible_for_retry: bool,
) -> Result<(), CliError> {
    let body = build_publish_body(file, tenant_id, topic, data, id, destination_id, eligible_for_retry)?;

    info!(%base_url, "publishing event");
    let response = reqwest::Client::new()
        .post(format!("{base_url}/api/v1/publish"))
        .json(&body)
        .send()
        .await?;

    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    if !status.is_success() {
        return Err(CliError::ServiceError { status, body: text });
    }
    println!("{text}");
    Ok(())
}

async fn execute_retry(
    base_url: &str,
    event_id: String,
    destination_id: String,
) -> Result<(), CliError> {
    let body = serde_json::json!({
        "event_id": event_id,
        "destination_id": destination_id,
    });

    info!(%base_url, %event_id, %destination_id, "requesting manual retry");
    let response = reqwest::Client::new()
        .post(format!("{base_url}/api/v1/retry"))
        .json(&body)
        .send()
        .await?;

    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    if !status.is_success() {
        return Err(CliError::ServiceError { status, body: text });
    }
    println!("{text}");
    Ok(())
}

fn execute_config(action: ConfigCommands) -> Result<(), CliError> {
    match action {
        ConfigCommands::Show { format } => {
            let config = ServiceConfig::from_env()?;
            let rendered = render_config(&config, format)?;
            println!("{rendered}");
            Ok(())
        }
    }
}

fn render_config(config: &ServiceConfig, format: ConfigFormat) -> Result<String, CliError> {
    Ok(match format {
        ConfigFormat::Yaml => {
            serde_yaml::to_string(config).map_err(|e| CliError::Serialization(e.to_string()))?
        }
        ConfigFormat::Json => serde_json::to_string_pretty(config)?,
        ConfigFormat::Toml => {
            toml::to_string_pretty(config).map_err(|e| CliError::Serialization(e.to_string()))?
        }
    })
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
