use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt};

use icobench::core::{DEFAULT_ICO_LIST, DEFAULT_PEOPLE_LIST};
use icobench::{Config, IcoBenchApi, IcoBenchClient, RequestBody};

#[derive(Parser)]
#[command(name = "icobench", about = "Query the ICObench API")]
struct Cli {
    /// TOML config file (defaults to ./icobench.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List ICOs: all, trending, filters, ratings
    Icos {
        #[arg(default_value = DEFAULT_ICO_LIST)]
        kind: String,
        /// Request body as a JSON object
        #[arg(long)]
        data: Option<String>,
    },
    /// Fetch one ICO by id or url slug
    Ico {
        id: String,
        #[arg(long)]
        data: Option<String>,
    },
    /// Fetch an auxiliary listing, e.g. stats
    Other { kind: String },
    /// List people: registered, expert
    People {
        #[arg(default_value = DEFAULT_PEOPLE_LIST)]
        kind: String,
        #[arg(long)]
        data: Option<String>,
    },
}

fn parse_body(data: Option<&str>) -> Result<RequestBody> {
    let Some(raw) = data else {
        return Ok(RequestBody::new());
    };
    match serde_json::from_str::<Value>(raw).context("--data is not valid JSON")? {
        Value::Object(map) => Ok(map),
        _ => bail!("--data must be a JSON object"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?,
    }
    .with_env();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let client = IcoBenchClient::from_config(&config).context("Failed to build client")?;
    tracing::debug!(
        base_uri = %config.transport.base_uri,
        public_key = client.public_key(),
        "client ready"
    );

    let payload = match cli.command {
        Command::Icos { kind, data } => client.get_icos(&kind, parse_body(data.as_deref())?).await,
        Command::Ico { id, data } => client.get_ico(&id, parse_body(data.as_deref())?).await,
        Command::Other { kind } => client.get_other(&kind).await,
        Command::People { kind, data } => {
            client.get_people(&kind, parse_body(data.as_deref())?).await
        }
    }?;

    match payload {
        Value::String(s) => println!("{}", s),
        other => println!("{}", serde_json::to_string_pretty(&other)?),
    }

    Ok(())
}
