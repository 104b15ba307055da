//! Studio API client CLI.
//!
//! Sends one request through the resilient client and prints the payload as
//! JSON, or inspects and resets the persisted circuit breakers.
//!
//! ```text
//! studio-client --config client.toml get /projects --query page=2
//! studio-client post /jobs --body '{"kind":"export"}'
//! studio-client breaker /render
//! studio-client reset-breaker
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde_json::Value;

use studio_api_client::config::{load_config, ClientSettings};
use studio_api_client::http::{ApiClient, ClientError, Method, RequestOptions};
use studio_api_client::observability::logging;
use studio_api_client::CancelHandle;

#[derive(Parser)]
#[command(name = "studio-client")]
#[command(about = "Resilient client for the studio backend API", long_about = None)]
struct Cli {
    /// TOML configuration file; defaults are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// GET a path
    Get(RequestArgs),
    /// POST a JSON body to a path
    Post(RequestArgs),
    /// PUT a JSON body to a path
    Put(RequestArgs),
    /// DELETE a path
    Delete(RequestArgs),
    /// Show the circuit breaker guarding a path
    Breaker { path: Option<String> },
    /// Force the circuit breaker guarding a path closed
    ResetBreaker { path: Option<String> },
}

#[derive(clap::Args)]
struct RequestArgs {
    path: String,

    /// JSON request body
    #[arg(long)]
    body: Option<String>,

    /// Query parameter as key=value (repeatable)
    #[arg(long = "query", value_parser = parse_pair)]
    query: Vec<(String, String)>,

    /// Request header as name=value (repeatable)
    #[arg(long = "header", value_parser = parse_pair)]
    headers: Vec<(String, String)>,
}

fn parse_pair(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected key=value, got '{}'", raw))
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match cli.config.as_deref().map(load_config).transpose() {
        Ok(settings) => settings.unwrap_or_default(),
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    logging::init_logging(&settings.observability);

    match run(cli.command, &settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(
    command: Commands,
    settings: &ClientSettings,
) -> Result<(), Box<dyn std::error::Error>> {
    let client = ApiClient::from_settings(settings)?;

    let (method, args) = match command {
        Commands::Get(args) => (Method::Get, args),
        Commands::Post(args) => (Method::Post, args),
        Commands::Put(args) => (Method::Put, args),
        Commands::Delete(args) => (Method::Delete, args),
        Commands::Breaker { path } => {
            let snapshot = client.breaker_snapshot(path.as_deref().unwrap_or(""));
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
            return Ok(());
        }
        Commands::ResetBreaker { path } => {
            let path = path.as_deref().unwrap_or("");
            client.reset_circuit(path);
            println!("{}", serde_json::to_string_pretty(&client.breaker_snapshot(path))?);
            return Ok(());
        }
    };

    let body = args.body.as_deref().map(serde_json::from_str::<Value>).transpose()?;

    // Ctrl-C abandons the in-flight attempt without counting it against the breaker.
    let cancel = CancelHandle::new();
    let mut options = RequestOptions::new().cancel_with(cancel.token());
    for (k, v) in args.query {
        options = options.query(k, v);
    }
    for (k, v) in args.headers {
        options = options.header(k, v);
    }
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    match client.request_raw(method, &args.path, body, options).await {
        Ok(response) => {
            tracing::info!(
                status = response.status,
                correlation_id = %response.correlation_id,
                "Request succeeded"
            );
            println!("{}", serde_json::to_string_pretty(&response.body.into_json())?);
            Ok(())
        }
        Err(ClientError::Api(err)) => {
            println!("{}", serde_json::to_string_pretty(&err)?);
            Err(err.into())
        }
        Err(e) => Err(e.into()),
    }
}
