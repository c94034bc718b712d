//! Companion CLI for the debugd daemon.
//!
//! Sends entries from the shell, prints daemon status, and mints short
//! session ids suitable for file names.

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use debugd_client::{new_session_id, DebugLogClient, DEFAULT_PORT};
use serde_json::{Map, Value};

#[derive(Parser, Debug)]
#[command(name = "debug-log", version)]
#[command(about = "Companion CLI for the debugd log daemon")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Send one log entry
    Send(SendArgs),
    /// Print the daemon's status payload
    Status {
        #[arg(long, default_value_t = DEFAULT_PORT)]
        port: u16,
    },
    /// Mint a short session id
    NewSession {
        /// Prefix describing what the session is for
        #[arg(default_value = "session")]
        prefix: String,
    },
}

#[derive(Args, Debug)]
struct SendArgs {
    /// Message text stored under the `msg` key
    #[arg(long)]
    msg: Option<String>,

    /// Target session id (omit for the default session)
    #[arg(long)]
    session: Option<String>,

    /// Extra fields as KEY=VALUE; values parse as JSON, falling back to strings
    #[arg(long = "field", value_name = "KEY=VALUE")]
    fields: Vec<String>,

    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Send(args) => send(args).await,
        Command::Status { port } => status(port).await,
        Command::NewSession { prefix } => {
            println!("{}", new_session_id(&prefix));
            Ok(())
        }
    }
}

async fn send(args: SendArgs) -> Result<()> {
    if !debugd_client::is_running(args.port).await {
        return Err(anyhow!("no debugd daemon responding on port {}", args.port));
    }

    let mut fields = Map::new();
    if let Some(msg) = args.msg {
        fields.insert("msg".to_string(), Value::String(msg));
    }
    for raw in &args.fields {
        let (key, value) = parse_field(raw)?;
        fields.insert(key, value);
    }

    let client = DebugLogClient::local(args.port)?;
    let log_file = client.log(args.session.as_deref(), fields).await?;
    println!("{log_file}");
    Ok(())
}

async fn status(port: u16) -> Result<()> {
    let client = DebugLogClient::local(port)?;
    let status = client
        .status()
        .await
        .with_context(|| format!("no debugd daemon responding on port {port}"))?;

    println!("status:  {}", status.status);
    if let Some(version) = &status.version {
        println!("version: {version}");
    }
    println!("log dir: {}", status.log_dir);
    Ok(())
}

// KEY=VALUE; the value is tried as JSON first so numbers and booleans
// survive, otherwise it is stored as a plain string.
fn parse_field(raw: &str) -> Result<(String, Value)> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("field '{raw}' is not of the form KEY=VALUE"))?;
    if key.is_empty() {
        return Err(anyhow!("field '{raw}' has an empty key"));
    }

    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}
