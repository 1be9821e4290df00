//! Starlink Enterprise MCP server entry point

use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use starlink_client::{Credentials, StarlinkClient, DEFAULT_API_BASE};
use starlink_mcp::{serve_http, serve_stdio};

#[derive(Parser)]
#[command(name = "starlink-mcp", version, about = "MCP server for the Starlink Enterprise API")]
struct Cli {
    /// Base URL of the Starlink Enterprise API
    #[arg(long, default_value = DEFAULT_API_BASE)]
    api_base: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve MCP over stdio (the default)
    Stdio,
    /// Serve MCP over HTTP
    Http {
        /// Address to bind
        #[arg(long, default_value = "127.0.0.1:8787")]
        addr: String,
    },
}

/// Initialize tracing with env-based filtering; logs go to stderr so stdio
/// transport framing stays clean.
fn init_tracing() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing()?;

    let cli = Cli::parse();

    let credentials = Credentials::from_env();
    if !credentials.is_configured() {
        warn!(
            "STARLINK_CLIENT_ID / STARLINK_CLIENT_SECRET are not set; \
             tool calls will fail until they are configured"
        );
    }

    info!("Starlink Enterprise MCP server v{}", env!("CARGO_PKG_VERSION"));

    let client = StarlinkClient::with_base_url(credentials, &cli.api_base)?;

    match cli.command.unwrap_or(Command::Stdio) {
        Command::Stdio => serve_stdio(client).await?,
        Command::Http { addr } => serve_http(client, &addr).await?,
    }

    Ok(())
}
