use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::*;
use parley_server::config::{DEFAULT_AUTH_SECRET, DEFAULT_PING_INTERVAL};
use parley_server::{JwtCredentials, ServerConfig, serve};
use std::net::SocketAddr;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "parley", version, about = "WebRTC signaling relay")]
struct Cli {
    /// Log filter, e.g. `info` or `parley_server=debug`. Overrides RUST_LOG.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct AuthArgs {
    /// Shared HS256 secret for signing and verifying credentials.
    #[arg(long, env = "PARLEY_AUTH_SECRET", default_value = DEFAULT_AUTH_SECRET, hide_default_value = true)]
    auth_secret: String,

    #[arg(long, env = "PARLEY_TOKEN_TTL_SECS", default_value_t = 24 * 60 * 60)]
    token_ttl_secs: u64,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the signaling server.
    Serve {
        #[arg(long, env = "PARLEY_BIND", default_value = "0.0.0.0:8080")]
        bind: SocketAddr,

        /// Seconds between keepalive pings on each signaling connection.
        #[arg(long, env = "PARLEY_PING_INTERVAL_SECS", default_value_t = DEFAULT_PING_INTERVAL.as_secs())]
        ping_interval_secs: u64,

        #[command(flatten)]
        auth: AuthArgs,
    },

    /// Issue a credential for a subject.
    Token {
        subject: String,

        #[command(flatten)]
        auth: AuthArgs,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());

    match cli.command {
        Commands::Serve {
            bind,
            ping_interval_secs,
            auth,
        } => {
            let config = ServerConfig {
                bind_addr: bind,
                auth_secret: auth.auth_secret,
                token_ttl: Duration::from_secs(auth.token_ttl_secs),
                ping_interval: Duration::from_secs(ping_interval_secs.max(1)),
            };
            serve(config).await?;
        }

        Commands::Token { subject, auth } => {
            let credentials =
                JwtCredentials::new(&auth.auth_secret, Duration::from_secs(auth.token_ttl_secs));
            let token = credentials
                .issue(&subject)
                .context("Failed to issue credential")?;
            let claims = credentials.claims(&token)?;

            println!("{} {}", "Identity:".cyan().bold(), claims.identity());
            println!("{} {}s", "Expires in:".cyan().bold(), auth.token_ttl_secs);
            println!("{}", token.green());
        }
    }

    Ok(())
}

fn init_tracing(log_level: Option<&str>) {
    let filter = match log_level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
