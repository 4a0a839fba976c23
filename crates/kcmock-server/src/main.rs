//! # kcmock
//!
//! Standalone entry point for the mock identity provider.

#![forbid(unsafe_code)]
#![deny(warnings)]

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kcmock_core::{Protocol, ServerConfig};
use kcmock_server::Server;

/// Starts a stand-alone mock OpenID Connect provider.
#[derive(Debug, Parser)]
#[command(name = "kcmock")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Port to listen on. 0 selects an ephemeral port.
    #[arg(short, long, default_value_t = 8000)]
    port: u16,

    /// Issue HTTPS URLs instead of HTTP.
    #[arg(short = 's', long)]
    tls: bool,

    /// Hostname used in issuer URLs.
    #[arg(long, default_value = "localhost")]
    hostname: String,

    /// Default realm of issued tokens.
    #[arg(short, long, default_value = "master")]
    realm: String,

    /// Context path prefix of all endpoints.
    #[arg(long, default_value = "/auth", conflicts_with = "no_context_path")]
    context_path: String,

    /// Serve all endpoints directly under the server root.
    #[arg(long)]
    no_context_path: bool,

    /// Lifespan in seconds of issued tokens.
    #[arg(long, default_value_t = 36_000)]
    token_lifespan: u64,
}

impl Cli {
    fn into_config(self) -> ServerConfig {
        let defaults = ServerConfig::default();
        ServerConfig {
            port: self.port,
            protocol: if self.tls {
                Protocol::Https
            } else {
                Protocol::Http
            },
            default_hostname: self.hostname,
            context_path: if self.no_context_path {
                String::new()
            } else {
                self.context_path
            },
            default_realm: self.realm,
            default_token_lifespan_secs: self.token_lifespan,
            ..defaults
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let server = Server::new(cli.into_config())?;
    server.run().await
}
