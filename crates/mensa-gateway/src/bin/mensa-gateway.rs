//! Mensa Gateway Binary
//!
//! Serves the menu dialogue engine over HTTP.
//!
//! # Usage
//! ```bash
//! mensa-gateway [--config gateway.json] [--port 18790] [--host 127.0.0.1] [--verbose]
//! ```

use anyhow::Context;
use clap::Parser;
use mensa_gateway::{Gateway, GatewayConfig};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Mensa Gateway - canteen menu dialogue over HTTP
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on (default: 18790)
    #[arg(short, long)]
    port: Option<u16>,

    /// Host to bind to (default: 127.0.0.1)
    #[arg(long)]
    host: Option<String>,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    // Initialize logging
    if args.verbose {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
            .with_target(false)
            .init();
    }

    let mut config = match &args.config {
        Some(path) => GatewayConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => GatewayConfig::default(),
    }
    .apply_env();

    if let Some(host) = args.host {
        config = config.with_host(host);
    }
    if let Some(port) = args.port {
        config = config.with_port(port);
    }
    config.validate().context("Invalid gateway configuration")?;

    print_banner(&config);

    let gateway = Gateway::new(config).context("Failed to initialize gateway")?;
    gateway.start().await?;

    Ok(())
}

fn print_banner(config: &GatewayConfig) {
    println!();
    println!("╔═══════════════════════════════════════════════════════╗");
    println!("║              MENSA GATEWAY - MENU DIALOGUE            ║");
    println!("╚═══════════════════════════════════════════════════════╝");
    println!();
    println!("HTTP Server");
    println!("   └─ http://{}:{}", config.host, config.port);
    println!();
    println!("Endpoints");
    println!("   ├─ POST   /turn          — Run one dialogue turn");
    println!("   ├─ DELETE /sessions/:id  — Reset a session");
    println!("   ├─ GET    /health        — Health check");
    println!("   └─ GET    /status        — Gateway status");
    println!();
    println!("Provider");
    println!("   └─ {}", config.provider.base_url);
    println!();
    println!("Press Ctrl+C to stop the gateway");
    println!();
}
