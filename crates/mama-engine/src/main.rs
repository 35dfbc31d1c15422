// mama/crates/mama-engine/src/main.rs

#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use mama_engine::{config::Config, run_server};

/// Session and context-selection server
#[cfg(feature = "cli")]
#[derive(Debug, Parser)]
#[command(name = "mama-engine", version, about)]
struct Args {
    /// Bind address, overrides API_HOST
    #[arg(long)]
    host: Option<std::net::IpAddr>,

    /// Bind port, overrides API_PORT
    #[arg(long)]
    port: Option<u16>,
}

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let mut cfg = Config::from_env()?;
    if let Some(host) = args.host {
        cfg.api_host = host;
    }
    if let Some(port) = args.port {
        cfg.api_port = port;
    }

    println!("🚀 Starting mama-engine on {}", cfg.api_addr());
    run_server(cfg).await
}

#[cfg(not(feature = "cli"))]
fn main() {
    println!("CLI feature not enabled. Enable with --features cli");
}
