//! Quill - multi-agent novel writing server
//!
//! Main entry point for the HTTP server.

use std::path::PathBuf;

use clap::Parser;
use quill::{server, Config};
use tracing_subscriber::EnvFilter;

/// Quill - multi-agent novel writing server
#[derive(Parser, Debug)]
#[command(name = "quill")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file (defaults to the user config directory)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Listen port
    #[arg(long, short = 'p')]
    port: Option<u16>,

    /// Listen host
    #[arg(long)]
    host: Option<String>,

    /// Directory holding the novel files
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Completion model
    #[arg(long, short = 'm')]
    model: Option<String>,

    /// Enable debug output
    #[arg(long, short = 'd')]
    debug: bool,

    /// Print the default configuration and exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.print_config {
        println!("{}", Config::default_config_toml());
        return Ok(());
    }

    // Build configuration
    let mut config = match args.config {
        Some(ref path) => Config::load_from(path)?,
        None => Config::load(),
    };

    // Apply CLI overrides
    if let Some(port) = args.port {
        config.server.port = port;
    }

    if let Some(host) = args.host {
        config.server.host = host;
    }

    if let Some(data_dir) = args.data_dir {
        config.sandbox.data_dir = data_dir;
    }

    if let Some(model) = args.model {
        config.llm.model = model;
    }

    if args.debug {
        config.agent.debug = true;
    }

    tracing_subscriber::fmt()
        .with_env_filter(log_filter(config.agent.debug)?)
        .init();

    server::start_server(config).await
}

/// `RUST_LOG` wins when set; otherwise log at info. Debug mode adds `quill=debug`.
fn log_filter(debug: bool) -> anyhow::Result<EnvFilter> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if debug {
        return Ok(filter.add_directive("quill=debug".parse()?));
    }
    Ok(filter)
}
