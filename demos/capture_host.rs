//! Extension host for full-page capture.
//!
//! Demonstrates:
//! - Building a validated `CaptureConfig`
//! - Binding the WebSocket server the extension connects to
//! - Running one capture session per toolbar click
//!
//! Load `extension/` as an unpacked extension, then:
//!
//! Usage:
//!   cargo run --example capture_host -- --endpoint http://localhost:8888/upload
//!   cargo run --example capture_host -- --endpoint http://localhost:8888/upload --format jpg --debug
//!   cargo run --example capture_host -- --endpoint http://localhost:8888/upload --port 9000

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use page_capture::transport::PendingServer;
use page_capture::{CaptureConfig, Host, HttpUploader, ImageFormat, Pipeline, Result};
use tracing_subscriber::EnvFilter;

// ============================================================================
// Args
// ============================================================================

/// Command-line arguments.
#[derive(Debug, Clone)]
struct Args {
    debug: bool,
    format: Option<String>,
    endpoint: String,
    dump_endpoint: Option<String>,
    port: Option<u16>,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = std::env::args().collect();
        let value_of = |flag: &str| {
            args.iter()
                .position(|a| a == flag)
                .and_then(|i| args.get(i + 1))
                .cloned()
        };

        Self {
            debug: args.iter().any(|a| a == "--debug"),
            format: value_of("--format"),
            endpoint: value_of("--endpoint")
                .unwrap_or_else(|| "http://localhost:8888/upload".to_string()),
            dump_endpoint: value_of("--dump-endpoint"),
            port: value_of("--port").and_then(|p| p.parse().ok()),
        }
    }
}

fn init_logging(debug: bool) {
    let filter = if debug {
        "page_capture=debug"
    } else {
        "page_capture=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(args.debug);

    if let Err(e) = run(args).await {
        eprintln!("\n[ERROR] {e}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    println!("=== Page Capture Host ===\n");

    let mut builder = CaptureConfig::builder()
        .upload_endpoint(&args.endpoint)
        .capture_timeout(Duration::from_secs(10));

    if let Some(dump_endpoint) = &args.dump_endpoint {
        builder = builder.dump_endpoint(dump_endpoint);
    }
    if let Some(port) = args.port {
        builder = builder.port(port);
    }
    if let Some(format) = &args.format {
        builder = builder.format(format.parse::<ImageFormat>()?);
    }

    let config = builder.build()?;
    let uploader = HttpUploader::from_config(&config)?;
    let server = PendingServer::bind(config.bind_ip, config.port).await?;

    println!("[Host] Listening on {}", server.ws_url());
    println!("       Uploads  -> {}", config.upload_endpoint);
    println!("       Dumps    -> {}", config.dump_endpoint);
    println!("       Click the toolbar button to capture. Ctrl+C to exit.\n");

    let pipeline = Arc::new(Pipeline::new(config, Arc::new(uploader)));
    let host = Host::new(pipeline);

    tokio::select! {
        result = host.serve(server) => result,
        _ = tokio::signal::ctrl_c() => {
            println!("\n[Host] Shutting down");
            Ok(())
        }
    }
}
