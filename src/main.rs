//! OpenAPI Mock Server - CLI Entry Point

use anyhow::Result;
use clap::Parser;
use openapi_mock_server::config::{DEFAULT_MAX_ITEM_COUNT, DEFAULT_MAX_LATENCY_MS};
use openapi_mock_server::{build_router, server, OpenApiDocument, ServerConfig, SpecSource};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(
    name = "openapi-mock-server",
    about = "Mock HTTP server for an OpenAPI document - declared responses and templated examples",
    version
)]
struct Args {
    /// Path to an OpenAPI spec file
    #[arg(long, value_name = "PATH")]
    spec_path: Option<PathBuf>,

    /// URL to an OpenAPI spec file
    #[arg(long, value_name = "URL")]
    spec_url: Option<String>,

    /// Address to listen on
    #[arg(long, default_value = ":3000")]
    listen_addr: String,

    /// Largest latency a client may request with X-Mock-Latency
    #[arg(long, default_value_t = DEFAULT_MAX_LATENCY_MS)]
    max_latency_ms: u64,

    /// Largest item count a client may request with X-Mock-Count
    #[arg(long, default_value_t = DEFAULT_MAX_ITEM_COUNT)]
    max_count: i64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'L', long, default_value = "info")]
    log_level: Level,

    /// Load and check the API document, then exit
    #[arg(long)]
    validate: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = ServerConfig {
        listen_addr: args.listen_addr,
        max_latency: Duration::from_millis(args.max_latency_ms),
        max_item_count: args.max_count,
    };
    config.validate()?;

    let Some(source) = SpecSource::from_options(args.spec_path, args.spec_url) else {
        anyhow::bail!(openapi_mock_server::error::DocumentError::NoSource);
    };
    let doc = OpenApiDocument::load(&source).await?;

    // Validate and exit if requested
    if args.validate {
        println!(
            "Spec is valid ({} paths, {} operations defined)",
            doc.paths.len(),
            doc.operations().count()
        );
        return Ok(());
    }

    let router = build_router(&doc, &config);

    info!(listen_addr = %config.listen_addr, "Starting mock server");
    server::serve(&config, router).await?;

    Ok(())
}
