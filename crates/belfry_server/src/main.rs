//! BELFRY Server
//!
//! HTTP API server for sandboxed function execution.

#![warn(missing_docs)]
#![warn(clippy::all)]

use anyhow::Result;
use belfry_bridge::HttpFetcher;
use belfry_invoker::{Invoker, InvokerConfig};
use belfry_sandbox::IsolateFactory;
use belfry_server::{build_router, AppState};
use belfry_store::FsArtifactStore;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "belfry-server")]
#[command(about = "BELFRY function-execution server", long_about = None)]
struct Args {
    /// Bind address
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    bind: String,

    /// Root directory of the bundle store
    #[arg(long, default_value = ".belfry/bundles")]
    bundle_root: String,

    /// Overall invocation timeout in milliseconds
    #[arg(long, default_value_t = 30_000)]
    timeout_ms: u64,

    /// Sandbox heap ceiling in MiB
    #[arg(long, default_value_t = 128)]
    memory_ceiling_mib: u64,

    /// Mirror guest console output into server logs
    #[arg(long)]
    dev: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter("belfry=debug,tower_http=debug")
        .init();

    let config = InvokerConfig::new()
        .with_timeout(Duration::from_millis(args.timeout_ms))
        .with_memory_ceiling_bytes(args.memory_ceiling_mib * 1024 * 1024)
        .with_dev_mirror_logs(args.dev);

    let invoker = Invoker::new(
        Arc::new(IsolateFactory::new()),
        Arc::new(FsArtifactStore::new(&args.bundle_root)),
        Arc::new(HttpFetcher::new()?),
        config,
    );

    let app = build_router(AppState {
        invoker: Arc::new(invoker),
    });

    tracing::info!(bind = %args.bind, bundle_root = %args.bundle_root, "belfry server starting");
    let listener = tokio::net::TcpListener::bind(&args.bind).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
