//! Main entry point for CLI command to start the upload router.

use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::Router;
use bytes::Bytes;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::configuration::Configuration;
use crate::file_uploads::FileUploadLayer;

/// Options for the upload router
#[derive(Parser, Debug)]
#[command(name = "upload-router", about = "GraphQL multipart upload router")]
pub(crate) struct Opt {
    /// Log level (off|error|warn|info|debug|trace).
    #[arg(
        long = "log",
        default_value = "info",
        alias = "log-level",
        env = "UPLOAD_ROUTER_LOG"
    )]
    log_level: String,

    /// Configuration location relative to the project directory.
    #[arg(short, long = "config", env = "UPLOAD_ROUTER_CONFIG_PATH")]
    config_path: Option<PathBuf>,

    /// Prints the configuration schema.
    #[arg(long)]
    schema: bool,
}

/// This is the main upload router entrypoint.
pub fn main() -> Result<()> {
    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all();
    if let Some(nb) = std::env::var("UPLOAD_ROUTER_NUM_CORES")
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
    {
        builder.worker_threads(nb);
    }
    let runtime = builder.build()?;
    runtime.block_on(start(Opt::parse()))
}

async fn start(opt: Opt) -> Result<()> {
    if opt.schema {
        let schema = Configuration::schema();
        println!("{}", serde_json::to_string_pretty(&schema)?);
        return Ok(());
    }

    let builder = tracing_subscriber::fmt::fmt().with_env_filter(
        EnvFilter::try_new(&opt.log_level).context("could not parse log configuration")?,
    );
    if std::io::stdout().is_terminal() {
        builder.try_init()
    } else {
        builder.json().try_init()
    }
    .map_err(|err| anyhow::anyhow!(err))
    .context("could not set up logging")?;

    let configuration = match &opt.config_path {
        Some(path) => {
            let path = if path.is_relative() {
                std::env::current_dir()?.join(path)
            } else {
                path.clone()
            };
            Configuration::load(&path)
                .with_context(|| format!("could not load configuration from {}", path.display()))?
        }
        None => Configuration::default(),
    };

    let listen = configuration.server.listen;
    let app = router(configuration);
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .with_context(|| format!("could not listen on {listen}"))?;
    tracing::info!(
        "Upload router v{} listening on http://{}",
        std::env!("CARGO_PKG_VERSION"),
        listener.local_addr()?
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("stopped");
    Ok(())
}

/// Mounts the GraphQL endpoint behind the upload layer.
pub(crate) fn router(configuration: Configuration) -> Router {
    Router::new()
        .route(&configuration.server.path, post(handle_graphql))
        .layer(FileUploadLayer::new(configuration.file_uploads))
}

// Stands in for the GraphQL execution engine: answers with the request it would execute.
async fn handle_graphql(body: Bytes) -> impl IntoResponse {
    tracing::trace!(body = %String::from_utf8_lossy(&body), "graphql request");
    ([(CONTENT_TYPE, "application/json")], body)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(%err, "could not listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
