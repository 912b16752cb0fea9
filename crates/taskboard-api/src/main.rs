//! taskboard binary.

use anyhow::Context;
use clap::{CommandFactory, Parser};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use taskboard_api::cli::{Cli, Command, ServeArgs};
use taskboard_api::error::hide_internal_detail;
use taskboard_api::{create_router, metrics, AppConfig, AppState};
use taskboard_queue::QueueInspector;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // rustls 0.23 needs a process-wide crypto provider for rediss:// connections
    let _ = rustls::crypto::ring::default_provider().install_default();

    init_tracing();

    let cli = Cli::parse();
    let result = match cli.command {
        Some(Command::Serve(args)) => serve(args).await,
        None => Cli::command().print_help().map_err(Into::into),
    };

    if let Err(e) = result {
        error!("{e:#}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("taskboard=info"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}

async fn serve(args: ServeArgs) -> anyhow::Result<()> {
    info!("Starting taskboard");

    let mut config = AppConfig::load(args.config.as_deref())?;
    if let Some(port) = args.port {
        config.api.port = port;
    }
    hide_internal_detail(config.api.is_production());
    info!(
        host = %config.api.host,
        port = config.api.port,
        namespace = %config.queue.prefix,
        "Loaded configuration"
    );

    let redis = config.redis.to_options()?;
    let inspector = QueueInspector::connect(&redis, config.queue.to_inspector_config())
        .await
        .context("Failed to start queue inspector")?;

    let metrics_handle = if config.api.metrics_enabled {
        info!("Prometheus metrics enabled at /metrics");
        Some(metrics::init_metrics()?)
    } else {
        None
    };

    let app = create_router(AppState::new(config.api.clone(), inspector), metrics_handle);

    let listener = tokio::net::TcpListener::bind((config.api.host.as_str(), config.api.port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", config.api.host, config.api.port))?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal");
}
