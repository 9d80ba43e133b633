use std::sync::Arc;

use anyhow::Context;
use jemallocator::Jemalloc;
use log::{error, info};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use quotes::{
    api,
    config::StoreBackend,
    logging::init_logging,
    MemoryStore, PostgresClient, QuoteService, QuoteStore, Settings, TokenRegistry,
};

#[tokio::main()]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let settings = Settings::new()
        .context("Failed to load config.yaml. Please ensure it exists and is valid")?;

    init_logging(&settings.logging)?;

    let service = Arc::new(build_service(&settings).await?);

    if settings.store.create_database {
        service
            .create_database()
            .await
            .context("Failed to create database")?;
    }

    let listener = TcpListener::bind(&settings.server.bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", settings.server.bind_address))?;

    let cancellation_token = CancellationToken::new();

    let server_token = cancellation_token.child_token();
    let server_handle = tokio::spawn(async move {
        if let Err(e) = api::serve(listener, service, server_token).await {
            error!("API server failed: {:#}", e);
        }
    });

    #[cfg(unix)]
    let mut sigterm_stream = {
        use tokio::signal::unix::{signal, SignalKind};
        signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?
    };

    info!("Quote service running. Press Ctrl+C to stop.");

    #[cfg(unix)]
    {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal (Ctrl+C), exiting gracefully...");
            },
            _ = sigterm_stream.recv() => {
                info!("Received SIGTERM, exiting gracefully...");
            },
        };
    }

    #[cfg(not(unix))]
    {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal (Ctrl+C), exiting gracefully...");
            },
        };
    }

    cancellation_token.cancel();

    info!("Waiting for API server to stop...");
    let _ = server_handle.await;

    info!("Shutdown complete");
    Ok(())
}

async fn build_service(settings: &Settings) -> anyhow::Result<QuoteService> {
    let store: Arc<dyn QuoteStore> = match settings.store.backend {
        StoreBackend::Postgres => {
            let pg = settings
                .postgres
                .as_ref()
                .context("`postgres` section is required for the postgres store backend")?;
            Arc::new(
                PostgresClient::new(pg.clone())
                    .await
                    .context("Failed to initialize database connection")?,
            )
        },
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
    };

    info!("Using {} quote store", store.backend_type());

    let registry = TokenRegistry::from_settings(&settings.tokens);
    info!("Loaded {} tokens from config", registry.tokens().len());

    Ok(QuoteService::new(store, registry))
}
