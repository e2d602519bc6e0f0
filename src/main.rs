use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use edu_portal::{
    api,
    config::{Config, ConfigError, StorageBackend},
    external::{CompletionClient, HttpMailer, LogMailer, Mailer, OpenRouterClient},
    object_store as obj,
    storage::Database,
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; the process environment still applies
    dotenvy::dotenv().ok();

    // Initialize tracing
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());

    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    match log_format.to_lowercase().as_str() {
        "gcp" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_stackdriver::layer())
                .init();
        }
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_span_list(false),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    info!(version = env!("CARGO_PKG_VERSION"), "edu-portal starting");

    // Load configuration
    let config = Config::load()?;
    info!(test_mode = config.test_mode, "Loaded configuration");

    // Initialize database
    let db = Database::open(&config.server.data_dir)?;
    info!("Database opened at: {}", config.server.data_dir);

    // Initialize object store backend
    let object_store: Arc<dyn obj::ObjectStore> = match config.storage.backend {
        StorageBackend::Local => {
            let store = obj::LocalStore::new(&config.storage.local_storage_path)?;
            info!(
                "Using local storage backend at: {}",
                config.storage.local_storage_path
            );
            Arc::new(store)
        }
        StorageBackend::Gcs => {
            let bucket = config.storage.gcs_bucket.as_deref().ok_or_else(|| {
                ConfigError::ValidationError("GCS_BUCKET is required".to_string())
            })?;
            let store = obj::GcsStore::new(
                bucket,
                config.storage.gcs_credentials_file.as_deref(),
                Duration::from_secs(config.storage.timeout_secs),
            )
            .await?;
            info!("Using GCS storage backend, bucket: {}", bucket);
            Arc::new(store)
        }
    };

    // Outgoing mail
    let mailer: Arc<dyn Mailer> = match config.mail.api_url.as_deref() {
        Some(url) => {
            info!("Sending mail through relay at: {}", url);
            Arc::new(HttpMailer::new(url, &config.mail)?)
        }
        None => Arc::new(LogMailer),
    };

    let completions: Arc<dyn CompletionClient> = Arc::new(OpenRouterClient::new(&config.llm)?);
    if config.llm.api_key.is_none() {
        tracing::warn!("OPENROUTER_API_KEY is not set. Interview endpoints will fail.");
    }

    // Create shared state
    let bind_address = config.server.bind_address.clone();
    let state = Arc::new(AppState {
        config,
        db,
        object_store,
        mailer,
        completions,
    });

    // Build and start the HTTP server
    let app = api::create_router(Arc::clone(&state));
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!("Listening on: {}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, draining connections");
}
