//! Satchel - internal employee directory.
//!
//! # Architecture
//!
//! - Axum web framework with HTMX for interactivity
//! - Askama templates for server-side rendering
//! - Google OAuth sign-in restricted to allowed domains
//! - `PostgreSQL` storage, or an in-process roster seeded from YAML

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::process::ExitCode;
use std::sync::Arc;

use sentry::integrations::tracing as sentry_tracing;
use thiserror::Error;
use tower_sessions::MemoryStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use satchel::config::{ConfigError, SatchelConfig, StorageConfig};
use satchel::db::{
    CONNECT_ATTEMPTS, CONNECT_RETRY_DELAY, Directory, MIGRATOR, MemoryEmployeeRepository,
    PgEmployeeRepository, RepositoryError, YamlEmployeeRepository, connect_with_retry,
};
use satchel::middleware::{create_session_layer, postgres_store};
use satchel::routes;
use satchel::services::auth::{GoogleProvider, ProviderRegistry};
use satchel::state::AppState;

/// Fatal startup failures.
#[derive(Debug, Error)]
enum StartupError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("failed to load roster: {0}")]
    Repository(#[from] RepositoryError),

    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &SatchelConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = match SatchelConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            report_config_error(&e);
            return ExitCode::FAILURE;
        }
    };

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "satchel=info,tower_http=debug".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "satchel stopped");
            ExitCode::FAILURE
        }
    }
}

/// Tracing is not initialized yet when configuration fails.
#[allow(clippy::print_stderr)]
fn report_config_error(e: &ConfigError) {
    eprintln!("Failed to load configuration: {e}");
}

async fn run(config: SatchelConfig) -> Result<(), StartupError> {
    let addr = config.socket_addr();
    let base_url = config.base_url.clone();

    let mut providers = ProviderRegistry::new();
    if let Some(google) = &config.google {
        providers.register(Arc::new(GoogleProvider::new(google)));
        tracing::info!("Google sign-in enabled");
    } else {
        tracing::warn!("no identity provider configured; sign-in is unavailable");
    }

    let directory = Directory::uninitialized();
    let pg_session_store = match &config.storage {
        StorageConfig::Postgres(database) => {
            let pool = connect_with_retry(
                database.connect_options(),
                CONNECT_ATTEMPTS,
                CONNECT_RETRY_DELAY,
            )
            .await?;
            MIGRATOR.run(&pool).await?;
            tracing::info!("Database ready");

            directory.configure(Arc::new(PgEmployeeRepository::new(pool.clone())));
            Some(postgres_store(&pool).await?)
        }
        StorageConfig::Yaml { seed_file } => {
            let repo = match seed_file {
                Some(path) => YamlEmployeeRepository::from_path(path)?,
                None => YamlEmployeeRepository::bundled()?,
            };
            tracing::info!("Serving read-only YAML roster");
            directory.configure(Arc::new(repo));
            None
        }
        StorageConfig::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on restart");
            directory.configure(Arc::new(MemoryEmployeeRepository::new()));
            None
        }
    };

    let state = AppState::new(config, directory, providers);

    let app = match pg_session_store {
        Some(store) => routes::app(state, create_session_layer(store, &base_url)),
        None => routes::app(state, create_session_layer(MemoryStore::default(), &base_url)),
    }
    // Sentry layers (outermost for full request coverage)
    .layer(sentry_tower::NewSentryLayer::new_from_top())
    .layer(sentry_tower::SentryHttpLayer::new().enable_transaction());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("satchel listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
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
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
