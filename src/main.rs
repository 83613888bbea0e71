use std::sync::Arc;

use devjournal_api::{app, Settings};
use tokio::net::TcpListener;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Invalid configuration must stop the process before anything is served.
    let settings = Arc::new(Settings::from_env()?);

    init_tracing(&settings);

    tracing::info!(
        env = %settings.app_env,
        debug = settings.debug,
        "Starting {}",
        settings.app_name
    );
    if settings.is_production() && settings.debug {
        tracing::warn!("DEBUG is enabled in production");
    }

    let app = app::build_router(Arc::clone(&settings))?;

    let addr = settings.bind_addr();
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);
    tracing::info!("Swagger UI at http://{}/docs/", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// `RUST_LOG` wins; otherwise `LOG_LEVEL`, plus HTTP request logs in debug mode.
fn init_tracing(settings: &Settings) {
    let mut directives = settings.log_filter();
    if settings.debug {
        directives.push_str(",tower_http=debug");
    }

    let (filter, rejected) = match EnvFilter::try_from_default_env() {
        Ok(filter) => (filter, None),
        Err(_) => match EnvFilter::try_new(&directives) {
            Ok(filter) => (filter, None),
            Err(err) => (EnvFilter::new("info"), Some(err)),
        },
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Some(err) = rejected {
        tracing::warn!(
            "Invalid LOG_LEVEL {:?} ({}), falling back to info",
            settings.log_level,
            err
        );
    }
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
