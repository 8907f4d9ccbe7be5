//! Order service entry point.

use std::process::ExitCode;
use std::sync::Arc;

use api::config::Config;
use saga::OrchestratorConfig;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::from_env();

    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Install Prometheus metrics recorder
    let metrics_handle = match metrics_exporter_prometheus::PrometheusBuilder::new().install_recorder() {
        Ok(handle) => handle,
        Err(e) => {
            tracing::error!(error = %e, "failed to install Prometheus recorder");
            return ExitCode::FAILURE;
        }
    };

    // 3. Connect store, channel and gateways; retries until they are up
    let infra = match api::bootstrap::connect(&config).await {
        Ok(infra) => infra,
        Err(e) => {
            tracing::error!(error = %e, "bootstrap failed");
            return ExitCode::FAILURE;
        }
    };

    let state = Arc::new(api::AppState::new(
        &infra,
        OrchestratorConfig {
            lookup_timeout: config.lookup_timeout,
            ..OrchestratorConfig::default()
        },
    ));

    // 4. Start read-model subscriptions
    let shutdown = CancellationToken::new();
    let subscriptions = api::spawn_projections(
        &state,
        infra.channel.clone(),
        &config.kafka_consumer_group,
        shutdown.clone(),
    );

    // 5. Build the application
    let app = api::create_app(state, metrics_handle);

    // 6. Start server
    let addr = config.addr();
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, %addr, "failed to bind address");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(%addr, "starting order service");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    // 7. Stop subscribers once the server has drained
    shutdown.cancel();
    for subscription in subscriptions {
        let _ = subscription.await;
    }

    match served {
        Ok(()) => {
            tracing::info!("server shut down gracefully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "server error");
            ExitCode::FAILURE
        }
    }
}
