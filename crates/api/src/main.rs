use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderName, Method, StatusCode};
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use habita_core::channel::Channel;
use habita_notify::delivery::{
    EmailConfig, EmailSender, GatewayConfig, HttpGatewaySender, InAppSender,
};
use habita_notify::dispatch::Dispatcher;
use habita_notify::pg::{PgNotificationStore, PgPreferenceStore};
use habita_notify::NotificationEngine;

use habita_api::config::ServerConfig;
use habita_api::{routes, state};

use state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "habita_api=debug,habita_notify=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = habita_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    habita_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    habita_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- CORS ---
    let cors = build_cors_layer(&config);

    // --- Notification engine ---
    let mut engine = NotificationEngine::new(
        Arc::new(PgNotificationStore::new(pool.clone())),
        Arc::new(PgPreferenceStore::new(pool.clone())),
    )
    .with_sender(Arc::new(InAppSender));

    match EmailConfig::from_env() {
        Some(email_config) => {
            let sender = EmailSender::new(email_config).expect("Failed to build SMTP transport");
            engine = engine.with_sender(Arc::new(sender));
            tracing::info!("Email channel configured");
        }
        None => tracing::warn!("SMTP_HOST not set, email channel disabled"),
    }

    for (channel, prefix) in [
        (Channel::Sms, "SMS"),
        (Channel::Whatsapp, "WHATSAPP"),
        (Channel::Push, "PUSH"),
    ] {
        match GatewayConfig::from_env(prefix) {
            Some(gateway) => {
                engine = engine.with_sender(Arc::new(HttpGatewaySender::new(channel, gateway)));
                tracing::info!(channel = channel.as_str(), "Gateway channel configured");
            }
            None => tracing::warn!(
                channel = channel.as_str(),
                "Gateway URL not set, channel disabled"
            ),
        }
    }

    let engine = Arc::new(engine);

    // --- Dispatcher ---
    let dispatch_cancel = tokio_util::sync::CancellationToken::new();
    let dispatcher = Dispatcher::new(Arc::clone(&engine));
    let dispatch_cancel_clone = dispatch_cancel.clone();
    let dispatch_handle = tokio::spawn(async move {
        dispatcher.run(dispatch_cancel_clone).await;
    });
    tracing::info!("Dispatcher started");

    // --- App state ---
    let state = AppState {
        engine: Arc::clone(&engine),
        config: Arc::new(config.clone()),
        pool: Some(pool),
    };

    // --- Request ID header name ---
    let request_id_header = HeaderName::from_static("x-request-id");

    // --- Router ---
    let app = Router::new()
        // Health check at root level (not under /api/v1).
        .merge(routes::health::router())
        // API v1 routes.
        .nest("/api/v1", routes::api_routes())
        // -- Middleware stack (applied bottom-up) --
        // Panic recovery: catch panics and return 500 JSON.
        .layer(CatchPanicLayer::new())
        // Request timeout.
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(config.request_timeout_secs),
        ))
        // Propagate request ID to response.
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        // Structured request/response tracing.
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Set request ID on incoming requests.
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        // CORS.
        .layer(cors)
        // Shared state.
        .with_state(state);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    dispatch_cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(5), dispatch_handle).await;
    tracing::info!("Dispatcher stopped");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server shuts
/// down cleanly whether stopped interactively or by a process manager.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}

/// Build the CORS middleware layer from server configuration.
///
/// Panics at startup if any configured origin is invalid; misconfiguration
/// should fail fast.
fn build_cors_layer(config: &ServerConfig) -> CorsLayer {
    let origins: Vec<_> = config
        .cors_origins
        .iter()
        .map(|o| {
            o.parse()
                .unwrap_or_else(|e| panic!("Invalid CORS origin '{o}': {e}"))
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600))
}
