use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use dotenv::dotenv;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tracing::{error, info};

use checkout_backend::api::{orders, payments, webhooks};
use checkout_backend::config::AppConfig;
use checkout_backend::database::{init_pool_from_config, PgPaymentStore};
use checkout_backend::health::{HealthChecker, HealthStatus};
use checkout_backend::logging::init_tracing;
use checkout_backend::middleware::logging::{request_logging_middleware, UuidRequestId};
use checkout_backend::payments::paypal::{PaypalConfig, PaypalGateway};
use checkout_backend::services::Reconciler;

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    init_tracing();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
        "🚀 Starting checkout backend service"
    );

    let config = AppConfig::from_env()?;
    config.validate()?;

    info!(
        host = %config.server.host,
        port = config.server.port,
        "Server configuration loaded"
    );

    info!("📊 Initializing database connection pool...");
    let db_pool = init_pool_from_config(&config.database).await.map_err(|e| {
        error!("Failed to initialize database pool: {}", e);
        e
    })?;

    let paypal_config = PaypalConfig::from_env()?;
    let gateway = Arc::new(PaypalGateway::new(paypal_config)?);
    info!("✅ PayPal gateway configured");

    let store = Arc::new(PgPaymentStore::new(db_pool.clone()));
    let reconciler = Arc::new(Reconciler::new(store.clone()));
    let health_checker = HealthChecker::new(db_pool.clone());

    let orders_routes = Router::new()
        .route("/api/orders", post(orders::create_order))
        .with_state(orders::OrdersState {
            provider: gateway,
            store: store.clone(),
        });

    let payments_routes = Router::new()
        .route("/api/payments/{order_id}", get(payments::get_payment_by_order))
        .route(
            "/api/captures/{capture_id}",
            get(payments::get_payment_by_capture),
        )
        .with_state(payments::PaymentsState { store });

    let webhook_routes = Router::new()
        .route("/webhooks/paypal", post(webhooks::handle_paypal_webhook))
        .with_state(Arc::new(webhooks::WebhookState {
            reconciler,
            store_timeout: Duration::from_secs(config.database.store_timeout_secs),
        }));

    let app = Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/health/live", get(liveness))
        .merge(orders_routes)
        .merge(payments_routes)
        .merge(webhook_routes)
        .with_state(health_checker)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
                .layer(axum::middleware::from_fn(request_logging_middleware))
                .layer(PropagateRequestIdLayer::x_request_id()),
        );

    info!("✅ Routes configured");

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
        error!("❌ Failed to bind to address {}: {}", addr, e);
        e
    })?;

    info!(address = %addr, "🚀 Server listening on http://{}", addr);
    info!("✅ Server is ready to accept connections");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("👋 Server shutdown complete");

    Ok(())
}

// Handlers
async fn root() -> &'static str {
    "Checkout backend API"
}

async fn health(
    State(checker): State<HealthChecker>,
) -> Result<Json<HealthStatus>, (StatusCode, String)> {
    let health_status = checker.check_health().await;

    if health_status.is_healthy() {
        Ok(Json(health_status))
    } else {
        error!("❌ Health check failed - service unhealthy");
        Err((
            StatusCode::SERVICE_UNAVAILABLE,
            "Service Unavailable".to_string(),
        ))
    }
}

/// Liveness probe - checks if the service is alive (basic check)
async fn liveness() -> &'static str {
    "OK"
}
