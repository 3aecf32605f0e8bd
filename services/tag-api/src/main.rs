//! PawTag Tag API
//!
//! Tag service providing the public scan surface, payment reconciliation
//! and operator inventory endpoints.
//!
//! ## REST Endpoints
//!
//! - `GET /t/{code}` - Public scan, returns an action token
//! - `GET /api/v1/profiles/{id}/public` - Redacted public profile
//! - `POST /api/v1/profiles/{id}/share-location` - Finder location share
//! - `POST /api/v1/subscriptions/confirm` - Synchronous checkout confirmation
//! - `POST /api/v1/orders/assign-code` - Claim a free code for an order
//! - `POST /webhooks/stripe` - Stripe webhook handler
//!
//! ## Operator Endpoints (bearer `ADMIN_TOKEN`)
//!
//! - `POST /admin/codes/generate` - Mint unassigned codes
//! - `GET /admin/codes` - List codes
//! - `DELETE /admin/codes` - Bulk delete unassigned codes
//!
//! ## Health Endpoints
//!
//! - `GET /health` - Liveness probe
//! - `GET /ready` - Readiness probe
//! - `GET /metrics` - Prometheus metrics

mod config;
mod error;
mod handlers;
mod state;

use std::net::SocketAddr;

use axum::extract::connect_info::IntoMakeServiceWithConnectInfo;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use pawtag_db::pg::Repositories;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::handlers::{health, ready};
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive("tag_api=debug".parse()?))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting PawTag Tag API");

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!(http_port = config.http_port, "Configuration loaded");

    // Initialize metrics
    let metrics_handle = if config.metrics_enabled {
        Some(setup_metrics()?)
    } else {
        None
    };

    // Create database pool
    let pool = pawtag_db::create_pool(&config.database_url).await?;
    tracing::info!("Database pool created");

    // Create repositories and wire the services
    let repos = Repositories::new(pool.clone());
    let state = AppState::new(repos, pool, config.clone());

    // Build HTTP router
    let app = build_router(state, metrics_handle);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    run_http_server(app, addr).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn build_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let request_timeout = state.request_timeout();

    // API v1 routes
    let api_v1 = Router::new()
        .route("/profiles/{id}/public", get(handlers::public_profile))
        .route(
            "/profiles/{id}/share-location",
            post(handlers::share_location),
        )
        .route(
            "/subscriptions/confirm",
            post(handlers::confirm_subscription),
        )
        .route("/orders/assign-code", post(handlers::assign_code));

    // Public scan route
    let scan_route = Router::new().route("/t/{code}", get(handlers::scan_tag));

    // Operator routes (token checked per handler)
    let admin_routes = Router::new()
        .route("/admin/codes/generate", post(handlers::generate_codes))
        .route(
            "/admin/codes",
            get(handlers::list_codes).delete(handlers::delete_codes),
        );

    // Webhook route (separate - uses raw body, no JSON parsing)
    let webhook_routes = Router::new().route("/webhooks/stripe", post(handlers::stripe_webhook));

    // Health routes (no timeout - must always respond quickly)
    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready));

    // Metrics route (no timeout)
    let metrics_route = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    // Build middleware stack (order matters - outermost first)
    let middleware = ServiceBuilder::new()
        // Request ID propagation (outermost)
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        // Tracing with request details
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // CORS (the scan surface is public by design)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        // Request timeout (innermost - closest to handler)
        .layer(TimeoutLayer::new(request_timeout));

    // Combine all routes
    Router::new()
        .nest("/api/v1", api_v1)
        .merge(scan_route)
        .merge(admin_routes)
        .merge(webhook_routes)
        .layer(middleware)
        .merge(health_routes) // Health routes without timeout
        .merge(metrics_route) // Metrics route without timeout
        .with_state(state)
}

async fn run_http_server(app: Router, addr: SocketAddr) -> anyhow::Result<()> {
    tracing::info!("HTTP server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    let service: IntoMakeServiceWithConnectInfo<Router, SocketAddr> =
        app.into_make_service_with_connect_info();

    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn setup_metrics() -> anyhow::Result<PrometheusHandle> {
    // Scans dominate traffic and should stay well under 100ms
    let latency_buckets = &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.2, 0.5, 1.0, 2.5];

    let builder = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("http_request_duration_seconds".to_string()),
            latency_buckets,
        )?
        .set_buckets_for_metric(
            Matcher::Full("tag_operation_duration_seconds".to_string()),
            latency_buckets,
        )?;

    let handle = builder.install_recorder()?;

    // Register metrics with descriptions
    metrics::describe_counter!("tag_scans_total", "Total tag scans by resolved action");
    metrics::describe_counter!(
        "tag_codes_assigned_total",
        "Total tag codes claimed by order kind"
    );
    metrics::describe_counter!("tag_codes_generated_total", "Total tag codes minted");
    metrics::describe_counter!(
        "tag_subscriptions_confirmed_total",
        "Total checkout confirmations"
    );
    metrics::describe_counter!(
        "tag_webhooks_processed_total",
        "Total webhooks processed by status"
    );
    metrics::describe_counter!(
        "tag_location_shares_total",
        "Total finder location shares by delivery method"
    );
    metrics::describe_histogram!(
        "http_request_duration_seconds",
        "HTTP request latency in seconds"
    );
    metrics::describe_histogram!(
        "tag_operation_duration_seconds",
        "Tag operation latency in seconds by operation type"
    );

    Ok(handle)
}

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
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
