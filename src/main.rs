//! Libris Server - Library Borrowing Management Service
//!
//! REST API server tracking books, borrowings and payments, with admin
//! notifications dispatched in the background.

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use libris_server::{
    api,
    config::AppConfig,
    repository::Repository,
    services::{
        notifications::NotificationQueue,
        stripe::{CheckoutGateway, StripeGateway},
        telegram::TelegramTransport,
        Services,
    },
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().expect("Failed to load configuration");

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("libris_server={},tower_http=debug", config.logging.level).into());

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Libris Server v{}", env!("CARGO_PKG_VERSION"));

    // Create database connection pool
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect(&config.database.url)
        .await
        .expect("Failed to connect to database");

    tracing::info!("Connected to database");

    // Run migrations
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run database migrations");

    tracing::info!("Database migrations completed");

    // Payment processor client; the API key comes from configuration and
    // is injected here, never read from a global.
    if config.stripe.secret_key.is_empty() {
        tracing::warn!("Stripe secret key is not set; checkout session creation will fail");
    }
    let gateway: Arc<dyn CheckoutGateway> = Arc::new(StripeGateway::new(config.stripe.clone())?);

    // Notification queue: disabled cleanly when no transport is configured
    let queue = if config.telegram.bot_token.is_empty() || config.telegram.admin_chat_ids.is_empty()
    {
        tracing::warn!("Telegram transport not configured; admin notifications disabled");
        NotificationQueue::disabled()
    } else {
        let transport = TelegramTransport::new(config.telegram.clone())?;
        NotificationQueue::start(
            Arc::new(transport),
            config.notifications.max_send_attempts,
        )
    };

    // Save server address before moving config
    let server_host = config.server.host.clone();
    let server_port = config.server.port;

    // Create repository and services
    let repository = Repository::new(pool);
    let services = Services::new(repository, config.auth.clone(), gateway, queue);

    // Create application state
    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    };

    // Periodic notification jobs
    spawn_periodic_jobs(&state);

    // Build router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(
        server_host.parse().expect("Invalid host address"),
        server_port,
    );

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // API v1 routes
    let api_v1 = Router::new()
        // Health check
        .route("/health", get(api::health::health_check))
        .route("/ready", get(api::health::readiness_check))
        // Authentication
        .route("/auth/register", post(api::auth::register))
        .route("/auth/login", post(api::auth::login))
        .route("/auth/me", get(api::auth::me))
        // Books (catalog)
        .route("/books", get(api::books::list_books))
        .route("/books", post(api::books::create_book))
        .route("/books/:id", get(api::books::get_book))
        .route("/books/:id", put(api::books::update_book))
        .route("/books/:id", delete(api::books::delete_book))
        // Borrowings
        .route("/borrowings", get(api::borrowings::list_borrowings))
        .route("/borrowings", post(api::borrowings::create_borrowing))
        .route("/borrowings/:id", get(api::borrowings::get_borrowing))
        .route("/borrowings/:id/return", post(api::borrowings::return_borrowing))
        // Payments
        .route("/payments", get(api::payments::list_payments))
        .route("/payments/success", get(api::payments::payment_success))
        .route("/payments/cancel", get(api::payments::payment_cancel))
        .with_state(state.clone());

    // OpenAPI documentation
    let openapi = api::openapi::create_openapi_router();

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Spawn the overdue sweep and daily summary tickers
fn spawn_periodic_jobs(state: &AppState) {
    let sweep_hours = state.config.notifications.overdue_check_hours.max(1);
    let notifications = state.services.notifications.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(sweep_hours * 3600));
        // Skip the immediate first tick
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if let Err(e) = notifications.run_overdue_sweep().await {
                tracing::error!("Overdue sweep failed: {}", e);
            }
        }
    });

    let summary_hours = state.config.notifications.summary_interval_hours.max(1);
    let notifications = state.services.notifications.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(summary_hours * 3600));
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if let Err(e) = notifications.run_daily_summary().await {
                tracing::error!("Daily summary failed: {}", e);
            }
        }
    });
}
