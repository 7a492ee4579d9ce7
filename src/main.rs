//! EV Rental Server
//!
//! REST API server for the electric vehicle rental platform.

use anyhow::Context;
use axum::{
    routing::{get, post, put},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use evrental_server::{
    api,
    config::{AppConfig, LoggingConfig},
    repository::Repository,
    services::{email::EmailService, redis::RedisService, Services},
    AppState,
};

/// Console output in the configured format, plus an optional JSON file with daily rotation.
/// The returned guard must be kept alive to flush the file writer.
fn init_logging(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "evrental_server={},tower_http=debug,sqlx::query=warn",
            config.level
        ))
    });

    let stdout_layer = match config.format.as_str() {
        "json" => fmt::layer().json().boxed(),
        _ => fmt::layer().boxed(),
    };

    let (file_layer, guard) = match config.directory.as_deref() {
        Some(directory) => {
            let (writer, guard) = tracing_appender::non_blocking(rolling::daily(directory, "evrental.log"));
            let layer = fmt::layer().with_writer(writer).with_ansi(false).json();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    guard
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;

    let _log_guard = init_logging(&config.logging);

    tracing::info!("Starting EV Rental Server v{}", env!("CARGO_PKG_VERSION"));

    // Create database connection pool
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect(&config.database.url)
        .await
        .context("Failed to connect to database")?;

    tracing::info!("Connected to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;

    tracing::info!("Database migrations completed");

    let redis_service = RedisService::new(&config.redis.url)
        .await
        .context("Failed to connect to Redis")?;

    tracing::info!("Connected to Redis");

    let addr = SocketAddr::new(
        config.server.host.parse().context("Invalid host address")?,
        config.server.port,
    );

    // Create repository and services
    let repository = Repository::new(pool.clone());
    let mailer = Arc::new(EmailService::new(config.email.clone()));
    let services = Services::new(repository, config.auth.clone(), mailer, redis_service);

    let state = AppState {
        config: Arc::new(config),
        pool,
        services: Arc::new(services),
    };

    let app = create_router(state);

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes
fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Health check
        .route("/health", get(api::health::health_check))
        .route("/ready", get(api::health::readiness_check))
        // Authentication
        .route("/Authen/register", post(api::auth::register))
        .route("/Authen/login", post(api::auth::login))
        .route("/Authen/verify-otp", post(api::auth::verify_otp))
        .route("/Authen/verify-email", get(api::auth::verify_email))
        .route("/Authen/resend-verification", post(api::auth::resend_verification))
        .route("/Authen/me", get(api::auth::me))
        // Users
        .route("/user", get(api::users::list_users))
        .route(
            "/user/:id",
            get(api::users::get_user)
                .put(api::users::update_user)
                .delete(api::users::delete_user),
        )
        .route("/user/:id/role", put(api::users::update_role))
        // Stations
        .route(
            "/station",
            get(api::stations::list_stations).post(api::stations::create_station),
        )
        .route(
            "/station/:id",
            get(api::stations::get_station)
                .put(api::stations::update_station)
                .delete(api::stations::delete_station),
        )
        // Vehicles
        .route(
            "/vehicle",
            get(api::vehicles::list_vehicles).post(api::vehicles::create_vehicle),
        )
        .route(
            "/vehicle/:id",
            get(api::vehicles::get_vehicle)
                .put(api::vehicles::update_vehicle)
                .delete(api::vehicles::delete_vehicle),
        )
        .route("/vehicle/:id/status", put(api::vehicles::update_vehicle_status))
        .route("/vehicle/:id/feedback", get(api::vehicles::list_vehicle_feedback))
        // Rentals
        .route(
            "/rental",
            get(api::rentals::list_rentals).post(api::rentals::create_rental),
        )
        .route("/rental/:id", get(api::rentals::get_rental))
        .route("/rental/:id/checkin", post(api::rentals::check_in))
        .route("/rental/:id/checkout", post(api::rentals::check_out))
        .route("/rental/:id/cancel", post(api::rentals::cancel_rental))
        .route("/rental/:id/early-return", post(api::rentals::request_early_return))
        .route("/rental/:id/payments", get(api::rentals::list_payments))
        .route("/rental/:id/deposit", get(api::rentals::get_deposit))
        .route("/rental/:id/deposit/refund", post(api::rentals::refund_deposit))
        .route("/rental/:id/contract", post(api::contracts::create_contract))
        // Rental penalties
        .route(
            "/rental/:id/penalties",
            get(api::penalties::list_rental_penalties).post(api::penalties::create_rental_penalty),
        )
        .route(
            "/rental/penalties/:id",
            get(api::penalties::get_rental_penalty)
                .put(api::penalties::update_rental_penalty)
                .delete(api::penalties::delete_rental_penalty),
        )
        .route("/rental/penalties/:id/settle", post(api::penalties::settle_rental_penalty))
        // Penalty catalog
        .route(
            "/penalty",
            get(api::penalties::list_catalog).post(api::penalties::create_catalog),
        )
        .route(
            "/penalty/:id",
            put(api::penalties::update_catalog).delete(api::penalties::delete_catalog),
        )
        // Payments
        .route("/payment", post(api::payments::create_payment))
        // Contracts
        .route("/contract/:id", get(api::contracts::get_contract))
        .route("/contract/:id/sign", post(api::contracts::sign_contract))
        // Feedback
        .route("/feedback", post(api::feedback::create_feedback))
        .with_state(state);

    // OpenAPI documentation
    let openapi = api::openapi::create_openapi_router();

    Router::new()
        .nest("/api", api_routes)
        .merge(openapi)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
