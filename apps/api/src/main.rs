//! Campaign API - REST server for email campaign management
//!
//! Wires configuration, Postgres, the email provider, the campaign
//! scheduler, and the HTTP surface into one binary.

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::{HeaderValue, Method, StatusCode, header};
use axum::routing::get;
use core_config::tracing::{init_tracing, install_color_eyre};
use database::postgres::DatabaseConnection;
use domain_campaigns::{
    ApiDoc, CampaignScheduler, CampaignSender, CampaignService, LinkTracker, PgCampaignRepository,
    handlers,
};
use email::{EmailProvider, SendGridProvider, SmtpProvider};
use migration::{Migrator, MigratorTrait};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{Level, info};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod config;

use config::Config;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    install_color_eyre();

    let config = Config::from_env()?;
    init_tracing(&config.environment);

    info!("Connecting to PostgreSQL");
    let db =
        database::postgres::connect_from_config_with_retry(config.database.clone(), None).await?;

    info!("Running database migrations");
    Migrator::up(&db, None).await?;

    let provider = build_provider()?;
    let tracker = LinkTracker::new(
        config.tracking.api_base_url.as_str(),
        config.tracking.secret.as_str(),
    );

    let repository = Arc::new(PgCampaignRepository::new(db.clone()));
    let sender = Arc::new(CampaignSender::new(
        repository.clone(),
        provider,
        tracker.clone(),
        config.sending.app_base_url.as_str(),
        config.sending.max_retry_attempts as i32,
    ));
    let service = CampaignService::new(repository.clone(), sender.clone(), tracker);

    // The handle keeps the minutely sweep alive for the lifetime of main.
    let _scheduler = CampaignScheduler::new(repository, sender).start().await?;

    let mut app = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(health))
        .route("/ready", get(ready).with_state(db.clone()))
        .nest("/api/campaigns", handlers::campaigns_router(service.clone()))
        .nest("/api", handlers::subscriptions_router(service.clone()))
        .nest("/track", handlers::tracking_router(service))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(TimeoutLayer::new(Duration::from_secs(30)));

    if let Some(cors) = cors_layer()? {
        app = app.layer(cors);
    }

    let listener = tokio::net::TcpListener::bind(config.server.address()).await?;
    info!("Server starting on {}", listener.local_addr()?);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down: closing database connection");
    db.close().await?;
    info!("Campaign API shutdown complete");

    Ok(())
}

/// Liveness probe
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Readiness probe, verifies the database connection is alive
async fn ready(State(db): State<DatabaseConnection>) -> (StatusCode, Json<serde_json::Value>) {
    match database::postgres::check_health(&db).await {
        Ok(()) => (StatusCode::OK, Json(serde_json::json!({ "status": "ready" }))),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({ "status": "unavailable", "error": e.to_string() })),
        ),
    }
}

/// Pick the email provider from the environment
///
/// SendGrid wins when `SENDGRID_API_KEY` is set; otherwise falls back
/// to SMTP (`SMTP_HOST` et al).
fn build_provider() -> eyre::Result<Arc<dyn EmailProvider>> {
    if std::env::var("SENDGRID_API_KEY").is_ok() {
        let provider = SendGridProvider::from_env()?;
        info!(provider = provider.name(), "Email provider configured");
        Ok(Arc::new(provider))
    } else {
        let provider = SmtpProvider::from_env()?;
        info!(provider = provider.name(), "Email provider configured");
        Ok(Arc::new(provider))
    }
}

/// CORS from the comma-separated `CORS_ALLOWED_ORIGIN` variable; no
/// cross-origin access when unset
fn cors_layer() -> eyre::Result<Option<CorsLayer>> {
    let Ok(origins_str) = std::env::var("CORS_ALLOWED_ORIGIN") else {
        return Ok(None);
    };

    let origins: Vec<HeaderValue> = origins_str
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<HeaderValue>())
        .collect::<Result<_, _>>()
        .map_err(|e| eyre::eyre!("Invalid CORS_ALLOWED_ORIGIN value: {}", e))?;

    info!("CORS configured with allowed origins: {}", origins_str);

    Ok(Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
            .allow_credentials(true)
            .max_age(Duration::from_secs(3600)),
    ))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal, shutting down gracefully");
        },
        _ = terminate => {
            info!("Received SIGTERM signal, shutting down gracefully");
        },
    }
}
