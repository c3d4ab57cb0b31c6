use axum::{
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

mod config;
mod db;
mod dto;
mod error;
mod handlers;
mod models;
mod services;

use config::Config;
use services::ai::TextGenerator;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<Config>,
    pub text_generator: Arc<TextGenerator>,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sleepcoach_api=debug,tower_http=debug".into()),
        )
        .json()
        .init();

    let config = Config::from_env();
    let config = Arc::new(config);

    // Database
    let db = db::create_pool(&config.database_url).await;

    // Run migrations
    sqlx::migrate!("./migrations")
        .run(&db)
        .await
        .expect("Failed to run database migrations");

    tracing::info!("Database migrations applied");

    // Text-generation client, constructed once and shared via state.
    let text_generator = Arc::new(TextGenerator::new(&config));
    if !text_generator.is_configured() {
        tracing::warn!("GROQ_API_KEY not set; reports will use the deterministic fallback");
    }

    let state = AppState {
        db,
        config: config.clone(),
        text_generator,
    };

    let api_routes = Router::new()
        // Users
        .route("/api/users", post(handlers::users::create_user))
        .route("/api/users/:email", get(handlers::users::get_user))
        // Sleep profiles (onboarding)
        .route(
            "/api/sleep-profiles",
            post(handlers::profiles::create_profile),
        )
        .route(
            "/api/sleep-profiles/:user_id",
            get(handlers::profiles::get_profile),
        )
        // Check-ins
        .route("/api/checkins", post(handlers::checkins::submit_checkin))
        .route(
            "/api/checkins/:user_id",
            get(handlers::checkins::list_checkins),
        )
        .route(
            "/api/checkins/:user_id/summary",
            get(handlers::checkins::get_weekly_summary),
        )
        // Dashboard view model
        .route(
            "/api/dashboard/:user_id",
            get(handlers::dashboard::get_dashboard),
        )
        // Weekly reports
        .route(
            "/api/reports/:user_id/weekly",
            get(handlers::reports::get_weekly_report),
        )
        .route(
            "/api/reports/:user_id/by-date",
            get(handlers::reports::get_report_by_date),
        )
        // Feedback
        .route("/api/feedback", post(handlers::feedback::submit_feedback));

    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/readyz", get(handlers::health::readyz));

    let allowed_origins: Vec<axum::http::HeaderValue> = {
        let mut origins = vec![config
            .frontend_url
            .parse::<axum::http::HeaderValue>()
            .unwrap()];
        // In dev, also allow LAN access (e.g. testing from another device)
        if let Ok(extra) = std::env::var("CORS_EXTRA_ORIGINS") {
            for o in extra.split(',') {
                if let Ok(hv) = o.trim().parse::<axum::http::HeaderValue>() {
                    origins.push(hv);
                }
            }
        }
        origins
    };
    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::ACCEPT,
        ]);

    let app = Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = config.listen_addr();
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
