//! Coinvote backend.
//!
//! A coin voting and listing service: users browse approved coins, cast
//! one vote per coin per day, and submit new listings; admins review
//! submissions and manage promoted slots. Live prices are merged from
//! CoinGecko with a CoinMarketCap fallback and mirrored into the
//! database, which is always the source of truth. Redis only holds
//! short-TTL JSON snapshots of derived data.
//!
//! # General Infrastructure
//! - One axum process, stateless apart from its connections
//! - Postgres (or SQLite in dev) holds coins, votes, promotions, trending
//! - Redis is an optional read-through cache; losing it degrades latency,
//!   never correctness
//! - Background tokio tasks refresh prices, recompute trending, and
//!   rebuild/submit the sitemap
use std::time::Duration;

use axum::{
    Router,
    http::{Method, header::CONTENT_TYPE},
    routing::{delete, get, patch, post},
};

use signal::{
    ctrl_c,
    unix::{SignalKind, signal},
};
use tokio::{net::TcpListener, signal};
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod jobs;
pub mod prices;
pub mod routes;
pub mod seo;
pub mod state;
pub mod utils;

use routes::{admin, coins, listings, votes};
use state::AppState;

pub fn router(state: std::sync::Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/api/coins", get(coins::list_coins))
        .route("/api/coins/{slug}", get(coins::get_coin))
        .route("/api/coins/{slug}/votes", post(votes::cast_vote))
        .route("/api/trending", get(coins::list_trending))
        .route("/api/promoted", get(coins::list_promoted))
        .route("/api/listings", post(listings::submit_listing))
        .route("/api/admin/listings", get(admin::list_pending))
        .route("/api/admin/coins/{slug}/approve", post(admin::approve_coin))
        .route(
            "/api/admin/coins/{slug}",
            patch(admin::update_coin).delete(admin::delete_coin),
        )
        .route("/api/admin/coins/{slug}/promote", post(admin::promote_coin))
        .route("/api/admin/promoted/{id}", delete(admin::end_promotion))
        .route("/sitemap.xml", get(seo::sitemap_handler))
        .route("/robots.txt", get(seo::robots_handler))
        .layer(cors)
        .with_state(state)
}

pub async fn start_server() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Initializing state...");
    let state = AppState::new().await;

    info!("Starting background jobs...");
    jobs::spawn(state.clone());

    info!("Starting server...");
    let app = router(state.clone());

    let address = format!("0.0.0.0:{}", state.config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address).await.unwrap();
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();

    println!("Server shutting down...");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        ctrl_c().await.expect("Failed to install Ctrl+C handler");

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        signal(SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;

        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
