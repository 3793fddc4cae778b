use std::sync::Arc;

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use tracing::info;
use tracing_subscriber::EnvFilter;

use browserless_client::BrowserlessClient;
use gemini_client::Gemini;
use pagelens_common::Config;
use pagelens_engine::{InsightResponder, PageFill};
use pagelens_scraper::{PageScraper, SessionOptions};
use pagelens_store::PageStore;

mod rest;

pub struct AppState {
    pub store: PageStore,
    pub fill: PageFill<PageStore, PageScraper>,
    pub insight: InsightResponder,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("pagelens=info".parse()?))
        .init();

    let config = Config::from_env();

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;
    let store = PageStore::new(pool);
    store.migrate().await?;

    let client = BrowserlessClient::new(
        &config.browserless_url,
        config.browserless_token.as_deref(),
    );
    let scraper = PageScraper::new(
        client,
        SessionOptions {
            email: config.source_email.clone(),
            password: config.source_password.clone(),
            cookie_file: config.cookie_file.clone(),
        },
    );
    // Session warm-up is best-effort: a dead browser degrades fetches, it
    // does not block serving cached data.
    scraper.init().await;

    let gemini = config
        .gemini_api_key
        .as_deref()
        .map(|key| Gemini::new(key, gemini_client::DEFAULT_MODEL));
    if gemini.is_none() {
        info!("GEMINI_API_KEY not set, insight endpoint answers with the deterministic fallback");
    }

    let state = Arc::new(AppState {
        store: store.clone(),
        fill: PageFill::new(store, scraper),
        insight: InsightResponder::new(gemini),
    });

    let app = Router::new()
        // Health check
        .route("/", get(|| async { "ok" }))
        // REST API
        .route("/api/v1/pages", get(rest::api_list_pages))
        .route("/api/v1/pages/search", get(rest::api_search_pages))
        .route("/api/v1/pages/{handle}", get(rest::api_get_page))
        .route("/api/v1/pages/{handle}/posts", get(rest::api_page_posts))
        .route("/api/v1/posts/{id}", get(rest::api_post_detail))
        .route("/api/v1/posts/{id}/comments", get(rest::api_post_comments))
        .route("/api/v1/chat", post(rest::chat::api_chat))
        .with_state(state)
        // CORS
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        // Logging layer: method + path + status + latency only
        .layer(
            tower_http::trace::TraceLayer::new_for_http().make_span_with(
                |request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                },
            ),
        );

    let addr = format!("{}:{}", config.api_host, config.api_port);
    info!("pagelens API starting on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
