use anyhow::Context;
use clap::Parser;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use revue_server::{AppState, Config, create_api_router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "revue_server=info,revue_core=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::parse();

    let pool = revue_core::database::connect(&config.database_url, config.max_db_connections)
        .await
        .context("failed to connect to PostgreSQL")?;

    revue_server::MIGRATOR
        .run(&pool)
        .await
        .context("failed to run database migrations")?;

    let bind_addr = config.bind_addr;
    let state = AppState::new(pool, config);

    let app = create_api_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    info!(%bind_addr, "listening");

    axum::serve(listener, app).await.context("server error")
}
