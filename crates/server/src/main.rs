use iou_api::service;
use iou_server::{AppConfig, AppState, build_router, storage};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine; real environment variables win.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "iou_server=info,tower_http=info".into()),
        )
        .init();

    let config = AppConfig::from_env()?;
    tracing::info!("data directory: {}", config.data_dir.display());

    let db = storage::init_db(&config.data_dir)?;
    tracing::info!("database initialized");

    let now = service::format_timestamp(iou_server::routes::now_unix())?;
    let pruned = storage::prune_expired_tokens(&db, &now)?;
    if pruned > 0 {
        tracing::info!("pruned {pruned} expired refresh tokens");
    }

    let port = config.port;
    let base_url = config.base_url.clone();
    let app = build_router(AppState { db, config });

    tracing::info!("starting server at {base_url}");

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await?;

    Ok(())
}
