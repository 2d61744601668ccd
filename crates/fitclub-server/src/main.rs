use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use fitclub_api::documents::LocalDocumentStore;
use fitclub_api::{AppState, AppStateInner};

mod config;

use config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fitclub=debug,tower_http=debug".into()),
        )
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };
    if !config.api.admin_emails.is_empty() {
        info!("{} admin email(s) configured", config.api.admin_emails.len());
    }

    let db = fitclub_db::Database::open(&config.db_path)?;
    let documents = LocalDocumentStore::new(config.document_dir.clone(), config.public_url.clone()).await?;

    let state: AppState = Arc::new(AppStateInner {
        db,
        documents: Arc::new(documents),
        config: config.api.clone(),
    });

    let app = fitclub_api::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = config.addr()?;
    info!("FitClub server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
