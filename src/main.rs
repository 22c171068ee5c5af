use dtassess::agents::ContentEngine;
use dtassess::config::{AiSettings, Config};
use dtassess::db::{self, Entity, MemoryStore, Persistence, PgStore};
use dtassess::{routes, state, storage};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

async fn open_store(config: &Config) -> Result<Arc<dyn Persistence>, BoxError> {
    match config.database_url.as_deref() {
        Some(url) if !config.use_memory_store() => {
            let pool = db::create_pool(url).await?;
            db::run_migrations(pool.as_ref()).await?;
            tracing::info!("Using Postgres store");
            Ok(Arc::new(PgStore::new(pool)))
        }
        _ => {
            tracing::info!("Using in-memory demo store");
            Ok(Arc::new(MemoryStore::seeded().await?))
        }
    }
}

/// Stored settings override the environment defaults.
async fn load_ai_settings(store: &dyn Persistence, defaults: &AiSettings) -> AiSettings {
    match store.list(Entity::AiSettings, &[]).await {
        Ok(records) => match records.first() {
            Some(record) => defaults.merged_with(&record.data),
            None => defaults.clone(),
        },
        Err(e) => {
            tracing::warn!("Could not load stored AI settings, using environment: {}", e);
            defaults.clone()
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dtassess=info,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env()?;
    let config = Arc::new(config);

    storage::ensure_dirs(&config.upload_folder)?;

    let store = open_store(&config).await?;
    let settings = load_ai_settings(store.as_ref(), &config.ai).await;
    let engine = ContentEngine::new(settings);
    match engine.provider_name() {
        Some(name) => tracing::info!("AI provider: {} ({})", name, engine.settings().model),
        None => tracing::info!("No AI provider key configured; using built-in templates"),
    }

    let state = Arc::new(state::AppState::new(store, config.clone(), engine));

    let app = routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!("D&T assessment service listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
