use std::sync::Arc;

use mood2movie_api::{
    api::{build_app, AppState},
    config::Config,
    db::{create_pool, run_migrations, HistoryStore, InMemoryHistoryStore, PgHistoryStore},
    services::{FirebaseVerifier, GeminiProvider, IdentityVerifier},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mood2movie_api=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let history: Arc<dyn HistoryStore> = match &config.database_url {
        Some(database_url) => {
            let pool = create_pool(database_url).await?;
            run_migrations(&pool).await?;
            tracing::info!("Search history stored in PostgreSQL");
            Arc::new(PgHistoryStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, search history is kept in memory only");
            Arc::new(InMemoryHistoryStore::new())
        }
    };

    let identity: Option<Arc<dyn IdentityVerifier>> = match &config.firebase_project_id {
        Some(project_id) => {
            let verifier: Arc<dyn IdentityVerifier> = Arc::new(FirebaseVerifier::new(
                project_id.clone(),
                config.firebase_jwks_url.clone(),
            ));
            Some(verifier)
        }
        None => {
            tracing::warn!("FIREBASE_PROJECT_ID not set, all requests are anonymous");
            None
        }
    };

    let provider = Arc::new(GeminiProvider::new(
        config.gemini_api_key.clone(),
        config.gemini_api_url.clone(),
        config.gemini_model.clone(),
    ));

    let state = AppState::new(provider, history, identity);
    let app = build_app(state, &config)?;

    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port)).await?;
    tracing::info!(
        address = %listener.local_addr()?,
        model = %config.gemini_model,
        "Server running"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
