//! OdysseyMaker server entry point.

use std::sync::Arc;

use odyssey_core::clock::{Clock, SystemClock};
use odyssey_openai::OpenAiProvider;
use odyssey_outline::application::orchestrator::Orchestrator;
use odyssey_session_store::InMemorySessionRepository;
use odyssey_web::config::ServerConfig;
use odyssey_web::error::AppError;
use odyssey_web::state::AppState;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Load .env before anything reads the environment.
    let dotenv = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    match dotenv {
        Ok(path) => tracing::info!(path = %path.display(), "loaded environment file"),
        Err(e) => tracing::debug!(error = %e, "no environment file loaded"),
    }

    tracing::info!("Starting OdysseyMaker server");

    let config = ServerConfig::from_env()?;
    let provider = OpenAiProvider::new(config.openai.clone())?;
    tracing::info!(model = provider.model(), "using OpenAI completion provider");

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let session_repository =
        InMemorySessionRepository::with_idle_timeout(clock.clone(), config.session_ttl);
    tracing::info!(ttl_secs = config.session_ttl.as_secs(), "sessions expire when idle");

    let app_state = AppState::new(
        clock,
        Orchestrator::new(Arc::new(provider), config.stages),
        Arc::new(session_repository),
    );
    let app = odyssey_web::app(app_state);

    let addr = config.bind_address()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app).await?;

    Ok(())
}
