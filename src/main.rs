//! Binary entry point: config, tracing, database pool, router, serve.

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tracing::info;
use tracing_subscriber::EnvFilter;

use propsight::adapters::agent::RemoteAgentEngine;
use propsight::adapters::ai::GroqProvider;
use propsight::adapters::http::{app_router, AppState};
use propsight::adapters::postgres::PostgresConversationStore;
use propsight::application::chat::{
    ChatPipeline, ContextWindowBuilder, FollowUpSuggester, Greeter, Summarizer,
};
use propsight::application::insights::InsightsService;
use propsight::config::AppConfig;
use propsight::ports::ConversationStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level)),
        )
        .init();

    let pool = PgPoolOptions::new()
        .min_connections(config.database.min_connections)
        .max_connections(config.database.max_connections)
        .acquire_timeout(config.database.acquire_timeout())
        .connect(&config.database.url)
        .await?;

    if config.database.run_migrations {
        info!("running database migrations");
        sqlx::migrate!("./migrations").run(&pool).await?;
    }

    let store: Arc<dyn ConversationStore> = Arc::new(PostgresConversationStore::new(pool));
    let provider = Arc::new(GroqProvider::new(config.ai.provider_config()));
    let engine = Arc::new(RemoteAgentEngine::new(config.agent.engine_config()));

    let pipeline = Arc::new(ChatPipeline::new(
        engine,
        store.clone(),
        ContextWindowBuilder::new(Summarizer::new(provider.clone())),
        FollowUpSuggester::new(provider.clone()),
    ));

    let state = AppState::new(
        pipeline,
        store,
        Arc::new(Greeter::new(provider.clone())),
        Arc::new(InsightsService::new(provider)),
    );

    let addr = config.server.socket_addr();
    info!(%addr, "starting server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app_router(state)).await?;

    Ok(())
}
