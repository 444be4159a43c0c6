use std::error::Error;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use journey_gateway::chat::ChatService;
use journey_gateway::llm::GeminiClient;
use journey_gateway::store::{PgConfig, PgTableService, RestTableService, TableService};
use journey_gateway::{configure_routes, AppConfig, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    // Initialize tracing; RUST_LOG overrides the default level
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env()?;

    let store: Arc<dyn TableService> = match &config.database_url {
        Some(url) => {
            info!("Using Postgres table backend");
            Arc::new(PgTableService::new(PgConfig::from_connection_string(url)?).await?)
        }
        None => {
            info!(url = %config.store_url, "Using REST table backend");
            Arc::new(RestTableService::new(&config.store_url, &config.store_key)?)
        }
    };

    let model = Arc::new(GeminiClient::new(&config.gemini_api_key, &config.gemini_model)?);
    info!(model = %config.gemini_model, history_limit = config.chat_history_limit, "Model configured");

    let chat = ChatService::new(store.clone(), model).with_history_limit(config.chat_history_limit);
    let routes = configure_routes(AppState::new(store, chat));

    info!("Starting server on http://{}", config.bind_addr);
    warp::serve(routes).run(config.bind_addr).await;
    Ok(())
}
