//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{EmbeddingIndex, GlmChatAdapter},
    config::Config,
    error::ApiError,
    web::{
        constitution_questions_handler, extended_advice_handler, history_handler, reset_handler,
        rest::ApiDoc, score_constitution_handler, state::AppState, submit_handler,
        symptom_catalog_handler, update_profile_handler,
    },
};
use async_openai::{config::OpenAIConfig, Client};
use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tcm_assistant_core::{DialogueController, KnowledgeRetriever};
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    // A missing API credential fails right here, before anything is served.
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Build or Load the Knowledge Index ---
    // Retrieval is optional: a failed build degrades the prompts to their
    // no-retrieved-material mode instead of refusing to start.
    let retriever: Option<Arc<dyn KnowledgeRetriever>> = match EmbeddingIndex::open_or_build(
        &config.api_base,
        &config.api_key,
        &config.embedding_model,
        &config.knowledge_path,
        &config.index_dir,
    )
    .await
    {
        Ok(index) => Some(Arc::new(index)),
        Err(e) => {
            warn!("Knowledge base unavailable, continuing without retrieval: {e}");
            None
        }
    };

    // --- 3. Initialize the Chat Adapter & Dialogue Controller ---
    let openai_config = OpenAIConfig::new()
        .with_api_key(&config.api_key)
        .with_api_base(&config.api_base);
    let openai_client = Client::with_config(openai_config);
    let chat_adapter = Arc::new(GlmChatAdapter::new(
        openai_client,
        config.chat_model.clone(),
    ));

    let controller = DialogueController::new(retriever, chat_adapter, config.temperature);

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        config: config.clone(),
        dialogue: Mutex::new(controller),
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // --- 5. Create the Web Router ---
    let api_router = Router::new()
        .route("/consult/submit", post(submit_handler))
        .route("/consult/extended", post(extended_advice_handler))
        .route("/consult/history", get(history_handler))
        .route("/consult/reset", post(reset_handler))
        .route("/consult/profile", put(update_profile_handler))
        .route("/constitution/questions", get(constitution_questions_handler))
        .route("/constitution/score", post(score_constitution_handler))
        .route("/symptoms", get(symptom_catalog_handler))
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
