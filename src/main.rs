use std::sync::Arc;

use card_assist::actions::ActionDispatcher;
use card_assist::config::{AssistConfig, GatewayConfig};
use card_assist::llm::CompletionGateway;
use card_assist::pipeline::MessageProcessor;
use card_assist::retrieval::KnowledgeRetriever;
use card_assist::server::{AppState, app_router};
use card_assist::store::{AccountStore, JsonAccountStore, JsonKnowledgeStore, KnowledgeStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = AssistConfig::from_env();
    let gateway_config = GatewayConfig::from_env();

    eprintln!("💳 Card Assist v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Users: {}", config.users_path);
    eprintln!("   Knowledge base: {}", config.kb_path);
    eprintln!(
        "   Gateway: {}",
        if gateway_config.has_credential() {
            "live backend with rule-based fallback"
        } else {
            "rule-based fallback only (no GEMINI_API_KEY)"
        }
    );
    eprintln!("   API: http://0.0.0.0:{}/api/v1/message", config.port);

    let account_store: Arc<dyn AccountStore> =
        Arc::new(JsonAccountStore::new(&config.users_path));
    let knowledge_store: Arc<dyn KnowledgeStore> =
        Arc::new(JsonKnowledgeStore::new(&config.kb_path));

    let gateway = Arc::new(CompletionGateway::new(&gateway_config));

    let state = AppState {
        processor: Arc::new(MessageProcessor::new(
            gateway,
            account_store.clone(),
            knowledge_store.clone(),
        )),
        dispatcher: Arc::new(ActionDispatcher::new(account_store)),
        retriever: Arc::new(KnowledgeRetriever::new(knowledge_store)),
    };

    let app = app_router(state);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    tracing::info!(port = config.port, "Listening");
    axum::serve(listener, app).await?;
    Ok(())
}
