//! Completion gateway — candidate-model fallback around the backend.
//!
//! Tries an ordered list of candidate model ids, two identifier forms
//! each, and returns the first usable text. Total failure (including the
//! unconfigured case) is absorbed into the deterministic rule-based
//! responder. Nothing escapes this boundary as an error.

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::GatewayConfig;
use crate::llm::gemini::GeminiBackend;
use crate::llm::{GenerationConfig, GenerativeBackend, responder};

/// Gateway from prompt to text, with layered fallback.
pub struct CompletionGateway {
    backend: Option<Arc<dyn GenerativeBackend>>,
    candidates: Vec<String>,
}

impl CompletionGateway {
    /// Build a gateway from configuration.
    ///
    /// Without a usable credential the gateway runs entirely on the
    /// rule-based responder.
    pub fn new(config: &GatewayConfig) -> Self {
        let backend: Option<Arc<dyn GenerativeBackend>> = match &config.api_key {
            Some(key) => Some(Arc::new(GeminiBackend::new(key.clone()))),
            None => {
                warn!("No API credential configured; completions use the rule-based responder");
                None
            }
        };
        Self {
            backend,
            candidates: config.model_candidates.clone(),
        }
    }

    /// Build a gateway around an explicit backend (tests, adapters).
    pub fn with_backend(backend: Arc<dyn GenerativeBackend>, candidates: Vec<String>) -> Self {
        Self {
            backend: Some(backend),
            candidates,
        }
    }

    /// Build a gateway with no live backend at all.
    pub fn unconfigured() -> Self {
        Self {
            backend: None,
            candidates: Vec::new(),
        }
    }

    /// Complete a prompt. Infallible: falls back to deterministic text.
    pub async fn complete(&self, prompt: &str, config: &GenerationConfig) -> String {
        if let Some(backend) = &self.backend {
            if let Some(text) = self.try_candidates(backend.as_ref(), prompt, config).await {
                return text;
            }
            warn!("All model candidates failed; using rule-based responder");
        }
        responder::respond(prompt)
    }

    /// Iterate candidates, stop on the first usable response.
    ///
    /// Each candidate is tried under its bare id and its `models/`
    /// namespaced id — which form resolves depends on the API version.
    /// Empty output and the literal text `"null"` are not usable.
    async fn try_candidates(
        &self,
        backend: &dyn GenerativeBackend,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Option<String> {
        for candidate in &self.candidates {
            for model_id in [candidate.clone(), format!("models/{candidate}")] {
                match backend.generate(&model_id, prompt, config).await {
                    Ok(text) => {
                        let trimmed = text.trim();
                        if !trimmed.is_empty() && trimmed != "null" {
                            info!(model = %model_id, "Completion succeeded");
                            return Some(text);
                        }
                        warn!(model = %model_id, "Model returned empty/invalid response");
                    }
                    Err(e) => {
                        warn!(model = %model_id, error = %e, "Model attempt failed");
                    }
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::error::LlmError;

    /// Backend that scripts one outcome per attempted model id, recording
    /// the ids actually tried.
    struct ScriptedBackend {
        outcomes: Mutex<Vec<Result<String, LlmError>>>,
        tried: Mutex<Vec<String>>,
    }

    impl ScriptedBackend {
        fn new(outcomes: Vec<Result<String, LlmError>>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes),
                tried: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl GenerativeBackend for ScriptedBackend {
        async fn generate(
            &self,
            model_id: &str,
            _prompt: &str,
            _config: &GenerationConfig,
        ) -> Result<String, LlmError> {
            self.tried.lock().unwrap().push(model_id.to_string());
            let mut outcomes = self.outcomes.lock().unwrap();
            if outcomes.is_empty() {
                Err(LlmError::RequestFailed {
                    model: model_id.to_string(),
                    reason: "exhausted".to_string(),
                })
            } else {
                outcomes.remove(0)
            }
        }
    }

    fn failed(model: &str) -> Result<String, LlmError> {
        Err(LlmError::RequestFailed {
            model: model.to_string(),
            reason: "unavailable".to_string(),
        })
    }

    #[tokio::test]
    async fn first_usable_candidate_wins() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            failed("a"),
            Ok("hello there".to_string()),
        ]));
        let gateway = CompletionGateway::with_backend(
            backend.clone(),
            vec!["model-a".to_string(), "model-b".to_string()],
        );

        let text = gateway
            .complete("prompt", &GenerationConfig::default())
            .await;
        assert_eq!(text, "hello there");
        // Second attempt was the namespaced form of the first candidate.
        let tried = backend.tried.lock().unwrap().clone();
        assert_eq!(tried, vec!["model-a", "models/model-a"]);
    }

    #[tokio::test]
    async fn empty_and_null_responses_are_skipped() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            Ok("   ".to_string()),
            Ok("null".to_string()),
            Ok("usable".to_string()),
        ]));
        let gateway =
            CompletionGateway::with_backend(backend, vec!["a".to_string(), "b".to_string()]);

        let text = gateway
            .complete("prompt", &GenerationConfig::default())
            .await;
        assert_eq!(text, "usable");
    }

    #[tokio::test]
    async fn exhausted_candidates_fall_back_to_responder() {
        let backend = Arc::new(ScriptedBackend::new(vec![]));
        let gateway = CompletionGateway::with_backend(backend, vec!["only".to_string()]);

        let text = gateway
            .complete(
                "User message: \"I want to activate my card\"",
                &GenerationConfig::classification(),
            )
            .await;
        // Deterministic responder returns the rule decision as JSON.
        assert!(text.contains("activate_card"));
    }

    #[tokio::test]
    async fn unconfigured_gateway_uses_responder() {
        let gateway = CompletionGateway::unconfigured();
        let text = gateway
            .complete(
                "User's question: \"When is my bill due?\"\nGenerate the response:",
                &GenerationConfig::synthesis(),
            )
            .await;
        assert!(text.contains("due on the 20th"));
    }

    #[tokio::test]
    async fn tries_both_forms_of_every_candidate() {
        let backend = Arc::new(ScriptedBackend::new(vec![]));
        let gateway = CompletionGateway::with_backend(
            backend.clone(),
            vec!["x".to_string(), "y".to_string()],
        );
        let _ = gateway
            .complete("User message: \"hello\"", &GenerationConfig::default())
            .await;
        let tried = backend.tried.lock().unwrap().clone();
        assert_eq!(tried, vec!["x", "models/x", "y", "models/y"]);
    }
}
