//! Text-generation integration.
//!
//! The pipeline talks to a pluggable [`GenerativeBackend`] through the
//! [`CompletionGateway`], which owns candidate-model selection and the
//! deterministic fallback. Nothing above the gateway ever sees a
//! generation error.

pub mod gateway;
pub mod gemini;
pub mod responder;

pub use gateway::CompletionGateway;
pub use gemini::GeminiBackend;

use async_trait::async_trait;

use crate::error::LlmError;

/// Generation settings passed through to the backend.
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.3,
            top_p: 0.95,
            top_k: 40,
            max_output_tokens: 1024,
        }
    }
}

impl GenerationConfig {
    /// Deterministic-leaning settings for classification.
    pub fn classification() -> Self {
        Self {
            temperature: 0.2,
            max_output_tokens: 512,
            ..Self::default()
        }
    }

    /// More creative settings for conversational synthesis.
    pub fn synthesis() -> Self {
        Self {
            temperature: 0.7,
            max_output_tokens: 512,
            ..Self::default()
        }
    }
}

/// A text-completion capability addressed by model id.
///
/// One invocation produces one text continuation for a prompt, or fails.
/// The gateway decides which model ids to try and in what order.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    async fn generate(
        &self,
        model_id: &str,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<String, LlmError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_config_is_deterministic_leaning() {
        let config = GenerationConfig::classification();
        assert!(config.temperature < 0.3);
        assert_eq!(config.max_output_tokens, 512);
    }

    #[test]
    fn synthesis_config_is_warmer() {
        let config = GenerationConfig::synthesis();
        assert!(config.temperature > GenerationConfig::classification().temperature);
    }
}
