//! Configuration types, populated from the environment.

use secrecy::{ExposeSecret, SecretString};

/// Default candidate model ids, tried in order by the completion gateway.
pub const DEFAULT_MODEL_CANDIDATES: [&str; 5] = [
    "gemini-1.5-flash",
    "gemini-1.5",
    "gemini-1.5-mini",
    "gemini-1.0",
    "gemini-pro",
];

/// Keys shipped in sample configs that must not be treated as real
/// credentials. A key equal to this value behaves like no key at all.
pub const PLACEHOLDER_API_KEY: &str = "REPLACE_WITH_GEMINI_API_KEY";

/// Completion gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// API credential for the generation backend. `None` means the
    /// gateway runs entirely on the deterministic fallback responder.
    pub api_key: Option<SecretString>,
    /// Ordered candidate model ids (first usable wins).
    pub model_candidates: Vec<String>,
}

impl GatewayConfig {
    /// Read gateway configuration from the environment.
    ///
    /// `GEMINI_API_KEY` supplies the credential; a missing or placeholder
    /// value disables the live backend. `GEMINI_MODEL_CANDIDATES` (or the
    /// single-value `GEMINI_MODEL`) overrides the default candidate list
    /// as a comma-separated string.
    pub fn from_env() -> Self {
        let api_key = Self::credential_from(std::env::var("GEMINI_API_KEY").ok());

        let env_list = std::env::var("GEMINI_MODEL_CANDIDATES")
            .or_else(|_| std::env::var("GEMINI_MODEL"))
            .unwrap_or_default();
        let model_candidates: Vec<String> = if env_list.trim().is_empty() {
            DEFAULT_MODEL_CANDIDATES
                .iter()
                .map(|s| s.to_string())
                .collect()
        } else {
            env_list
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        };

        Self {
            api_key,
            model_candidates,
        }
    }

    /// Filter a raw key value down to a usable credential.
    ///
    /// Empty values and the shipped placeholder count as unconfigured.
    pub fn credential_from(raw: Option<String>) -> Option<SecretString> {
        raw.filter(|k| !k.is_empty() && k != PLACEHOLDER_API_KEY)
            .map(SecretString::from)
    }

    /// Whether a usable credential is configured.
    pub fn has_credential(&self) -> bool {
        self.api_key
            .as_ref()
            .is_some_and(|k| !k.expose_secret().is_empty())
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model_candidates: DEFAULT_MODEL_CANDIDATES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Top-level service configuration.
#[derive(Debug, Clone)]
pub struct AssistConfig {
    /// Path to the JSON account store.
    pub users_path: String,
    /// Path to the JSON knowledge base.
    pub kb_path: String,
    /// HTTP listen port.
    pub port: u16,
}

impl AssistConfig {
    pub fn from_env() -> Self {
        let users_path = std::env::var("CARD_ASSIST_USERS_PATH")
            .unwrap_or_else(|_| "./data/users.json".to_string());
        let kb_path =
            std::env::var("CARD_ASSIST_KB_PATH").unwrap_or_else(|_| "./data/kb.json".to_string());
        let port: u16 = std::env::var("CARD_ASSIST_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .unwrap_or(3000);

        Self {
            users_path,
            kb_path,
            port,
        }
    }
}

impl Default for AssistConfig {
    fn default() -> Self {
        Self {
            users_path: "./data/users.json".to_string(),
            kb_path: "./data/kb.json".to_string(),
            port: 3000,
        }
    }
}
