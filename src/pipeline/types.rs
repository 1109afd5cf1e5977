//! Shared types for the message-orchestration pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::actions::ActionResult;

// ── Intents ─────────────────────────────────────────────────────────

/// Closed set of things the user can ask for.
///
/// `CollectionsQuery` is produced only by the rule classifier; it has no
/// dispatcher action and is handled as informational. That asymmetry is
/// by design, not a gap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    ActivateCard,
    SetAutopay,
    DisputeTransaction,
    CheckCardDelivery,
    CheckBalance,
    CheckStatement,
    MakePayment,
    InformationalQuery,
    EscalateToHuman,
    CollectionsQuery,
}

impl Intent {
    /// Wire-format label, e.g. `make_payment`.
    pub fn label(&self) -> &'static str {
        match self {
            Self::ActivateCard => "activate_card",
            Self::SetAutopay => "set_autopay",
            Self::DisputeTransaction => "dispute_transaction",
            Self::CheckCardDelivery => "check_card_delivery",
            Self::CheckBalance => "check_balance",
            Self::CheckStatement => "check_statement",
            Self::MakePayment => "make_payment",
            Self::InformationalQuery => "informational_query",
            Self::EscalateToHuman => "escalate_to_human",
            Self::CollectionsQuery => "collections_query",
        }
    }
}

/// Named parameters extracted alongside an intent (amount, cardId, …).
pub type Slots = serde_json::Map<String, serde_json::Value>;

/// A classified utterance — produced fresh per message, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentDecision {
    pub intent: Intent,
    #[serde(default)]
    pub slots: Slots,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub must_handoff: bool,
    #[serde(default)]
    pub suggested_actions: Vec<String>,
}

impl IntentDecision {
    /// Local fallback when classification fails outright: treat the
    /// message as an informational query at middling confidence.
    pub fn fallback() -> Self {
        Self {
            intent: Intent::InformationalQuery,
            slots: Slots::new(),
            confidence: 0.5,
            must_handoff: false,
            suggested_actions: Vec::new(),
        }
    }
}

// ── Inbound / outbound ──────────────────────────────────────────────

/// One prior turn of conversation, oldest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: String,
    pub content: String,
}

/// Unified inbound request from any channel.
///
/// The transport layer (HTTP routes, webhook adapter) converts its native
/// payload into this struct before the pipeline runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundRequest {
    pub message: String,
    pub user_id: String,
    #[serde(default = "default_channel")]
    pub channel: String,
    #[serde(default)]
    pub conversation_history: Vec<ChatTurn>,
}

fn default_channel() -> String {
    "web".to_string()
}

/// Metadata returned alongside every reply.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMetadata {
    pub intent: Intent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slots: Option<Slots>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_results: Option<ActionResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kb_items_used: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub escalated: Option<bool>,
    pub channel: String,
    pub timestamp: DateTime<Utc>,
}

/// The pipeline's reply: natural-language message plus metadata.
#[derive(Debug, Clone, Serialize)]
pub struct OutboundResponse {
    pub message: String,
    pub metadata: ResponseMetadata,
}
