//! LLM intent classification with strict decoding.
//!
//! Builds the structured-output prompt, runs it through the completion
//! gateway at low temperature, and decodes the reply into an
//! [`IntentDecision`]. Anything undecodable collapses to the local
//! fallback decision rather than an error — classification never blocks
//! the pipeline.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::llm::{CompletionGateway, GenerationConfig};
use crate::pipeline::types::{ChatTurn, IntentDecision};

/// How many trailing history turns the prompt carries.
const HISTORY_WINDOW: usize = 3;

/// Classifies utterances via the completion gateway.
pub struct IntentClassifier {
    gateway: Arc<CompletionGateway>,
}

impl IntentClassifier {
    pub fn new(gateway: Arc<CompletionGateway>) -> Self {
        Self { gateway }
    }

    /// Classify a message in the context of recent history.
    pub async fn classify(&self, message: &str, history: &[ChatTurn]) -> IntentDecision {
        let prompt = build_intent_prompt(message, history);
        let raw = self
            .gateway
            .complete(&prompt, &GenerationConfig::classification())
            .await;
        decode_decision(&raw)
    }
}

/// Structured-output prompt for intent detection.
fn build_intent_prompt(message: &str, history: &[ChatTurn]) -> String {
    let recent = &history[history.len().saturating_sub(HISTORY_WINDOW)..];
    let history_json = serde_json::to_string(recent).unwrap_or_else(|_| "[]".to_string());

    format!(
        r#"You are an NLU system for a credit card assistant. Analyze the user's message and determine their intent.

Possible intents:
- activate_card: user wants to activate a credit card
- set_autopay: user wants to enable or disable automatic payments
- dispute_transaction: user wants to dispute or report a charge
- check_card_delivery: user asks when their card will arrive or its delivery status
- check_balance: user asks about their balance or available credit
- check_statement: user asks about their bill, statement, or due date
- make_payment: user wants to make a payment
- informational_query: general question answerable from the knowledge base
- escalate_to_human: user explicitly wants a human agent, or the issue is too complex

Extract any slots (parameters) mentioned: amount, cardId, accountId, txnId, enabled, method, reason.

User message: "{message}"

Conversation history (last {HISTORY_WINDOW} messages): {history_json}

Respond with ONLY valid JSON in this exact format, no other text:
{{"intent": "<intent>", "slots": {{}}, "confidence": <0.0-1.0>, "must_handoff": <true|false>, "suggested_actions": []}}"#
    )
}

/// Decode model output into a decision, tolerating markdown wrapping.
fn decode_decision(raw: &str) -> IntentDecision {
    let Some(json) = extract_json_object(raw) else {
        warn!("Classifier output carried no JSON object; using fallback decision");
        return IntentDecision::fallback();
    };

    match serde_json::from_str::<IntentDecision>(json) {
        Ok(mut decision) => {
            decision.confidence = decision.confidence.clamp(0.0, 1.0);
            debug!(intent = decision.intent.label(), confidence = decision.confidence, "Classified");
            decision
        }
        Err(e) => {
            warn!(error = %e, "Classifier output failed to decode; using fallback decision");
            IntentDecision::fallback()
        }
    }
}

/// Slice out the first top-level `{...}` span, ignoring code fences.
fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&raw[start..=end])
}
