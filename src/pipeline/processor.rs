//! Message orchestrator — classify, act, retrieve, synthesize.
//!
//! One `handle` call per inbound message. Every stage degrades rather
//! than fails: classification falls back to a default decision, context
//! load and retrieval failures shrink to empty inputs, and synthesis
//! always produces text. The only short-circuit is escalation, which
//! skips actions and retrieval entirely.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::{info, warn};

use crate::actions::{ActionDispatcher, ActionResult};
use crate::domain::Account;
use crate::llm::CompletionGateway;
use crate::pipeline::classifier::IntentClassifier;
use crate::pipeline::synthesizer::ResponseSynthesizer;
use crate::pipeline::types::{
    InboundRequest, Intent, IntentDecision, OutboundResponse, ResponseMetadata,
};
use crate::retrieval::KnowledgeRetriever;
use crate::store::{AccountStore, KnowledgeStore};

/// Knowledge items fed into synthesis.
const RETRIEVAL_TOP_K: usize = 3;

/// Fixed reply when the conversation is handed to a human.
const HANDOFF_MESSAGE: &str = "I understand this is a complex issue. Let me connect you with a \
     human agent who can better assist you. Please hold while I transfer your call, or you can \
     call our support line at 1-800-XXX-XXXX.";

/// Default account id when the user record carries none.
const DEFAULT_ACCOUNT_ID: &str = "acc_demo";
/// Default card id for delivery checks when the user record carries none.
const DEFAULT_DELIVERY_CARD_ID: &str = "card123";
const DEFAULT_DISPUTE_REASON: &str = "Unauthorized charge";
const DEFAULT_PAYMENT_METHOD: &str = "bank_transfer";

/// The full message pipeline behind every channel.
pub struct MessageProcessor {
    classifier: IntentClassifier,
    dispatcher: ActionDispatcher,
    retriever: KnowledgeRetriever,
    synthesizer: ResponseSynthesizer,
    account_store: Arc<dyn AccountStore>,
}

impl MessageProcessor {
    pub fn new(
        gateway: Arc<CompletionGateway>,
        account_store: Arc<dyn AccountStore>,
        knowledge_store: Arc<dyn KnowledgeStore>,
    ) -> Self {
        Self {
            classifier: IntentClassifier::new(gateway.clone()),
            dispatcher: ActionDispatcher::new(account_store.clone()),
            retriever: KnowledgeRetriever::new(knowledge_store),
            synthesizer: ResponseSynthesizer::new(gateway),
            account_store,
        }
    }

    /// Run one message through the pipeline.
    pub async fn handle(&self, request: InboundRequest) -> OutboundResponse {
        let decision = self
            .classifier
            .classify(&request.message, &request.conversation_history)
            .await;
        info!(
            user_id = %request.user_id,
            channel = %request.channel,
            intent = decision.intent.label(),
            confidence = decision.confidence,
            "Message classified"
        );

        if decision.must_handoff || decision.intent == Intent::EscalateToHuman {
            info!(user_id = %request.user_id, "Escalating to human agent");
            return OutboundResponse {
                message: HANDOFF_MESSAGE.to_string(),
                metadata: ResponseMetadata {
                    intent: decision.intent,
                    confidence: None,
                    slots: None,
                    action_results: None,
                    kb_items_used: None,
                    escalated: Some(true),
                    channel: request.channel,
                    timestamp: Utc::now(),
                },
            };
        }

        // Best effort: a missing or unreadable user record only disables
        // slot defaulting and context in the prompt.
        let account = self.account_store.read().await.remove(&request.user_id);
        if account.is_none() {
            warn!(user_id = %request.user_id, "No account record for user");
        }
        let user_context = account
            .as_ref()
            .and_then(|a| serde_json::to_value(a).ok())
            .unwrap_or(Value::Null);

        let action_result = self
            .dispatch_action(&decision, account.as_ref(), &request.user_id)
            .await;

        let kb_items = self
            .retriever
            .retrieve(&request.message, RETRIEVAL_TOP_K)
            .await;

        let message = self
            .synthesizer
            .synthesize(
                &request.message,
                &decision,
                &user_context,
                &kb_items,
                action_result.as_ref(),
            )
            .await;

        OutboundResponse {
            message,
            metadata: ResponseMetadata {
                intent: decision.intent,
                confidence: Some(decision.confidence),
                slots: Some(decision.slots),
                action_results: action_result,
                kb_items_used: Some(kb_items.len()),
                escalated: None,
                channel: request.channel,
                timestamp: Utc::now(),
            },
        }
    }

    /// Dispatch at most one action for the decision, defaulting missing
    /// slots from the user's account record. Intents whose required slot
    /// cannot be defaulted dispatch nothing.
    async fn dispatch_action(
        &self,
        decision: &IntentDecision,
        account: Option<&Account>,
        user_id: &str,
    ) -> Option<ActionResult> {
        let slots = &decision.slots;
        match decision.intent {
            Intent::ActivateCard => {
                let card_id = string_slot(slots, "cardId")
                    .or_else(|| first_card_id(account))?;
                Some(self.dispatcher.activate_card(user_id, &card_id).await)
            }
            Intent::SetAutopay => {
                let account_id = string_slot(slots, "accountId")
                    .or_else(|| first_account_id(account))
                    .unwrap_or_else(|| DEFAULT_ACCOUNT_ID.to_string());
                let enabled = slots
                    .get("enabled")
                    .and_then(Value::as_bool)
                    .unwrap_or(true);
                Some(
                    self.dispatcher
                        .set_autopay(user_id, &account_id, enabled)
                        .await,
                )
            }
            Intent::DisputeTransaction => {
                let txn_id = string_slot(slots, "txnId")?;
                let reason = string_slot(slots, "reason")
                    .unwrap_or_else(|| DEFAULT_DISPUTE_REASON.to_string());
                Some(
                    self.dispatcher
                        .dispute_transaction(user_id, &txn_id, &reason)
                        .await,
                )
            }
            Intent::CheckCardDelivery => {
                let card_id = string_slot(slots, "cardId")
                    .or_else(|| first_card_id(account))
                    .unwrap_or_else(|| DEFAULT_DELIVERY_CARD_ID.to_string());
                Some(
                    self.dispatcher
                        .get_card_status(&card_id, Some(user_id))
                        .await,
                )
            }
            Intent::MakePayment => {
                let amount = slots.get("amount").and_then(Value::as_f64)?;
                let method = string_slot(slots, "method")
                    .filter(|m| m != "default")
                    .unwrap_or_else(|| DEFAULT_PAYMENT_METHOD.to_string());
                Some(self.dispatcher.repay_amount(user_id, amount, &method).await)
            }
            _ => None,
        }
    }
}

fn string_slot(slots: &crate::pipeline::types::Slots, key: &str) -> Option<String> {
    slots.get(key).and_then(Value::as_str).map(String::from)
}

fn first_card_id(account: Option<&Account>) -> Option<String> {
    account?.cards.first().map(|c| c.card_id.clone())
}

fn first_account_id(account: Option<&Account>) -> Option<String> {
    account?.accounts.first().map(|a| a.account_id.clone())
}
