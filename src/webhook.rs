//! Channel webhook adapter.
//!
//! Inbound webhooks arrive with channel-specific field names; this
//! module normalizes them into an [`InboundRequest`] before the pipeline
//! runs. The message text may appear under `message`, `text`, or `body`
//! and the sender under `userId` or `from` depending on the provider.

use serde_json::Value;
use tracing::debug;

use crate::error::PipelineError;
use crate::pipeline::types::{ChatTurn, InboundRequest};

/// Normalize a raw webhook payload for the given channel.
pub fn webhook_request(channel: &str, payload: &Value) -> Result<InboundRequest, PipelineError> {
    let message = first_string(payload, &["message", "text", "body"])
        .ok_or_else(|| PipelineError::WebhookField("message".to_string()))?;
    let user_id = first_string(payload, &["userId", "from"])
        .ok_or_else(|| PipelineError::WebhookField("userId".to_string()))?;

    let conversation_history = payload
        .get("conversationHistory")
        .cloned()
        .map(serde_json::from_value::<Vec<ChatTurn>>)
        .transpose()
        .map_err(|_| PipelineError::WebhookField("conversationHistory".to_string()))?
        .unwrap_or_default();

    debug!(channel, user_id = %user_id, "Webhook payload normalized");
    Ok(InboundRequest {
        message,
        user_id,
        channel: channel.to_string(),
        conversation_history,
    })
}

fn first_string(payload: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| payload.get(*k).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn standard_payload_normalizes() {
        let request = webhook_request(
            "whatsapp",
            &json!({"message": "activate my card", "userId": "user123"}),
        )
        .unwrap();
        assert_eq!(request.message, "activate my card");
        assert_eq!(request.user_id, "user123");
        assert_eq!(request.channel, "whatsapp");
        assert!(request.conversation_history.is_empty());
    }

    #[test]
    fn sms_style_fields_accepted() {
        let request = webhook_request(
            "sms",
            &json!({"text": "what's my balance", "from": "+15551234567"}),
        )
        .unwrap();
        assert_eq!(request.message, "what's my balance");
        assert_eq!(request.user_id, "+15551234567");
    }

    #[test]
    fn body_field_is_last_resort() {
        let request =
            webhook_request("email", &json!({"body": "pay $50", "from": "user123"})).unwrap();
        assert_eq!(request.message, "pay $50");
    }

    #[test]
    fn message_field_takes_priority_over_text() {
        let request = webhook_request(
            "ivr",
            &json!({"message": "primary", "text": "secondary", "userId": "u"}),
        )
        .unwrap();
        assert_eq!(request.message, "primary");
    }

    #[test]
    fn missing_message_is_an_error() {
        let err = webhook_request("sms", &json!({"from": "user123"})).unwrap_err();
        assert!(matches!(err, PipelineError::WebhookField(field) if field == "message"));
    }

    #[test]
    fn missing_sender_is_an_error() {
        let err = webhook_request("sms", &json!({"text": "hello"})).unwrap_err();
        assert!(matches!(err, PipelineError::WebhookField(field) if field == "userId"));
    }

    #[test]
    fn blank_fields_do_not_count() {
        let err = webhook_request("sms", &json!({"text": "  ", "from": "user123"})).unwrap_err();
        assert!(matches!(err, PipelineError::WebhookField(_)));
    }

    #[test]
    fn history_carries_through() {
        let request = webhook_request(
            "web",
            &json!({
                "message": "and my balance?",
                "userId": "user123",
                "conversationHistory": [
                    {"role": "user", "content": "hi"},
                    {"role": "assistant", "content": "hello"}
                ]
            }),
        )
        .unwrap();
        assert_eq!(request.conversation_history.len(), 2);
        assert_eq!(request.conversation_history[1].role, "assistant");
    }

    #[test]
    fn malformed_history_is_an_error() {
        let err = webhook_request(
            "web",
            &json!({"message": "hi", "userId": "u", "conversationHistory": "not a list"}),
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::WebhookField(field) if field == "conversationHistory"));
    }
}
