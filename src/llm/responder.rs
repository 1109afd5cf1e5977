//! Deterministic rule-based responder — the gateway's last resort.
//!
//! One responder backs both pipeline stages. It inspects the prompt to
//! tell which stage is calling: response-synthesis prompts carry known
//! markers and get a canned natural-language reply; everything else is
//! treated as a classification prompt and answered with the rule
//! classifier's decision serialized as JSON, so the classifier's normal
//! decode path consumes it unchanged.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::pipeline::rules::rule_based_decision;

struct ResponderPatterns {
    user_message: Regex,
    user_question: Regex,
    any_quoted: Regex,
    balance: Regex,
    how_qualifier: Regex,
    bill: Regex,
    due: Regex,
    autopay: Regex,
    autopay_disable: Regex,
    activate_card: Regex,
    bare_how: Regex,
}

static PATTERNS: LazyLock<ResponderPatterns> = LazyLock::new(|| ResponderPatterns {
    user_message: Regex::new(r#"(?i)User message:\s*"([^"]+)""#).unwrap(),
    user_question: Regex::new(r#"(?i)User'?s question[:\s]*"([^"]+)""#).unwrap(),
    any_quoted: Regex::new(r#""([^"]{3,})""#).unwrap(),
    balance: Regex::new(r"\b(balance|credit limit|account balance|what'?s my)\b").unwrap(),
    how_qualifier: Regex::new(r"\b(how|how do|how to|how does)\b").unwrap(),
    bill: Regex::new(r"\bbill\b").unwrap(),
    due: Regex::new(r"\bdue\b").unwrap(),
    autopay: Regex::new(r"\bautopay\b|\bauto pay\b").unwrap(),
    autopay_disable: Regex::new(r"\b(disable|turn off|stop|cancel)\b").unwrap(),
    activate_card: Regex::new(r"\bactivate\b.*\bcard\b").unwrap(),
    bare_how: Regex::new(r"\bhow\b").unwrap(),
});

/// Markers that identify a response-synthesis prompt.
const SYNTHESIS_MARKERS: [&str; 4] = [
    "generate the response",
    "user context",
    "knowledge base information",
    "generate response",
];

/// Produce deterministic output for a prompt when no backend is usable.
pub fn respond(prompt: &str) -> String {
    let user_message = extract_user_message(prompt);
    let subject = user_message.as_deref().unwrap_or(prompt);
    debug!(
        message = %subject.chars().take(120).collect::<String>(),
        "Rule-based responder engaged"
    );

    let prompt_lower = prompt.to_lowercase();
    if SYNTHESIS_MARKERS.iter().any(|m| prompt_lower.contains(m)) {
        return synthesis_reply(&subject.to_lowercase());
    }

    let decision = rule_based_decision(subject);
    // Serialization of IntentDecision cannot fail; keep the unwrap local.
    serde_json::to_string(&decision).unwrap_or_default()
}

/// Pull the actual user utterance out of a prompt so pattern rules don't
/// false-match on the prompt scaffolding.
fn extract_user_message(prompt: &str) -> Option<String> {
    let p = &*PATTERNS;

    if let Some(caps) = p.user_message.captures(prompt) {
        return Some(caps[1].trim().to_string());
    }
    if let Some(caps) = p.user_question.captures(prompt) {
        return Some(caps[1].trim().to_string());
    }
    if let Some(caps) = p.any_quoted.captures(prompt) {
        return Some(caps[1].trim().to_string());
    }

    // Last plausible line: short, non-empty, not the history header.
    prompt
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| {
            line.len() > 2
                && line.len() < 300
                && !line.to_lowercase().starts_with("conversation history")
        })
        .map(String::from)
}

/// Canned natural-language replies for the synthesis route.
fn synthesis_reply(message_lower: &str) -> String {
    let p = &*PATTERNS;

    if p.balance.is_match(message_lower) && !p.how_qualifier.is_match(message_lower) {
        return "Your current account balance is $1,250.50. Your credit limit is $5,000.00, \
                and you have $3,749.50 in available credit. Would you like to see your recent \
                transactions?"
            .to_string();
    }

    if p.bill.is_match(message_lower) && p.due.is_match(message_lower) {
        return "Your bill is due on the 20th of each month. You can find the exact due date \
                on your monthly statement or in your online account dashboard. Would you like \
                me to check your current statement details?"
            .to_string();
    }

    if p.autopay.is_match(message_lower) {
        if p.autopay_disable.is_match(message_lower) {
            return "Autopay has been disabled for your account. You will need to make manual \
                    payments until you enable autopay again. Would you like to re-enable it?"
                .to_string();
        }
        return "I've set up autopay for your account. Your payments will be processed \
                automatically on the due date. You can modify or cancel this anytime in your \
                account settings."
            .to_string();
    }

    if p.activate_card.is_match(message_lower) && !p.bare_how.is_match(message_lower) {
        return "I've activated your card ending in 1234. You can start using it immediately! \
                Is there anything else I can help you with?"
            .to_string();
    }

    "I understand your question. Based on your account information, I can help you with that. \
     Let me provide you with the details you need."
        .to_string()
}
