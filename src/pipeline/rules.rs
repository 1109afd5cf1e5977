//! Rule-based intent classifier — the deterministic fallback path.
//!
//! Used whenever the completion gateway cannot produce usable model
//! output (no credential, all candidates exhausted). Pattern rules run
//! over the lower-cased utterance in strict priority order; the first
//! match wins regardless of the confidences involved. The table must stay
//! behaviorally stable — downstream tests pin its exact decisions.

use std::sync::LazyLock;

use regex::Regex;

use crate::pipeline::types::{Intent, IntentDecision, Slots};

/// Default transaction id when dispute language names no transaction.
const DEFAULT_TXN_ID: &str = "txn456";
/// Default card id when activation language names no card.
const DEFAULT_CARD_ID: &str = "card123";

struct RulePatterns {
    dispute: Regex,
    dispute_exclude: Regex,
    autopay: Regex,
    autopay_disable: Regex,
    money: Regex,
    minimum_due: Regex,
    delivery: Regex,
    how_to: Regex,
    transactions: Regex,
    emi: Regex,
    statement: Regex,
    statement_exclude: Regex,
    collections: Regex,
    activate: Regex,
    activate_exclude: Regex,
}

static PATTERNS: LazyLock<RulePatterns> = LazyLock::new(|| RulePatterns {
    dispute: Regex::new(
        r"\b(dispute|unauthoriz|unauthorized|fraud|wrong charge|chargeback|refund)\b",
    )
    .unwrap(),
    dispute_exclude: Regex::new(r"\b(show|recent|view|list)\b").unwrap(),
    autopay: Regex::new(
        r"\b(set up autopay|enable autopay|disable autopay|turn on autopay|turn off autopay|cancel autopay|stop autopay|autopay)\b",
    )
    .unwrap(),
    autopay_disable: Regex::new(r"\b(disable|turn off|stop|cancel)\b").unwrap(),
    money: Regex::new(r"(?:pay|payment|paying|i want to pay|i paid)\s*\$?([0-9]+(?:\.[0-9]{1,2})?)")
        .unwrap(),
    minimum_due: Regex::new(r"\b(minimum payment|min payment|min due|minimum due)\b").unwrap(),
    delivery: Regex::new(
        r"\b(when will my card|when will card arrive|card arrive|card delivery|where is my card|track my card|track card delivery|tracking)\b",
    )
    .unwrap(),
    how_to: Regex::new(r"\b(how do i|how to|how does)\b").unwrap(),
    transactions: Regex::new(
        r"\b(recent transactions|show my transactions|transaction history|view transactions|list transactions|pending and posted)\b",
    )
    .unwrap(),
    emi: Regex::new(r"\b(emi|equated monthly installment|how does emi work|how emi works)\b")
        .unwrap(),
    statement: Regex::new(
        r"\b(bill|statement|payment due|due date|download my statement|explain my statement)\b",
    )
    .unwrap(),
    statement_exclude: Regex::new(r"\b(card|activate)\b").unwrap(),
    collections: Regex::new(
        r"\b(late fee|late fees|missed my payment|missed payment|what happens if i miss|collections)\b",
    )
    .unwrap(),
    activate: Regex::new(
        r"\b(i want to activate my card|activate my card|activate card|activation)\b",
    )
    .unwrap(),
    activate_exclude: Regex::new(r"\b(how do i|how to)\b").unwrap(),
});

fn decision(
    intent: Intent,
    slots: Slots,
    confidence: f64,
    suggested_actions: &[&str],
) -> IntentDecision {
    IntentDecision {
        intent,
        slots,
        confidence,
        must_handoff: false,
        suggested_actions: suggested_actions.iter().map(|s| s.to_string()).collect(),
    }
}

fn slot(key: &str, value: serde_json::Value) -> Slots {
    let mut slots = Slots::new();
    slots.insert(key.to_string(), value);
    slots
}

/// Classify an utterance with the fixed rule table.
///
/// First match wins. Always returns a decision — the final rule is a
/// catch-all informational query.
pub fn rule_based_decision(utterance: &str) -> IntentDecision {
    let lm = utterance.to_lowercase();
    let p = &*PATTERNS;

    // 1) Dispute/fraud language, unless the user is just browsing charges.
    if p.dispute.is_match(&lm) && !p.dispute_exclude.is_match(&lm) {
        return decision(
            Intent::DisputeTransaction,
            slot("txnId", DEFAULT_TXN_ID.into()),
            0.92,
            &["dispute_transaction"],
        );
    }

    // 2) Autopay commands.
    if p.autopay.is_match(&lm) {
        let enabled = !p.autopay_disable.is_match(&lm);
        return decision(
            Intent::SetAutopay,
            slot("enabled", enabled.into()),
            0.9,
            &["set_autopay"],
        );
    }

    // 3) Payment with an explicit amount.
    if let Some(caps) = p.money.captures(&lm) {
        if let Ok(amount) = caps[1].parse::<f64>() {
            let mut slots = slot("amount", amount.into());
            slots.insert("method".to_string(), "default".into());
            return decision(Intent::MakePayment, slots, 0.92, &["make_payment"]);
        }
    }

    // 4) Minimum payment questions.
    if p.minimum_due.is_match(&lm) {
        return decision(Intent::CheckStatement, Slots::new(), 0.88, &[]);
    }

    // 5) Card delivery/tracking, unless asking how delivery works.
    if p.delivery.is_match(&lm) && !p.how_to.is_match(&lm) {
        return decision(
            Intent::CheckCardDelivery,
            Slots::new(),
            0.90,
            &["get_card_status"],
        );
    }

    // 6) Browsing transaction history.
    if p.transactions.is_match(&lm) {
        return decision(Intent::InformationalQuery, Slots::new(), 0.9, &[]);
    }

    // 7) EMI explanations.
    if p.emi.is_match(&lm) {
        return decision(Intent::InformationalQuery, Slots::new(), 0.9, &[]);
    }

    // 8) Bill/statement/due-date, unless card activation language is present.
    if p.statement.is_match(&lm) && !p.statement_exclude.is_match(&lm) {
        return decision(Intent::CheckStatement, Slots::new(), 0.9, &[]);
    }

    // 9) Late fees / collections.
    if p.collections.is_match(&lm) {
        return decision(Intent::CollectionsQuery, Slots::new(), 0.88, &[]);
    }

    // 10) Explicit card activation.
    if p.activate.is_match(&lm) && !p.activate_exclude.is_match(&lm) {
        return decision(
            Intent::ActivateCard,
            slot("cardId", DEFAULT_CARD_ID.into()),
            0.95,
            &["activate_card"],
        );
    }

    // 11) Catch-all.
    decision(Intent::InformationalQuery, Slots::new(), 0.75, &[])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispute_language_wins() {
        for utterance in [
            "I want to dispute this charge",
            "This transaction is unauthorized",
            "That's a fraud charge on my account",
            "I need a chargeback",
        ] {
            let d = rule_based_decision(utterance);
            assert_eq!(d.intent, Intent::DisputeTransaction, "{utterance}");
            assert_eq!(d.slots["txnId"], "txn456");
            assert_eq!(d.suggested_actions, vec!["dispute_transaction"]);
        }
    }

    #[test]
    fn browsing_qualifier_suppresses_dispute() {
        let d = rule_based_decision("Show me my recent refund transactions");
        assert_ne!(d.intent, Intent::DisputeTransaction);
    }

    #[test]
    fn autopay_enable_and_disable() {
        let enable = rule_based_decision("I want to set up autopay");
        assert_eq!(enable.intent, Intent::SetAutopay);
        assert_eq!(enable.slots["enabled"], true);

        let disable = rule_based_decision("Disable autopay");
        assert_eq!(disable.intent, Intent::SetAutopay);
        assert_eq!(disable.slots["enabled"], false);

        let stop = rule_based_decision("Please stop autopay");
        assert_eq!(stop.slots["enabled"], false);
    }

    #[test]
    fn payment_amount_extracted() {
        let d = rule_based_decision("I want to pay $100");
        assert_eq!(d.intent, Intent::MakePayment);
        assert_eq!(d.slots["amount"], 100.0);
        assert_eq!(d.slots["method"], "default");
        assert!((d.confidence - 0.92).abs() < f64::EPSILON);
    }

    #[test]
    fn payment_amount_with_cents() {
        let d = rule_based_decision("I paid 42.50 yesterday");
        assert_eq!(d.intent, Intent::MakePayment);
        assert_eq!(d.slots["amount"], 42.5);
    }

    #[test]
    fn minimum_payment_is_statement() {
        let d = rule_based_decision("What's my minimum payment?");
        assert_eq!(d.intent, Intent::CheckStatement);
        assert!((d.confidence - 0.88).abs() < f64::EPSILON);
    }

    #[test]
    fn card_delivery_tracking() {
        for utterance in ["When will my card arrive?", "Track my card delivery"] {
            let d = rule_based_decision(utterance);
            assert_eq!(d.intent, Intent::CheckCardDelivery, "{utterance}");
            assert_eq!(d.suggested_actions, vec!["get_card_status"]);
        }
    }

    #[test]
    fn how_to_qualifier_suppresses_delivery() {
        let d = rule_based_decision("How does card delivery work?");
        assert_ne!(d.intent, Intent::CheckCardDelivery);
    }

    #[test]
    fn transaction_history_is_informational() {
        let d = rule_based_decision("Show me my recent transactions");
        assert_eq!(d.intent, Intent::InformationalQuery);
        assert!((d.confidence - 0.9).abs() < f64::EPSILON);
    }

    #[test]
    fn emi_is_informational() {
        let d = rule_based_decision("How does EMI work?");
        assert_eq!(d.intent, Intent::InformationalQuery);
    }

    #[test]
    fn bill_due_is_statement() {
        let d = rule_based_decision("When is my bill due?");
        assert_eq!(d.intent, Intent::CheckStatement);
    }

    #[test]
    fn late_fee_is_collections() {
        let d = rule_based_decision("What's the late fee?");
        assert_eq!(d.intent, Intent::CollectionsQuery);

        let d = rule_based_decision("I missed my payment, what happens?");
        assert_eq!(d.intent, Intent::CollectionsQuery);
    }

    #[test]
    fn explicit_activation() {
        let d = rule_based_decision("I want to activate my card");
        assert_eq!(d.intent, Intent::ActivateCard);
        assert_eq!(d.slots["cardId"], "card123");
        assert!((d.confidence - 0.95).abs() < f64::EPSILON);
    }

    #[test]
    fn how_to_qualifier_suppresses_activation() {
        let d = rule_based_decision("How do I activate my credit card?");
        assert_eq!(d.intent, Intent::InformationalQuery);
        assert!((d.confidence - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn catch_all_is_informational() {
        let d = rule_based_decision("Tell me a bit about your services");
        assert_eq!(d.intent, Intent::InformationalQuery);
        assert!((d.confidence - 0.75).abs() < f64::EPSILON);
        assert!(!d.must_handoff);
    }

    #[test]
    fn priority_is_strict_first_match() {
        // Dispute language outranks autopay language even though the
        // autopay rule would also match.
        let d = rule_based_decision("dispute the autopay charge");
        assert_eq!(d.intent, Intent::DisputeTransaction);
    }

    #[test]
    fn decisions_never_request_handoff() {
        for utterance in ["Disable autopay", "I want to pay $50", "hello"] {
            assert!(!rule_based_decision(utterance).must_handoff);
        }
    }
}
