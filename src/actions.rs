//! Action dispatcher — the five account operations.
//!
//! Every operation returns an [`ActionResult`] value; domain failures
//! (lookup misses, balance preconditions, rejected store writes) are data
//! the orchestrator folds into response metadata, never errors that abort
//! the pipeline. Store writes happen at most once per operation, after
//! all validation.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::domain::{Autopay, CardStatus, Dispute, Payment};
use crate::store::AccountStore;

/// Fallback autopay payment date when the account has no statement due date.
const DEFAULT_AUTOPAY_DATE: &str = "2024-01-25";

// ── Results ─────────────────────────────────────────────────────────

/// Why an action failed.
///
/// Lookup misses are validation failures; `AmountExceedsBalance` is a
/// precondition failure; `Persistence` means the domain change was valid
/// but the store rejected the write. The distinction is kept so callers
/// can tell a bad request from a bad store.
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionFailure {
    #[error("User not found")]
    UserNotFound { user_id: String },

    #[error("Card not found")]
    CardNotFound { card_id: String },

    #[error("Account not found")]
    AccountNotFound { account_id: String },

    #[error("Transaction not found")]
    TransactionNotFound { txn_id: String },

    #[error("Payment amount exceeds balance")]
    AmountExceedsBalance { amount: f64, current_balance: f64 },

    #[error("Store write rejected: {reason}")]
    Persistence { reason: String },
}

/// Outcome of one dispatched action.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ActionResult {
    Success {
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
        #[serde(flatten)]
        details: Map<String, Value>,
    },
    Failure {
        error: ActionFailure,
    },
}

impl ActionResult {
    fn success(message: &str) -> Self {
        Self::Success {
            message: Some(message.to_string()),
            details: Map::new(),
        }
    }

    fn success_silent() -> Self {
        Self::Success {
            message: None,
            details: Map::new(),
        }
    }

    fn failure(error: ActionFailure) -> Self {
        Self::Failure { error }
    }

    fn with(mut self, key: &str, value: Value) -> Self {
        if let Self::Success { details, .. } = &mut self {
            details.insert(key.to_string(), value);
        }
        self
    }

    /// Whether the action succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// The success message, if any.
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Success { message, .. } => message.as_deref(),
            Self::Failure { .. } => None,
        }
    }
}

// ── Dispatcher ──────────────────────────────────────────────────────

/// Executes account actions against the injected store.
pub struct ActionDispatcher {
    store: Arc<dyn AccountStore>,
}

impl ActionDispatcher {
    pub fn new(store: Arc<dyn AccountStore>) -> Self {
        Self { store }
    }

    /// Activate a card. No-op (still a success) if already active.
    pub async fn activate_card(&self, user_id: &str, card_id: &str) -> ActionResult {
        info!(user_id, card_id, "Activating card");
        let mut accounts = self.store.read().await;

        let Some(account) = accounts.get_mut(user_id) else {
            return ActionResult::failure(ActionFailure::UserNotFound {
                user_id: user_id.to_string(),
            });
        };
        let Some(card) = account.cards.iter_mut().find(|c| c.card_id == card_id) else {
            return ActionResult::failure(ActionFailure::CardNotFound {
                card_id: card_id.to_string(),
            });
        };

        if card.status == CardStatus::Active {
            return ActionResult::success("Card is already active")
                .with("cardId", card_id.into())
                .with("status", "active".into());
        }

        card.status = CardStatus::Active;
        card.activated_date = Some(Utc::now());
        let activated_date = card.activated_date;

        match self.store.write(&accounts).await {
            Ok(()) => {
                info!(user_id, card_id, "Card activated");
                ActionResult::success("Card activated successfully")
                    .with("cardId", card_id.into())
                    .with("status", "active".into())
                    .with(
                        "activatedDate",
                        serde_json::to_value(activated_date).unwrap_or(Value::Null),
                    )
            }
            Err(e) => {
                warn!(user_id, card_id, error = %e, "Card activation write rejected");
                ActionResult::failure(ActionFailure::Persistence {
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Enable or disable autopay on an account.
    ///
    /// When enabling, `paymentDate` defaults to the statement due date
    /// (then a fixed date) and `amount` to `"minimum"` — but only if not
    /// already set. Existing values are never overwritten.
    pub async fn set_autopay(&self, user_id: &str, account_id: &str, enabled: bool) -> ActionResult {
        info!(user_id, account_id, enabled, "Setting autopay");
        let mut accounts = self.store.read().await;

        let Some(account) = accounts.get_mut(user_id) else {
            return ActionResult::failure(ActionFailure::UserNotFound {
                user_id: user_id.to_string(),
            });
        };
        let statement_due = account
            .statements
            .as_ref()
            .and_then(|s| s.due_date.clone());
        let Some(fin) = account
            .accounts
            .iter_mut()
            .find(|a| a.account_id == account_id)
        else {
            return ActionResult::failure(ActionFailure::AccountNotFound {
                account_id: account_id.to_string(),
            });
        };

        let autopay = fin.autopay.get_or_insert_with(Autopay::default);
        autopay.enabled = enabled;
        if enabled {
            if autopay.payment_date.is_none() {
                autopay.payment_date =
                    Some(statement_due.unwrap_or_else(|| DEFAULT_AUTOPAY_DATE.to_string()));
            }
            if autopay.amount.is_none() {
                autopay.amount = Some("minimum".to_string());
            }
        }
        let autopay_snapshot = serde_json::to_value(&*autopay).unwrap_or(Value::Null);

        match self.store.write(&accounts).await {
            Ok(()) => {
                let verb = if enabled { "enabled" } else { "disabled" };
                info!(user_id, account_id, "Autopay {}", verb);
                ActionResult::success(&format!("Autopay {verb} successfully"))
                    .with("accountId", account_id.into())
                    .with("autopay", autopay_snapshot)
            }
            Err(e) => {
                warn!(user_id, account_id, error = %e, "Autopay write rejected");
                ActionResult::failure(ActionFailure::Persistence {
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Look up card status. Read-only.
    ///
    /// With a user id the search is scoped to that user; without one the
    /// first matching card across all users wins (store order).
    pub async fn get_card_status(&self, card_id: &str, user_id: Option<&str>) -> ActionResult {
        info!(card_id, "Getting card status");
        let accounts = self.store.read().await;

        let card = accounts
            .iter()
            .filter(|(uid, _)| user_id.is_none_or(|u| u == uid.as_str()))
            .flat_map(|(_, account)| account.cards.iter())
            .find(|c| c.card_id == card_id);

        let Some(card) = card else {
            return ActionResult::failure(ActionFailure::CardNotFound {
                card_id: card_id.to_string(),
            });
        };

        ActionResult::success_silent()
            .with("cardId", card_id.into())
            .with(
                "status",
                serde_json::to_value(card.status).unwrap_or(Value::Null),
            )
            .with(
                "deliveryStatus",
                serde_json::to_value(&card.delivery_status).unwrap_or(Value::Null),
            )
            .with(
                "deliveryDate",
                serde_json::to_value(&card.delivery_date).unwrap_or(Value::Null),
            )
            .with(
                "activatedDate",
                serde_json::to_value(card.activated_date).unwrap_or(Value::Null),
            )
            .with(
                "last4",
                serde_json::to_value(&card.last4).unwrap_or(Value::Null),
            )
            .with(
                "type",
                serde_json::to_value(&card.card_type).unwrap_or(Value::Null),
            )
    }

    /// File a dispute for a transaction.
    ///
    /// The dispute record is synthesized and returned but not persisted —
    /// a downstream ledger is assumed to own dispute storage.
    pub async fn dispute_transaction(&self, user_id: &str, txn_id: &str, reason: &str) -> ActionResult {
        info!(user_id, txn_id, "Creating dispute");
        let accounts = self.store.read().await;

        let Some(account) = accounts.get(user_id) else {
            return ActionResult::failure(ActionFailure::UserNotFound {
                user_id: user_id.to_string(),
            });
        };
        let Some(txn) = account.transactions.iter().find(|t| t.txn_id == txn_id) else {
            return ActionResult::failure(ActionFailure::TransactionNotFound {
                txn_id: txn_id.to_string(),
            });
        };

        let dispute = Dispute::new(user_id, txn, reason);
        info!(dispute_id = %dispute.dispute_id, "Dispute created");

        ActionResult::success("Dispute created successfully")
            .with("disputeId", dispute.dispute_id.clone().into())
            .with("status", "pending".into())
            .with(
                "dispute",
                serde_json::to_value(&dispute).unwrap_or(Value::Null),
            )
    }

    /// Process a repayment against the user's first account.
    pub async fn repay_amount(&self, user_id: &str, amount: f64, method: &str) -> ActionResult {
        info!(user_id, amount, method, "Processing repayment");
        let mut accounts = self.store.read().await;

        let Some(account) = accounts.get_mut(user_id) else {
            return ActionResult::failure(ActionFailure::UserNotFound {
                user_id: user_id.to_string(),
            });
        };
        let Some(fin) = account.accounts.first_mut() else {
            return ActionResult::failure(ActionFailure::AccountNotFound {
                account_id: String::new(),
            });
        };

        if amount > fin.balance {
            return ActionResult::failure(ActionFailure::AmountExceedsBalance {
                amount,
                current_balance: fin.balance,
            });
        }

        let previous_balance = fin.balance;
        fin.balance = (fin.balance - amount).max(0.0);
        fin.recompute_available_credit();
        let new_balance = fin.balance;
        let available_credit = fin.available_credit;

        let payment = Payment::new(user_id, amount, method);

        match self.store.write(&accounts).await {
            Ok(()) => {
                info!(payment_id = %payment.payment_id, new_balance, "Payment processed");
                ActionResult::success("Payment processed successfully")
                    .with("paymentId", payment.payment_id.clone().into())
                    .with("amount", amount.into())
                    .with("method", method.into())
                    .with("previousBalance", previous_balance.into())
                    .with("newBalance", new_balance.into())
                    .with("availableCredit", available_credit.into())
            }
            Err(e) => {
                warn!(user_id, error = %e, "Repayment write rejected");
                ActionResult::failure(ActionFailure::Persistence {
                    reason: e.to_string(),
                })
            }
        }
    }
}
