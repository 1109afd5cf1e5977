//! Account data model — cards, financial accounts, transactions, and the
//! ephemeral records produced by actions.
//!
//! Field names serialize in camelCase to match the flat JSON account store
//! (`users.json`) that the assistant reads and writes.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// How many days out a new dispute's resolution is estimated.
const DISPUTE_RESOLUTION_DAYS: i64 = 10;

// ── Account ─────────────────────────────────────────────────────────

/// One user's account as stored in the account store.
///
/// The store maps `userId → Account`; the user id is the map key, not a
/// field. The pipeline never creates or deletes accounts — only the
/// action dispatcher mutates them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub cards: Vec<Card>,
    #[serde(default)]
    pub accounts: Vec<FinancialAccount>,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    #[serde(default)]
    pub statements: Option<StatementInfo>,
}

/// Activation state of a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardStatus {
    Inactive,
    Active,
}

/// A physical/virtual card owned by the user.
///
/// Invariant: `activated_date` is set iff `status == Active`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub card_id: String,
    pub status: CardStatus,
    #[serde(default)]
    pub delivery_status: Option<String>,
    #[serde(default)]
    pub delivery_date: Option<String>,
    #[serde(default)]
    pub activated_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last4: Option<String>,
    #[serde(rename = "type", default)]
    pub card_type: Option<String>,
}

/// A credit account with a revolving balance.
///
/// `available_credit` is derived (`credit_limit − balance`) and recomputed
/// on every balance change; it never goes negative because the balance is
/// floored at zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialAccount {
    pub account_id: String,
    pub balance: f64,
    pub credit_limit: f64,
    pub available_credit: f64,
    #[serde(default)]
    pub autopay: Option<Autopay>,
}

impl FinancialAccount {
    /// Re-derive available credit after a balance change.
    pub fn recompute_available_credit(&mut self) {
        self.available_credit = self.credit_limit - self.balance;
    }
}

/// Autopay settings on a financial account.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Autopay {
    pub enabled: bool,
    #[serde(default)]
    pub payment_date: Option<String>,
    /// Either a dollar figure or the literal `"minimum"`.
    #[serde(default)]
    pub amount: Option<String>,
}

/// A posted transaction. Immutable once observed by the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub txn_id: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub merchant: Option<String>,
    pub amount: f64,
}

/// Statement summary attached to an account.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatementInfo {
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub minimum_due: Option<f64>,
    #[serde(default)]
    pub statement_balance: Option<f64>,
}

// ── Ephemeral action records ────────────────────────────────────────

/// Snapshot of the disputed transaction embedded in a dispute record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionSnapshot {
    pub date: Option<String>,
    pub merchant: Option<String>,
    pub amount: f64,
}

/// A created dispute. Not persisted to the account store — the pipeline
/// returns it in the action result only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dispute {
    pub dispute_id: String,
    pub user_id: String,
    pub txn_id: String,
    pub transaction: TransactionSnapshot,
    pub reason: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub estimated_resolution_date: DateTime<Utc>,
}

impl Dispute {
    /// Build a pending dispute with a resolution estimate 10 days out.
    pub fn new(user_id: &str, txn: &Transaction, reason: &str) -> Self {
        let created_at = Utc::now();
        Self {
            dispute_id: format!("dispute_{}", created_at.timestamp_millis()),
            user_id: user_id.to_string(),
            txn_id: txn.txn_id.clone(),
            transaction: TransactionSnapshot {
                date: txn.date.clone(),
                merchant: txn.merchant.clone(),
                amount: txn.amount,
            },
            reason: reason.to_string(),
            status: "pending".to_string(),
            created_at,
            estimated_resolution_date: created_at + Duration::days(DISPUTE_RESOLUTION_DAYS),
        }
    }
}

/// A processed payment. Ephemeral, like [`Dispute`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub payment_id: String,
    pub user_id: String,
    pub amount: f64,
    pub method: String,
    pub date: DateTime<Utc>,
    pub status: String,
}

impl Payment {
    pub fn new(user_id: &str, amount: f64, method: &str) -> Self {
        let date = Utc::now();
        Self {
            payment_id: format!("payment_{}", date.timestamp_millis()),
            user_id: user_id.to_string(),
            amount,
            method: method.to_string(),
            date,
            status: "processed".to_string(),
        }
    }
}

// ── Knowledge base ──────────────────────────────────────────────────

/// A single retrievable knowledge-base document. Read-only to the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeItem {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub category: Option<String>,
}
