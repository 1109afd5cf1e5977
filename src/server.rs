//! HTTP surface for the assistant.
//!
//! Thin layer: routes validate and deserialize, then delegate to the
//! message processor, the action dispatcher, or the retriever. Action
//! failures map to HTTP statuses here and nowhere else.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::actions::{ActionDispatcher, ActionFailure, ActionResult};
use crate::pipeline::MessageProcessor;
use crate::pipeline::types::InboundRequest;
use crate::retrieval::KnowledgeRetriever;
use crate::webhook::webhook_request;

/// Shared state behind every route.
#[derive(Clone)]
pub struct AppState {
    pub processor: Arc<MessageProcessor>,
    pub dispatcher: Arc<ActionDispatcher>,
    pub retriever: Arc<KnowledgeRetriever>,
}

/// Build the full service router.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/message", post(handle_message))
        .route("/api/v1/webhook/{channel}", post(handle_webhook))
        .route("/api/v1/actions/activate-card", post(activate_card))
        .route("/api/v1/actions/set-autopay", post(set_autopay))
        .route("/api/v1/actions/card-status/{card_id}", get(card_status))
        .route("/api/v1/actions/dispute", post(dispute))
        .route("/api/v1/actions/repay", post(repay))
        .route("/api/v1/kb/search", get(kb_search))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(json!({"status": "ok", "version": env!("CARGO_PKG_VERSION")}))
}

// ── Conversation ────────────────────────────────────────────────────

async fn handle_message(
    State(state): State<AppState>,
    Json(request): Json<InboundRequest>,
) -> impl IntoResponse {
    if request.message.trim().is_empty() || request.user_id.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "message and userId are required"})),
        )
            .into_response();
    }
    let response = state.processor.handle(request).await;
    Json(response).into_response()
}

async fn handle_webhook(
    State(state): State<AppState>,
    Path(channel): Path<String>,
    Json(payload): Json<Value>,
) -> impl IntoResponse {
    info!(channel = %channel, "Webhook received");
    match webhook_request(&channel, &payload) {
        Ok(request) => {
            let response = state.processor.handle(request).await;
            Json(response).into_response()
        }
        Err(e) => (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": e.to_string()})),
        )
            .into_response(),
    }
}

// ── Direct actions ──────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActivateCardBody {
    user_id: String,
    card_id: String,
}

async fn activate_card(
    State(state): State<AppState>,
    Json(body): Json<ActivateCardBody>,
) -> impl IntoResponse {
    let result = state
        .dispatcher
        .activate_card(&body.user_id, &body.card_id)
        .await;
    action_response(result)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SetAutopayBody {
    user_id: String,
    account_id: String,
    enabled: bool,
}

async fn set_autopay(
    State(state): State<AppState>,
    Json(body): Json<SetAutopayBody>,
) -> impl IntoResponse {
    let result = state
        .dispatcher
        .set_autopay(&body.user_id, &body.account_id, body.enabled)
        .await;
    action_response(result)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CardStatusQuery {
    user_id: Option<String>,
}

async fn card_status(
    State(state): State<AppState>,
    Path(card_id): Path<String>,
    Query(query): Query<CardStatusQuery>,
) -> impl IntoResponse {
    let result = state
        .dispatcher
        .get_card_status(&card_id, query.user_id.as_deref())
        .await;
    action_response(result)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DisputeBody {
    user_id: String,
    txn_id: String,
    #[serde(default = "default_dispute_reason")]
    reason: String,
}

fn default_dispute_reason() -> String {
    "Unauthorized charge".to_string()
}

async fn dispute(
    State(state): State<AppState>,
    Json(body): Json<DisputeBody>,
) -> impl IntoResponse {
    let result = state
        .dispatcher
        .dispute_transaction(&body.user_id, &body.txn_id, &body.reason)
        .await;
    action_response(result)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RepayBody {
    user_id: String,
    amount: f64,
    #[serde(default = "default_payment_method")]
    method: String,
}

fn default_payment_method() -> String {
    "bank_transfer".to_string()
}

async fn repay(State(state): State<AppState>, Json(body): Json<RepayBody>) -> impl IntoResponse {
    let result = state
        .dispatcher
        .repay_amount(&body.user_id, body.amount, &body.method)
        .await;
    action_response(result)
}

/// Map an action outcome to an HTTP response.
fn action_response(result: ActionResult) -> axum::response::Response {
    let status = match &result {
        ActionResult::Success { .. } => StatusCode::OK,
        ActionResult::Failure { error } => match error {
            ActionFailure::UserNotFound { .. }
            | ActionFailure::CardNotFound { .. }
            | ActionFailure::AccountNotFound { .. }
            | ActionFailure::TransactionNotFound { .. } => StatusCode::NOT_FOUND,
            ActionFailure::AmountExceedsBalance { .. } => StatusCode::BAD_REQUEST,
            ActionFailure::Persistence { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        },
    };
    (status, Json(result)).into_response()
}

// ── Knowledge base ──────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct KbSearchQuery {
    q: String,
    #[serde(default = "default_kb_limit")]
    limit: usize,
}

fn default_kb_limit() -> usize {
    3
}

async fn kb_search(
    State(state): State<AppState>,
    Query(query): Query<KbSearchQuery>,
) -> impl IntoResponse {
    if query.q.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "query parameter q is required"})),
        )
            .into_response();
    }
    let items = state.retriever.retrieve(&query.q, query.limit).await;
    let count = items.len();
    Json(json!({"items": items, "count": count})).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_failures_map_to_not_found() {
        let result = ActionResult::Failure {
            error: ActionFailure::CardNotFound {
                card_id: "card999".to_string(),
            },
        };
        let response = action_response(result);
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn precondition_failures_map_to_bad_request() {
        let result = ActionResult::Failure {
            error: ActionFailure::AmountExceedsBalance {
                amount: 9000.0,
                current_balance: 100.0,
            },
        };
        assert_eq!(action_response(result).status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn persistence_failures_map_to_server_error() {
        let result = ActionResult::Failure {
            error: ActionFailure::Persistence {
                reason: "disk full".to_string(),
            },
        };
        assert_eq!(
            action_response(result).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
