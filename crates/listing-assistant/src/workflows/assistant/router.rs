use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use super::gateway::ReplyGenerator;
use super::ledger::{AccountId, LedgerError, TokenLedger};
use super::service::{AssistantService, AssistantServiceError, ChatRequest};

#[derive(Debug, Deserialize)]
pub(crate) struct QueryPayload {
    pub(crate) query: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchPayload {
    pub(crate) query: String,
    #[serde(default)]
    pub(crate) limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OpenAccountPayload {
    pub(crate) account_id: AccountId,
}

/// State shared by the assistant handlers.
pub struct AssistantRouterState<L, G> {
    pub service: Arc<AssistantService<L, G>>,
    pub starting_balance: u32,
}

impl<L, G> Clone for AssistantRouterState<L, G> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            starting_balance: self.starting_balance,
        }
    }
}

/// Router builder exposing classification, search, chat and balance endpoints.
pub fn assistant_router<L, G>(
    service: Arc<AssistantService<L, G>>,
    starting_balance: u32,
) -> Router
where
    L: TokenLedger + 'static,
    G: ReplyGenerator + 'static,
{
    Router::new()
        .route("/api/v1/assistant/classify", post(classify_handler::<L, G>))
        .route("/api/v1/assistant/search", post(search_handler::<L, G>))
        .route("/api/v1/assistant/chat", post(chat_handler::<L, G>))
        .route("/api/v1/assistant/accounts", post(open_account_handler::<L, G>))
        .route(
            "/api/v1/assistant/accounts/:account_id",
            get(balance_handler::<L, G>),
        )
        .with_state(AssistantRouterState {
            service,
            starting_balance,
        })
}

pub(crate) async fn classify_handler<L, G>(
    State(state): State<AssistantRouterState<L, G>>,
    axum::Json(payload): axum::Json<QueryPayload>,
) -> Response
where
    L: TokenLedger + 'static,
    G: ReplyGenerator + 'static,
{
    let classification = state.service.classify(&payload.query);
    (StatusCode::OK, axum::Json(classification)).into_response()
}

pub(crate) async fn search_handler<L, G>(
    State(state): State<AssistantRouterState<L, G>>,
    axum::Json(payload): axum::Json<SearchPayload>,
) -> Response
where
    L: TokenLedger + 'static,
    G: ReplyGenerator + 'static,
{
    let results = state.service.search(&payload.query, payload.limit);
    (StatusCode::OK, axum::Json(results)).into_response()
}

pub(crate) async fn chat_handler<L, G>(
    State(state): State<AssistantRouterState<L, G>>,
    axum::Json(request): axum::Json<ChatRequest>,
) -> Response
where
    L: TokenLedger + 'static,
    G: ReplyGenerator + 'static,
{
    match state.service.chat(request).await {
        Ok(reply) => (StatusCode::OK, axum::Json(reply)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn open_account_handler<L, G>(
    State(state): State<AssistantRouterState<L, G>>,
    axum::Json(payload): axum::Json<OpenAccountPayload>,
) -> Response
where
    L: TokenLedger + 'static,
    G: ReplyGenerator + 'static,
{
    match state
        .service
        .open_account(&payload.account_id, state.starting_balance)
    {
        Ok(balance) => {
            let body = json!({
                "account_id": payload.account_id,
                "balance": balance,
            });
            (StatusCode::CREATED, axum::Json(body)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn balance_handler<L, G>(
    State(state): State<AssistantRouterState<L, G>>,
    Path(account_id): Path<String>,
) -> Response
where
    L: TokenLedger + 'static,
    G: ReplyGenerator + 'static,
{
    let account_id = AccountId(account_id);
    match state.service.balance(&account_id) {
        Ok(balance) => {
            let body = json!({
                "account_id": account_id,
                "balance": balance,
            });
            (StatusCode::OK, axum::Json(body)).into_response()
        }
        Err(error) => error_response(error),
    }
}

fn error_response(error: AssistantServiceError) -> Response {
    let status = match &error {
        AssistantServiceError::EmptyMessage => StatusCode::UNPROCESSABLE_ENTITY,
        AssistantServiceError::Ledger(LedgerError::UnknownAccount(_)) => StatusCode::NOT_FOUND,
        AssistantServiceError::Ledger(LedgerError::AccountExists(_)) => StatusCode::CONFLICT,
        AssistantServiceError::Ledger(LedgerError::InsufficientBalance { .. }) => {
            StatusCode::PAYMENT_REQUIRED
        }
        AssistantServiceError::Ledger(LedgerError::Unavailable(_)) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        AssistantServiceError::Gateway(_) => StatusCode::BAD_GATEWAY,
    };

    if status.is_server_error() {
        warn!(%error, "assistant request failed");
    }

    let message = match &error {
        AssistantServiceError::Gateway(_) => "language backend unavailable".to_string(),
        _ => error.to_string(),
    };
    let payload = json!({ "error": message });
    (status, axum::Json(payload)).into_response()
}
