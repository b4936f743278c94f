use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::classification::{Classification, ClassifiedRequest, QueryCategory, QueryClassifier};
use super::gateway::{GatewayError, ReplyContext, ReplyGenerator};
use super::ledger::{AccountId, LedgerError, TokenCharge, TokenLedger};
use super::prompt::ChatTurn;
use crate::workflows::catalog::{CatalogFilter, Listing};

/// Incoming chat message from an authenticated account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub account_id: AccountId,
    pub message: String,
    #[serde(default)]
    pub history: Vec<ChatTurn>,
}

/// Reply returned to the chat client after tokens were charged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantReply {
    pub message: String,
    pub category: QueryCategory,
    pub tokens_used: u32,
    pub remaining_balance: u32,
    pub total_matches: usize,
    pub listings: Vec<Listing>,
}

/// Result of a catalog search, capped for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    pub total: usize,
    pub listings: Vec<Listing>,
}

/// Service composing the classifier, catalog filter, reply backend and ledger.
pub struct AssistantService<L, G> {
    classifier: Arc<QueryClassifier>,
    filter: Arc<CatalogFilter>,
    catalog: Arc<Vec<Listing>>,
    ledger: Arc<L>,
    generator: Arc<G>,
    max_listings: usize,
}

impl<L, G> AssistantService<L, G>
where
    L: TokenLedger + 'static,
    G: ReplyGenerator + 'static,
{
    pub fn new(catalog: Vec<Listing>, ledger: Arc<L>, generator: Arc<G>) -> Self {
        Self {
            classifier: Arc::new(QueryClassifier::default()),
            filter: Arc::new(CatalogFilter::default()),
            catalog: Arc::new(catalog),
            ledger,
            generator,
            max_listings: 3,
        }
    }

    pub fn with_classifier(mut self, classifier: QueryClassifier) -> Self {
        self.classifier = Arc::new(classifier);
        self
    }

    pub fn with_filter(mut self, filter: CatalogFilter) -> Self {
        self.filter = Arc::new(filter);
        self
    }

    pub fn with_max_listings(mut self, max_listings: usize) -> Self {
        self.max_listings = max_listings;
        self
    }

    pub fn catalog(&self) -> &[Listing] {
        &self.catalog
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn classify(&self, query: &str) -> Classification {
        self.classifier.explain(query)
    }

    /// Filter the catalog without charging; `limit` defaults to the display cap.
    pub fn search(&self, query: &str, limit: Option<usize>) -> SearchResults {
        let mut listings = self.filter.filter(query, &self.catalog);
        let total = listings.len();
        listings.truncate(limit.unwrap_or(self.max_listings));
        SearchResults { total, listings }
    }

    pub fn open_account(
        &self,
        account_id: &AccountId,
        balance: u32,
    ) -> Result<u32, AssistantServiceError> {
        let balance = self.ledger.open_account(account_id, balance)?;
        info!(account = %account_id, balance, "opened assistant account");
        Ok(balance)
    }

    pub fn balance(&self, account_id: &AccountId) -> Result<u32, AssistantServiceError> {
        Ok(self.ledger.balance(account_id)?)
    }

    /// Answer one chat message. Tokens are only charged once a reply exists.
    pub async fn chat(&self, request: ChatRequest) -> Result<AssistantReply, AssistantServiceError> {
        let ChatRequest {
            account_id,
            message,
            history,
        } = request;

        let question = message.trim();
        if question.is_empty() {
            return Err(AssistantServiceError::EmptyMessage);
        }

        let classification = self.classifier.explain(question);
        let ClassifiedRequest {
            category,
            token_cost,
        } = classification.request;
        debug!(
            account = %account_id,
            category = category.label(),
            token_cost,
            matched_rule = ?classification.matched_rule,
            "classified chat message"
        );

        let available = self.ledger.balance(&account_id)?;
        if available < token_cost {
            return Err(LedgerError::InsufficientBalance {
                required: token_cost,
                available,
            }
            .into());
        }

        let matches = self.filter.filter(question, &self.catalog);
        let reply = self
            .generator
            .generate(ReplyContext {
                question,
                classification: classification.request,
                history: &history,
                matches: &matches,
                catalog: &self.catalog,
            })
            .await?;

        let remaining_balance = self.ledger.charge(TokenCharge {
            account_id: account_id.clone(),
            amount: token_cost,
            category,
            charged_at: Utc::now(),
        })?;
        info!(
            account = %account_id,
            category = category.label(),
            tokens_used = token_cost,
            remaining_balance,
            total_matches = matches.len(),
            "chat reply delivered"
        );

        let total_matches = matches.len();
        let listings = matches.into_iter().take(self.max_listings).collect();

        Ok(AssistantReply {
            message: reply,
            category,
            tokens_used: token_cost,
            remaining_balance,
            total_matches,
            listings,
        })
    }
}

/// Error raised by the assistant service.
#[derive(Debug, thiserror::Error)]
pub enum AssistantServiceError {
    #[error("message must not be empty")]
    EmptyMessage,
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}
