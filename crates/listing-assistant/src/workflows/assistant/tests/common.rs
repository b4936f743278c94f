use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::response::Response;
use serde_json::Value;

use crate::workflows::assistant::gateway::{GatewayError, ReplyContext, ReplyGenerator};
use crate::workflows::assistant::ledger::{AccountId, LedgerError, TokenCharge, TokenLedger};
use crate::workflows::assistant::{assistant_router, AssistantService, QueryCategory};
use crate::workflows::catalog::{Listing, ListingId};

pub(super) const STARTING_BALANCE: u32 = 10;

pub(super) fn listing(id: &str, location: &str, bedrooms: u32, features: &[&str]) -> Listing {
    Listing {
        id: ListingId(id.to_string()),
        title: format!("Vivienda {id}"),
        location: location.to_string(),
        bedrooms,
        bathrooms: 1,
        size_sq_meters: 90.0,
        price: 250_000.0,
        features: features.iter().map(|feature| feature.to_string()).collect(),
        description: None,
        image: None,
    }
}

pub(super) fn catalog() -> Vec<Listing> {
    vec![
        listing("a", "Madrid", 2, &["Terraza"]),
        listing("b", "Valencia", 4, &["Piscina", "Jardín"]),
        listing("c", "Valencia", 2, &["Garaje"]),
        listing("d", "Sevilla", 3, &["Piscina comunitaria"]),
        listing("e", "Valencia", 5, &["Vistas al mar"]),
    ]
}

pub(super) fn account() -> AccountId {
    AccountId("user-1".to_string())
}

#[derive(Default)]
pub(super) struct MemoryLedger {
    balances: Mutex<HashMap<AccountId, u32>>,
    charges: Mutex<Vec<TokenCharge>>,
}

impl MemoryLedger {
    pub(super) fn with_account(account_id: &AccountId, balance: u32) -> Self {
        let ledger = Self::default();
        ledger
            .balances
            .lock()
            .expect("ledger mutex poisoned")
            .insert(account_id.clone(), balance);
        ledger
    }

    pub(super) fn charges(&self) -> Vec<TokenCharge> {
        self.charges.lock().expect("ledger mutex poisoned").clone()
    }
}

impl TokenLedger for MemoryLedger {
    fn open_account(&self, account_id: &AccountId, balance: u32) -> Result<u32, LedgerError> {
        let mut guard = self.balances.lock().expect("ledger mutex poisoned");
        if guard.contains_key(account_id) {
            return Err(LedgerError::AccountExists(account_id.clone()));
        }
        guard.insert(account_id.clone(), balance);
        Ok(balance)
    }

    fn balance(&self, account_id: &AccountId) -> Result<u32, LedgerError> {
        self.balances
            .lock()
            .expect("ledger mutex poisoned")
            .get(account_id)
            .copied()
            .ok_or_else(|| LedgerError::UnknownAccount(account_id.clone()))
    }

    fn charge(&self, charge: TokenCharge) -> Result<u32, LedgerError> {
        let mut guard = self.balances.lock().expect("ledger mutex poisoned");
        let balance = guard
            .get_mut(&charge.account_id)
            .ok_or_else(|| LedgerError::UnknownAccount(charge.account_id.clone()))?;
        if *balance < charge.amount {
            return Err(LedgerError::InsufficientBalance {
                required: charge.amount,
                available: *balance,
            });
        }
        *balance -= charge.amount;
        let remaining = *balance;
        self.charges
            .lock()
            .expect("ledger mutex poisoned")
            .push(charge);
        Ok(remaining)
    }
}

pub(super) struct UnavailableLedger;

impl TokenLedger for UnavailableLedger {
    fn open_account(&self, _account_id: &AccountId, _balance: u32) -> Result<u32, LedgerError> {
        Err(LedgerError::Unavailable("database offline".to_string()))
    }

    fn balance(&self, _account_id: &AccountId) -> Result<u32, LedgerError> {
        Err(LedgerError::Unavailable("database offline".to_string()))
    }

    fn charge(&self, _charge: TokenCharge) -> Result<u32, LedgerError> {
        Err(LedgerError::Unavailable("database offline".to_string()))
    }
}

/// Generator echoing what it was asked so tests can inspect the context.
#[derive(Default)]
pub(super) struct RecordingGenerator {
    calls: Mutex<Vec<RecordedCall>>,
}

#[derive(Debug, Clone)]
pub(super) struct RecordedCall {
    pub(super) question: String,
    pub(super) category: QueryCategory,
    pub(super) history_len: usize,
    pub(super) match_ids: Vec<String>,
    pub(super) context_len: usize,
}

impl RecordingGenerator {
    pub(super) fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().expect("generator mutex poisoned").clone()
    }
}

#[async_trait]
impl ReplyGenerator for RecordingGenerator {
    async fn generate(&self, context: ReplyContext<'_>) -> Result<String, GatewayError> {
        self.calls
            .lock()
            .expect("generator mutex poisoned")
            .push(RecordedCall {
                question: context.question.to_string(),
                category: context.classification.category,
                history_len: context.history.len(),
                match_ids: context
                    .matches
                    .iter()
                    .map(|listing| listing.id.0.clone())
                    .collect(),
                context_len: context.context_listings().len(),
            });
        Ok(format!("respuesta a: {}", context.question))
    }
}

pub(super) struct FailingGenerator;

#[async_trait]
impl ReplyGenerator for FailingGenerator {
    async fn generate(&self, _context: ReplyContext<'_>) -> Result<String, GatewayError> {
        Err(GatewayError::Api {
            status: 503,
            body: "overloaded".to_string(),
        })
    }
}

pub(super) type TestService = AssistantService<MemoryLedger, RecordingGenerator>;

pub(super) fn build_service() -> (TestService, Arc<MemoryLedger>, Arc<RecordingGenerator>) {
    let ledger = Arc::new(MemoryLedger::with_account(&account(), STARTING_BALANCE));
    let generator = Arc::new(RecordingGenerator::default());
    let service = AssistantService::new(catalog(), ledger.clone(), generator.clone());
    (service, ledger, generator)
}

pub(super) fn assistant_router_with_service(service: TestService) -> axum::Router {
    assistant_router(Arc::new(service), STARTING_BALANCE)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
