use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::classification::QueryCategory;

/// Identifier of a token-holding user account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub String);

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A deduction recorded against an account after a reply was produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenCharge {
    pub account_id: AccountId,
    pub amount: u32,
    pub category: QueryCategory,
    pub charged_at: DateTime<Utc>,
}

/// Balance storage so the chat service can be exercised without a database.
pub trait TokenLedger: Send + Sync {
    /// Create an account with `balance` tokens.
    fn open_account(&self, account_id: &AccountId, balance: u32) -> Result<u32, LedgerError>;
    fn balance(&self, account_id: &AccountId) -> Result<u32, LedgerError>;
    /// Deduct atomically, returning the remaining balance. Must not deduct
    /// anything when the balance is insufficient.
    fn charge(&self, charge: TokenCharge) -> Result<u32, LedgerError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("account '{0}' does not exist")]
    UnknownAccount(AccountId),
    #[error("account '{0}' already exists")]
    AccountExists(AccountId),
    #[error("insufficient tokens: {required} required, {available} available")]
    InsufficientBalance { required: u32, available: u32 },
    #[error("ledger unavailable: {0}")]
    Unavailable(String),
}
