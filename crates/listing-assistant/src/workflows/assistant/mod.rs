//! Chat assistant request shaping: classification, costing, context selection
//! and token-metered reply orchestration.

pub mod classification;
pub mod gateway;
pub mod knowledge;
pub mod ledger;
pub mod prompt;
pub mod responder;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use classification::{
    classify, Classification, ClassifiedRequest, Matcher, QueryCategory, QueryClassifier,
    RuleError, RuleGroup, RuleSet, RuleSetDefinition,
};
pub use gateway::{CannedResponder, GatewayError, GeminiClient, ReplyContext, ReplyGenerator};
pub use knowledge::KnowledgeBase;
pub use ledger::{AccountId, LedgerError, TokenCharge, TokenLedger};
pub use prompt::{ChatTurn, PromptBuilder, Sender};
pub use responder::ResponseComposer;
pub use router::{assistant_router, AssistantRouterState};
pub use service::{
    AssistantReply, AssistantService, AssistantServiceError, ChatRequest, SearchResults,
};
