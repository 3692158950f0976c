//! AI diagnosis: question catalog, candidate query, scoring and history.
//!
//! A submission flows through answer validation, the grant query, the match engine and the
//! history writer. Hooks registered on the service observe or rewrite each stage.

pub mod answers;
pub mod catalog;
pub mod domain;
pub mod history;
pub mod hooks;
pub mod query;
pub mod recommendations;
pub mod repository;
pub mod router;
pub mod scoring;
pub mod security;
pub mod service;

#[cfg(test)]
mod tests;

pub use answers::{AnswerSet, AnswerValue, ValidationError};
pub use catalog::{AnswerArity, Question, QuestionCatalog, QuestionOption};
pub use domain::{
    DiagnosisId, DiagnosisOutcome, DiagnosisRecord, MatchedGrant, Owner, SessionId,
};
pub use history::HistoryWriter;
pub use hooks::{DiagnosisHook, HookChain};
pub use query::{AmountRange, GrantQuery};
pub use recommendations::Recommendation;
pub use repository::{GrantRepository, HistoryRepository, HistoryRow, RepositoryError};
pub use router::{diagnosis_router, IdentityPolicy};
pub use scoring::{MatchEngine, MatchReason, MatchResult, MatchingConfig, RankedGrant};
pub use security::{NonceGuard, SecurityError, DIAGNOSIS_NONCE_ACTION};
pub use service::{DiagnosisError, DiagnosisService, HISTORY_LIMIT};
