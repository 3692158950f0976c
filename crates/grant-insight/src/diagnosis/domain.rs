use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::answers::AnswerSet;
use super::recommendations::Recommendation;
use super::scoring::{MatchResult, RankedGrant};
use crate::grants::GrantSummaryView;

/// Anonymous visitor identifier kept in the caller's session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a stored diagnosis.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DiagnosisId(pub String);

impl DiagnosisId {
    pub fn generate() -> Self {
        Self(format!("diag-{}", Uuid::new_v4().simple()))
    }
}

impl fmt::Display for DiagnosisId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Who a diagnosis belongs to. Authenticated users win over sessions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Owner {
    User(u64),
    Session(SessionId),
}

impl Owner {
    /// Stable key used for token scoping.
    pub fn key(&self) -> String {
        match self {
            Owner::User(id) => format!("user:{id}"),
            Owner::Session(session) => format!("session:{session}"),
        }
    }

    pub fn user_id(&self) -> Option<u64> {
        match self {
            Owner::User(id) => Some(*id),
            Owner::Session(_) => None,
        }
    }

    pub fn session_id(&self) -> Option<&SessionId> {
        match self {
            Owner::User(_) => None,
            Owner::Session(session) => Some(session),
        }
    }
}

/// Grant card plus its match score, as shown in results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedGrant {
    #[serde(flatten)]
    pub grant: GrantSummaryView,
    pub match_score: f64,
}

impl From<&RankedGrant> for MatchedGrant {
    fn from(ranked: &RankedGrant) -> Self {
        Self {
            grant: ranked.grant.summary_view(),
            match_score: ranked.result.score,
        }
    }
}

/// Immutable record of one diagnosis submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosisRecord {
    pub id: DiagnosisId,
    pub owner: Owner,
    pub answers: AnswerSet,
    pub results: Vec<MatchResult>,
    pub matched_grants: Vec<MatchedGrant>,
    pub confidence: f64,
    pub recommendations: Vec<Recommendation>,
    pub created_at: DateTime<Utc>,
}

/// Everything returned to the caller for a completed diagnosis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosisOutcome {
    pub diagnosis_id: DiagnosisId,
    pub results: Vec<MatchResult>,
    pub matched_grants: Vec<MatchedGrant>,
    pub confidence_score: f64,
    pub recommendations: Vec<Recommendation>,
    pub fallback_grants: Vec<GrantSummaryView>,
    pub candidate_count: usize,
    pub created_at: DateTime<Utc>,
}

impl DiagnosisOutcome {
    pub fn has_matches(&self) -> bool {
        !self.results.is_empty()
    }
}
