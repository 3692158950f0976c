use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{DiagnosisId, DiagnosisRecord, MatchedGrant, Owner, SessionId};
use super::query::GrantQuery;
use super::recommendations::Recommendation;
use super::scoring::MatchResult;
use crate::grants::GrantCandidate;

/// Read-only access to published grants.
pub trait GrantRepository: Send + Sync {
    /// Grants satisfying every filter of `query`, at most `query.limit`, in datastore order.
    fn search(&self, query: &GrantQuery) -> Result<Vec<GrantCandidate>, RepositoryError>;
    /// Grants with at least one view, most viewed first.
    fn most_viewed(&self, limit: usize) -> Result<Vec<GrantCandidate>, RepositoryError>;
    fn most_recent(&self, limit: usize) -> Result<Vec<GrantCandidate>, RepositoryError>;
}

/// Append-only diagnosis history table.
pub trait HistoryRepository: Send + Sync {
    fn append(&self, row: HistoryRow) -> Result<(), RepositoryError>;
    /// Newest rows for `owner`, descending by creation time.
    fn recent(&self, owner: &Owner, limit: usize) -> Result<Vec<HistoryRow>, RepositoryError>;
}

/// Error enumeration for datastore failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("repository unavailable: {0}")]
    Unavailable(String),
    #[error("stored row is corrupt: {0}")]
    Corrupt(String),
}

/// Persisted shape of a diagnosis: owner columns plus JSON documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRow {
    pub id: String,
    pub user_id: Option<u64>,
    pub session_id: Option<String>,
    pub answers: String,
    pub results: String,
    pub confidence_score: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize)]
struct StoredResults {
    results: Vec<MatchResult>,
    matched_grants: Vec<MatchedGrant>,
    recommendations: Vec<Recommendation>,
}

impl HistoryRow {
    pub fn from_record(record: &DiagnosisRecord) -> Result<Self, RepositoryError> {
        let answers = serde_json::to_string(&record.answers)
            .map_err(|error| RepositoryError::Corrupt(error.to_string()))?;
        let results = serde_json::to_string(&StoredResults {
            results: record.results.clone(),
            matched_grants: record.matched_grants.clone(),
            recommendations: record.recommendations.clone(),
        })
        .map_err(|error| RepositoryError::Corrupt(error.to_string()))?;

        Ok(Self {
            id: record.id.0.clone(),
            user_id: record.owner.user_id(),
            session_id: record.owner.session_id().map(|session| session.0.clone()),
            answers,
            results,
            confidence_score: record.confidence,
            created_at: record.created_at,
        })
    }

    pub fn owner(&self) -> Option<Owner> {
        match (self.user_id, &self.session_id) {
            (Some(user), _) => Some(Owner::User(user)),
            (None, Some(session)) => Some(Owner::Session(SessionId(session.clone()))),
            (None, None) => None,
        }
    }

    pub fn belongs_to(&self, owner: &Owner) -> bool {
        match owner {
            Owner::User(user) => self.user_id == Some(*user),
            Owner::Session(session) => {
                self.user_id.is_none() && self.session_id.as_deref() == Some(session.0.as_str())
            }
        }
    }

    pub fn into_record(self) -> Result<DiagnosisRecord, RepositoryError> {
        let owner = self
            .owner()
            .ok_or_else(|| RepositoryError::Corrupt(format!("row {} has no owner", self.id)))?;
        let answers = serde_json::from_str(&self.answers)
            .map_err(|error| RepositoryError::Corrupt(format!("row {} answers: {error}", self.id)))?;
        let stored: StoredResults = serde_json::from_str(&self.results)
            .map_err(|error| RepositoryError::Corrupt(format!("row {} results: {error}", self.id)))?;

        Ok(DiagnosisRecord {
            id: DiagnosisId(self.id),
            owner,
            answers,
            results: stored.results,
            matched_grants: stored.matched_grants,
            confidence: self.confidence_score,
            recommendations: stored.recommendations,
            created_at: self.created_at,
        })
    }
}
