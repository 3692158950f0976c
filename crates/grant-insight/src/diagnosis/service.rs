use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::answers::{AnswerSet, ValidationError};
use super::catalog::QuestionCatalog;
use super::domain::{DiagnosisId, DiagnosisOutcome, DiagnosisRecord, MatchedGrant, Owner};
use super::history::HistoryWriter;
use super::hooks::{DiagnosisHook, HookChain};
use super::query::GrantQuery;
use super::recommendations::recommend;
use super::repository::{GrantRepository, HistoryRepository, RepositoryError};
use super::scoring::{MatchEngine, MatchingConfig};
use crate::grants::GrantSummaryView;

/// Records returned per history lookup.
pub const HISTORY_LIMIT: usize = 10;

/// Service composing the question catalog, match engine, datastores and history writer.
pub struct DiagnosisService<G, H> {
    catalog: Arc<QuestionCatalog>,
    engine: Arc<MatchEngine>,
    grants: Arc<G>,
    history: Arc<H>,
    writer: HistoryWriter,
    hooks: HookChain,
}

impl<G, H> DiagnosisService<G, H>
where
    G: GrantRepository + 'static,
    H: HistoryRepository + 'static,
{
    pub fn new(grants: Arc<G>, history: Arc<H>, writer: HistoryWriter, config: MatchingConfig) -> Self {
        Self {
            catalog: Arc::new(QuestionCatalog::standard()),
            engine: Arc::new(MatchEngine::new(config)),
            grants,
            history,
            writer,
            hooks: HookChain::new(),
        }
    }

    /// Builds the service and starts its history worker on the current runtime.
    pub fn spawn(grants: Arc<G>, history: Arc<H>, config: MatchingConfig) -> (Self, JoinHandle<()>) {
        let (writer, handle) = HistoryWriter::spawn(Arc::clone(&history));
        (Self::new(grants, history, writer, config), handle)
    }

    pub fn with_catalog(mut self, catalog: QuestionCatalog) -> Self {
        self.catalog = Arc::new(catalog);
        self
    }

    pub fn with_hook(mut self, hook: Arc<dyn DiagnosisHook>) -> Self {
        self.hooks.register(hook);
        self
    }

    pub fn catalog(&self) -> &QuestionCatalog {
        &self.catalog
    }

    /// Validates, queries, scores and records one diagnosis submission.
    pub fn diagnose(&self, owner: &Owner, payload: &Value) -> Result<DiagnosisOutcome, DiagnosisError> {
        let answers = AnswerSet::from_json(payload, &self.catalog)?;
        self.hooks.on_request(&answers);

        let mut query = GrantQuery::from_answers(&answers, self.engine.config().candidate_limit);
        self.hooks.before_query(&mut query);
        debug!(?query, "searching grant candidates");

        let mut candidates = self.grants.search(&query)?;
        candidates.truncate(query.limit);
        self.hooks.after_query(&mut candidates);

        let ranked = self.engine.rank(&candidates, &answers, &self.catalog);
        let confidence = self.engine.confidence(&ranked, &answers, &self.catalog);
        let recommendations = recommend(&answers);

        let results: Vec<_> = ranked.iter().map(|entry| entry.result.clone()).collect();
        let matched_grants: Vec<MatchedGrant> = ranked.iter().map(MatchedGrant::from).collect();
        let fallback_grants = if ranked.is_empty() {
            self.fallback_grants()
        } else {
            Vec::new()
        };

        let created_at = Utc::now();
        let diagnosis_id = DiagnosisId::generate();
        let record = DiagnosisRecord {
            id: diagnosis_id.clone(),
            owner: owner.clone(),
            answers,
            results: results.clone(),
            matched_grants: matched_grants.clone(),
            confidence,
            recommendations: recommendations.clone(),
            created_at,
        };
        self.writer.enqueue(record);

        info!(
            %diagnosis_id,
            candidates = candidates.len(),
            matches = results.len(),
            confidence,
            "diagnosis completed"
        );

        let mut outcome = DiagnosisOutcome {
            diagnosis_id,
            results,
            matched_grants,
            confidence_score: confidence,
            recommendations,
            fallback_grants,
            candidate_count: candidates.len(),
            created_at,
        };
        self.hooks.on_response(&mut outcome);
        Ok(outcome)
    }

    /// Newest diagnoses recorded for `owner`. Unreadable rows are skipped.
    pub fn history(&self, owner: &Owner) -> Result<Vec<DiagnosisRecord>, DiagnosisError> {
        let rows = self.history.recent(owner, HISTORY_LIMIT)?;
        let records = rows
            .into_iter()
            .filter_map(|row| {
                let row_id = row.id.clone();
                match row.into_record() {
                    Ok(record) => Some(record),
                    Err(error) => {
                        warn!(%row_id, %error, "skipping unreadable history row");
                        None
                    }
                }
            })
            .collect();
        Ok(records)
    }

    /// Most viewed grants, or the newest ones when nothing has views yet.
    pub fn fallback_grants(&self) -> Vec<GrantSummaryView> {
        let limit = self.engine.config().fallback_limit;
        let lookup = self.grants.most_viewed(limit).and_then(|popular| {
            if popular.is_empty() {
                self.grants.most_recent(limit)
            } else {
                Ok(popular)
            }
        });

        match lookup {
            Ok(grants) => grants
                .iter()
                .take(limit)
                .map(|grant| grant.summary_view())
                .collect(),
            Err(error) => {
                warn!(%error, "fallback grant lookup failed");
                Vec::new()
            }
        }
    }
}

/// Error raised by the diagnosis service.
#[derive(Debug, thiserror::Error)]
pub enum DiagnosisError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
