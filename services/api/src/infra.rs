use grant_insight::diagnosis::{
    GrantQuery, GrantRepository, HistoryRepository, HistoryRow, Owner, RepositoryError,
};
use grant_insight::error::AppError;
use grant_insight::grants::{GrantCandidate, GrantCatalogImporter};
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

const SAMPLE_CATALOG: &[u8] = include_bytes!("../../../crates/grant-insight/data/sample_grants.csv");

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Grant datastore held in memory, in catalog order.
#[derive(Default, Clone)]
pub(crate) struct InMemoryGrantRepository {
    grants: Arc<Vec<GrantCandidate>>,
}

impl InMemoryGrantRepository {
    pub(crate) fn new(grants: Vec<GrantCandidate>) -> Self {
        Self {
            grants: Arc::new(grants),
        }
    }

    /// Loads `path` when given, otherwise the bundled sample catalog.
    pub(crate) fn load(path: Option<&Path>) -> Result<Self, AppError> {
        let grants = match path {
            Some(path) => GrantCatalogImporter::from_path(path)?,
            None => GrantCatalogImporter::from_reader(SAMPLE_CATALOG)?,
        };
        Ok(Self::new(grants))
    }

    pub(crate) fn len(&self) -> usize {
        self.grants.len()
    }
}

impl GrantRepository for InMemoryGrantRepository {
    fn search(&self, query: &GrantQuery) -> Result<Vec<GrantCandidate>, RepositoryError> {
        Ok(self
            .grants
            .iter()
            .filter(|grant| query.matches(grant))
            .take(query.limit)
            .cloned()
            .collect())
    }

    fn most_viewed(&self, limit: usize) -> Result<Vec<GrantCandidate>, RepositoryError> {
        let mut popular: Vec<GrantCandidate> = self
            .grants
            .iter()
            .filter(|grant| grant.views > 0)
            .cloned()
            .collect();
        popular.sort_by(|left, right| right.views.cmp(&left.views));
        popular.truncate(limit);
        Ok(popular)
    }

    fn most_recent(&self, limit: usize) -> Result<Vec<GrantCandidate>, RepositoryError> {
        let mut recent = self.grants.to_vec();
        recent.sort_by(|left, right| right.published_on.cmp(&left.published_on));
        recent.truncate(limit);
        Ok(recent)
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryHistoryRepository {
    rows: Arc<Mutex<Vec<HistoryRow>>>,
}

impl InMemoryHistoryRepository {
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<HistoryRow>>, RepositoryError> {
        self.rows
            .lock()
            .map_err(|_| RepositoryError::Unavailable("history mutex poisoned".to_string()))
    }
}

impl HistoryRepository for InMemoryHistoryRepository {
    fn append(&self, row: HistoryRow) -> Result<(), RepositoryError> {
        self.lock()?.push(row);
        Ok(())
    }

    fn recent(&self, owner: &Owner, limit: usize) -> Result<Vec<HistoryRow>, RepositoryError> {
        let guard = self.lock()?;
        let mut owned: Vec<HistoryRow> = guard
            .iter()
            .filter(|row| row.belongs_to(owner))
            .cloned()
            .collect();
        owned.sort_by(|left, right| right.created_at.cmp(&left.created_at));
        owned.truncate(limit);
        Ok(owned)
    }
}

pub(crate) fn parse_answers(raw: &str) -> Result<serde_json::Value, AppError> {
    serde_json::from_str(raw)
        .map_err(|err| AppError::InvalidInput(format!("answers must be a JSON object: {err}")))
}
