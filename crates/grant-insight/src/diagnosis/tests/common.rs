use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::NaiveDate;
use serde_json::{json, Value};

use crate::diagnosis::domain::Owner;
use crate::diagnosis::query::GrantQuery;
use crate::diagnosis::repository::{
    GrantRepository, HistoryRepository, HistoryRow, RepositoryError,
};
use crate::diagnosis::{DiagnosisService, MatchingConfig};
use crate::grants::{FundingRange, GrantCandidate, GrantId, GrantStatus};

pub(super) fn grant(
    id: u64,
    title: &str,
    categories: &[&str],
    prefecture: Option<&str>,
    funding: (Option<u64>, Option<u64>),
    views: u64,
) -> GrantCandidate {
    GrantCandidate {
        id: GrantId(id),
        title: title.to_string(),
        excerpt: format!("{title}の概要"),
        permalink: format!("https://grant-insight.example/grants/{id}/"),
        organization: "経済産業省".to_string(),
        categories: categories.iter().map(|slug| slug.to_string()).collect(),
        prefecture: prefecture.map(str::to_string),
        funding: FundingRange {
            min_yen: funding.0,
            max_yen: funding.1,
        },
        deadline: NaiveDate::from_ymd_opt(2025, 12, 26),
        status: GrantStatus::Open,
        views,
        published_on: NaiveDate::from_ymd_opt(2025, 4, 1)
            .expect("valid date")
            .checked_add_days(chrono::Days::new(id))
            .expect("valid date"),
    }
}

pub(super) fn sample_grants() -> Vec<GrantCandidate> {
    vec![
        grant(
            101,
            "IT導入補助金",
            &["it-digital"],
            Some("東京都"),
            (Some(300_000), Some(4_500_000)),
            120,
        ),
        grant(
            102,
            "東京都DX推進助成金",
            &["it-digital", "digitalization"],
            Some("東京都"),
            (Some(1_000_000), Some(30_000_000)),
            80,
        ),
        grant(
            103,
            "ものづくり補助金",
            &["manufacturing"],
            Some("東京都"),
            (Some(1_000_000), Some(12_500_000)),
            300,
        ),
        grant(
            104,
            "大阪府IT活用支援事業",
            &["it-digital"],
            Some("大阪府"),
            (None, Some(2_000_000)),
            0,
        ),
        grant(
            105,
            "キャリアアップ助成金",
            &["employment"],
            None,
            (None, None),
            45,
        ),
    ]
}

pub(super) fn startup_answers() -> Value {
    json!({
        "business_type": "startup",
        "industry": "it",
        "purpose": ["digitalization"],
        "employees": "1-5",
        "location": "東京都",
    })
}

pub(super) fn user() -> Owner {
    Owner::User(7)
}

/// In-memory grant datastore that counts searches.
#[derive(Default)]
pub(super) struct MemoryGrantRepository {
    grants: Vec<GrantCandidate>,
    searches: AtomicUsize,
}

impl MemoryGrantRepository {
    pub(super) fn new(grants: Vec<GrantCandidate>) -> Self {
        Self {
            grants,
            searches: AtomicUsize::new(0),
        }
    }

    pub(super) fn searches(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }
}

impl GrantRepository for MemoryGrantRepository {
    fn search(&self, query: &GrantQuery) -> Result<Vec<GrantCandidate>, RepositoryError> {
        self.searches.fetch_add(1, Ordering::SeqCst);
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
        let mut recent = self.grants.clone();
        recent.sort_by(|left, right| right.published_on.cmp(&left.published_on));
        recent.truncate(limit);
        Ok(recent)
    }
}

/// Grant datastore whose search always fails while fallback lookups still work.
pub(super) struct FailingSearchRepository;

impl GrantRepository for FailingSearchRepository {
    fn search(&self, _query: &GrantQuery) -> Result<Vec<GrantCandidate>, RepositoryError> {
        Err(RepositoryError::Unavailable("connection refused".to_string()))
    }

    fn most_viewed(&self, limit: usize) -> Result<Vec<GrantCandidate>, RepositoryError> {
        MemoryGrantRepository::new(sample_grants()).most_viewed(limit)
    }

    fn most_recent(&self, limit: usize) -> Result<Vec<GrantCandidate>, RepositoryError> {
        MemoryGrantRepository::new(sample_grants()).most_recent(limit)
    }
}

#[derive(Default)]
pub(super) struct MemoryHistoryRepository {
    rows: Arc<Mutex<Vec<HistoryRow>>>,
}

impl MemoryHistoryRepository {
    pub(super) fn len(&self) -> usize {
        self.rows.lock().expect("repository mutex poisoned").len()
    }
}

impl HistoryRepository for MemoryHistoryRepository {
    fn append(&self, row: HistoryRow) -> Result<(), RepositoryError> {
        self.rows
            .lock()
            .expect("repository mutex poisoned")
            .push(row);
        Ok(())
    }

    fn recent(&self, owner: &Owner, limit: usize) -> Result<Vec<HistoryRow>, RepositoryError> {
        let rows = self.rows.lock().expect("repository mutex poisoned");
        let mut owned: Vec<HistoryRow> = rows
            .iter()
            .filter(|row| row.belongs_to(owner))
            .cloned()
            .collect();
        owned.sort_by(|left, right| right.created_at.cmp(&left.created_at));
        owned.truncate(limit);
        Ok(owned)
    }
}

pub(super) struct FailingHistoryRepository;

impl HistoryRepository for FailingHistoryRepository {
    fn append(&self, _row: HistoryRow) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("disk full".to_string()))
    }

    fn recent(&self, _owner: &Owner, _limit: usize) -> Result<Vec<HistoryRow>, RepositoryError> {
        Err(RepositoryError::Unavailable("disk full".to_string()))
    }
}

pub(super) struct Harness {
    pub service: Arc<DiagnosisService<MemoryGrantRepository, MemoryHistoryRepository>>,
    pub grants: Arc<MemoryGrantRepository>,
    pub history: Arc<MemoryHistoryRepository>,
}

/// Must run inside a tokio runtime; the history worker is spawned on it.
pub(super) fn harness_with(grants: Vec<GrantCandidate>, config: MatchingConfig) -> Harness {
    let grants = Arc::new(MemoryGrantRepository::new(grants));
    let history = Arc::new(MemoryHistoryRepository::default());
    let (service, _worker) =
        DiagnosisService::spawn(Arc::clone(&grants), Arc::clone(&history), config);

    Harness {
        service: Arc::new(service),
        grants,
        history,
    }
}

pub(super) fn harness() -> Harness {
    harness_with(sample_grants(), MatchingConfig::default())
}

/// Yields to the history worker until `expected` rows are stored.
pub(super) async fn wait_for_rows(history: &MemoryHistoryRepository, expected: usize) {
    for _ in 0..1_000 {
        if history.len() >= expected {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("history worker stored {} of {expected} rows", history.len());
}

pub(super) async fn json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("body bytes");
    serde_json::from_slice(&bytes).expect("json body")
}
