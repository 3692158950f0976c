use std::sync::Arc;

use grant_insight::diagnosis::{
    DiagnosisError, DiagnosisService, HistoryRepository, MatchReason, MatchingConfig, Owner, Recommendation,
    SessionId, ValidationError,
};
use grant_insight::grants::GrantId;
use serde_json::json;

mod common {
    use std::sync::Mutex;

    use grant_insight::diagnosis::{
        GrantQuery, GrantRepository, HistoryRepository, HistoryRow, Owner, RepositoryError,
    };
    use grant_insight::grants::{GrantCandidate, GrantCatalogImporter};

    pub struct CatalogRepository {
        grants: Vec<GrantCandidate>,
    }

    impl CatalogRepository {
        pub fn sample() -> Self {
            let data = include_bytes!("../data/sample_grants.csv");
            let grants =
                GrantCatalogImporter::from_reader(&data[..]).expect("sample catalog imports");
            Self { grants }
        }
    }

    impl GrantRepository for CatalogRepository {
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
            let mut grants: Vec<_> = self
                .grants
                .iter()
                .filter(|grant| grant.views > 0)
                .cloned()
                .collect();
            grants.sort_by(|left, right| right.views.cmp(&left.views));
            grants.truncate(limit);
            Ok(grants)
        }

        fn most_recent(&self, limit: usize) -> Result<Vec<GrantCandidate>, RepositoryError> {
            let mut grants = self.grants.clone();
            grants.sort_by(|left, right| right.published_on.cmp(&left.published_on));
            grants.truncate(limit);
            Ok(grants)
        }
    }

    #[derive(Default)]
    pub struct HistoryTable {
        rows: Mutex<Vec<HistoryRow>>,
    }

    impl HistoryTable {
        pub fn len(&self) -> usize {
            self.rows.lock().expect("history mutex poisoned").len()
        }
    }

    impl HistoryRepository for HistoryTable {
        fn append(&self, row: HistoryRow) -> Result<(), RepositoryError> {
            self.rows.lock().expect("history mutex poisoned").push(row);
            Ok(())
        }

        fn recent(&self, owner: &Owner, limit: usize) -> Result<Vec<HistoryRow>, RepositoryError> {
            let rows = self.rows.lock().expect("history mutex poisoned");
            let mut owned: Vec<_> = rows
                .iter()
                .filter(|row| row.belongs_to(owner))
                .cloned()
                .collect();
            owned.sort_by(|left, right| right.created_at.cmp(&left.created_at));
            owned.truncate(limit);
            Ok(owned)
        }
    }
}

use common::{CatalogRepository, HistoryTable};

fn startup_answers() -> serde_json::Value {
    json!({
        "business_type": "startup",
        "industry": "it",
        "purpose": ["digitalization"],
        "employees": "1-5",
        "location": "東京都",
    })
}

#[tokio::test]
async fn startup_it_diagnosis_matches_tokyo_digital_grants() {
    let history = Arc::new(HistoryTable::default());
    let (service, worker) = DiagnosisService::spawn(
        Arc::new(CatalogRepository::sample()),
        Arc::clone(&history),
        MatchingConfig::default(),
    );
    let owner = Owner::Session(SessionId("integration-session".to_string()));

    let outcome = service
        .diagnose(&owner, &startup_answers())
        .expect("diagnosis succeeds");

    let ids: Vec<GrantId> = outcome.results.iter().map(|result| result.grant_id).collect();
    assert_eq!(ids, vec![GrantId(101), GrantId(102)]);
    for result in &outcome.results {
        assert!((result.score - 3.41 / 6.1 * 100.0).abs() < 1e-9);
        assert_eq!(
            result.reasons,
            vec![MatchReason::IndustryMatch, MatchReason::RegionalGrant]
        );
    }
    assert_eq!(
        outcome.recommendations,
        vec![
            Recommendation::StartupSupport,
            Recommendation::DigitalizationPrograms,
        ]
    );
    assert!(outcome.fallback_grants.is_empty());

    drop(service);
    worker.await.expect("history worker exits");
    assert_eq!(history.len(), 1);
}

#[tokio::test]
async fn history_round_trip_preserves_results() {
    let history = Arc::new(HistoryTable::default());
    let (service, worker) = DiagnosisService::spawn(
        Arc::new(CatalogRepository::sample()),
        Arc::clone(&history),
        MatchingConfig::default(),
    );
    let owner = Owner::User(21);

    let mut answers = startup_answers();
    answers["budget"] = json!("100-500");
    answers["urgency"] = json!("immediate");
    let outcome = service.diagnose(&owner, &answers).expect("diagnosis succeeds");

    drop(service);
    worker.await.expect("history worker exits");

    let records: Vec<_> = history
        .recent(&owner, 10)
        .expect("history lookup")
        .into_iter()
        .map(|row| row.into_record().expect("row decodes"))
        .collect();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].results, outcome.results);
    assert_eq!(records[0].matched_grants, outcome.matched_grants);
    assert_eq!(records[0].confidence, outcome.confidence_score);
    assert!(records[0]
        .recommendations
        .contains(&Recommendation::ApplyEarly));
}

#[tokio::test]
async fn unmatched_diagnosis_offers_popular_fallback() {
    let (service, _worker) = DiagnosisService::spawn(
        Arc::new(CatalogRepository::sample()),
        Arc::new(HistoryTable::default()),
        MatchingConfig::default(),
    );

    let mut answers = startup_answers();
    answers["location"] = json!("沖縄県");
    let outcome = service
        .diagnose(&Owner::User(3), &answers)
        .expect("diagnosis succeeds");

    assert!(outcome.results.is_empty());
    assert_eq!(outcome.confidence_score, 0.0);
    let fallback: Vec<GrantId> = outcome.fallback_grants.iter().map(|grant| grant.id).collect();
    assert_eq!(
        fallback,
        vec![GrantId(103), GrantId(108), GrantId(106), GrantId(101), GrantId(105)]
    );
}

#[tokio::test]
async fn empty_answers_name_first_required_question() {
    let (service, _worker) = DiagnosisService::spawn(
        Arc::new(CatalogRepository::sample()),
        Arc::new(HistoryTable::default()),
        MatchingConfig::default(),
    );

    let error = service
        .diagnose(&Owner::User(3), &json!({}))
        .expect_err("validation fails");
    assert!(matches!(
        error,
        DiagnosisError::Validation(ValidationError::MissingRequired { ref question, .. })
            if question == "business_type"
    ));
}
