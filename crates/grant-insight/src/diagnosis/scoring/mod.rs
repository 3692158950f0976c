mod confidence;
mod config;
mod reasons;
mod rules;

pub use config::MatchingConfig;
pub use reasons::MatchReason;

use serde::{Deserialize, Serialize};

use super::answers::AnswerSet;
use super::catalog::QuestionCatalog;
use crate::grants::{GrantCandidate, GrantId};

/// Stateless scorer applying the matching configuration to candidate grants.
#[derive(Debug, Clone)]
pub struct MatchEngine {
    config: MatchingConfig,
}

impl MatchEngine {
    pub fn new(config: MatchingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MatchingConfig {
        &self.config
    }

    pub fn score(&self, grant: &GrantCandidate, answers: &AnswerSet, catalog: &QuestionCatalog) -> f64 {
        rules::score_grant(grant, answers, catalog, &self.config)
    }

    /// Scores every candidate and keeps the best `result_limit`, ties in query order.
    pub fn rank(
        &self,
        candidates: &[GrantCandidate],
        answers: &AnswerSet,
        catalog: &QuestionCatalog,
    ) -> Vec<RankedGrant> {
        let mut ranked: Vec<RankedGrant> = candidates
            .iter()
            .map(|grant| {
                let score = self.score(grant, answers, catalog);
                RankedGrant {
                    grant: grant.clone(),
                    result: MatchResult {
                        grant_id: grant.id,
                        score,
                        reasons: reasons::reasons_for(grant, answers, score),
                    },
                }
            })
            .collect();

        ranked.sort_by(|left, right| right.result.score.total_cmp(&left.result.score));
        ranked.truncate(self.config.result_limit);
        ranked
    }

    pub fn confidence(&self, ranked: &[RankedGrant], answers: &AnswerSet, catalog: &QuestionCatalog) -> f64 {
        let scores: Vec<f64> = ranked.iter().map(|entry| entry.result.score).collect();
        confidence::estimate_confidence(&scores, answers, catalog, &self.config)
    }
}

impl Default for MatchEngine {
    fn default() -> Self {
        Self::new(MatchingConfig::default())
    }
}

/// Score and explanation for one candidate grant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub grant_id: GrantId,
    pub score: f64,
    pub reasons: Vec<MatchReason>,
}

/// Candidate grant paired with its match result.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedGrant {
    pub grant: GrantCandidate,
    pub result: MatchResult,
}
