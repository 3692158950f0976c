use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Weights and limits applied by the match engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchingConfig {
    /// Share of a question's weight earned for answering it at all.
    pub participation_ratio: f64,
    /// Share of the purpose weight earned per selected purpose the grant covers.
    pub purpose_bonus_ratio: f64,
    /// Purpose answer value -> grant category slugs that count as covering it.
    pub purpose_vocabulary: BTreeMap<String, Vec<String>>,
    pub candidate_limit: usize,
    pub result_limit: usize,
    pub confidence_score_weight: f64,
    pub confidence_completeness_weight: f64,
    pub fallback_limit: usize,
}

impl MatchingConfig {
    /// Whether `grant_categories` covers the selected `purpose`.
    pub fn purpose_covered(&self, purpose: &str, grant_categories: &[String]) -> bool {
        grant_categories.iter().any(|category| {
            category == purpose
                || self
                    .purpose_vocabulary
                    .get(purpose)
                    .is_some_and(|slugs| slugs.iter().any(|slug| slug == category))
        })
    }
}

impl Default for MatchingConfig {
    fn default() -> Self {
        let vocabulary = [
            ("equipment", &["manufacturing"][..]),
            ("hr", &["employment"][..]),
            ("rd", &["research-development"][..]),
            ("marketing", &["retail-service"][..]),
            ("digitalization", &["it-digital"][..]),
            ("eco", &["environment"][..]),
            ("startup_fund", &["startup"][..]),
        ]
        .into_iter()
        .map(|(purpose, slugs)| {
            (
                purpose.to_string(),
                slugs.iter().map(|slug| slug.to_string()).collect(),
            )
        })
        .collect();

        Self {
            participation_ratio: 0.5,
            purpose_bonus_ratio: 0.3,
            purpose_vocabulary: vocabulary,
            candidate_limit: 20,
            result_limit: 10,
            confidence_score_weight: 0.7,
            confidence_completeness_weight: 0.3,
            fallback_limit: 5,
        }
    }
}
