use super::super::answers::AnswerSet;
use super::super::catalog::{ids, QuestionCatalog};
use super::config::MatchingConfig;
use crate::grants::GrantCandidate;

/// Weighted participation score with the purpose coverage bonus, normalised to [0,100].
pub(crate) fn score_grant(
    grant: &GrantCandidate,
    answers: &AnswerSet,
    catalog: &QuestionCatalog,
    config: &MatchingConfig,
) -> f64 {
    let mut max_score = 0.0;
    let mut score = 0.0;

    for (question_id, value) in answers.iter() {
        let Some(question) = catalog.get(question_id) else {
            continue;
        };
        if value.is_empty() {
            continue;
        }

        max_score += question.weight;
        score += question.weight * config.participation_ratio;

        if question.id == ids::PURPOSE {
            let covered = value
                .values()
                .iter()
                .filter(|purpose| config.purpose_covered(purpose, &grant.categories))
                .count();
            score += question.weight * config.purpose_bonus_ratio * covered as f64;
        }
    }

    if max_score <= 0.0 {
        return 0.0;
    }

    (score / max_score * 100.0).clamp(0.0, 100.0)
}
